use {
    crate::*,
    glam::IVec2,
    std::collections::HashMap,
    strum::IntoEnumIterator,
};

/// The solved worth of a single `(position, time)` state: the most RadAway collectible between
/// that state and the goal, or `Unreachable` if no continuation reaches the goal within the step
/// budget.
///
/// The derived `Ord` places `Unreachable` below every `Finite` value, so `max` over transitions
/// behaves like the recurrence wants without sentinel integers.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum Value {
    Unreachable,
    Finite(u32),
}

impl Value {
    fn add_bonus(self, bonus: u32) -> Self {
        match self {
            Self::Unreachable => Self::Unreachable,
            Self::Finite(value) => Self::Finite(value + bonus),
        }
    }

    /// Inverse of `add_bonus` for a value known to include the bonus.
    fn sub_bonus(self, bonus: u32) -> Self {
        match self {
            Self::Unreachable => Self::Unreachable,
            Self::Finite(value) => Self::Finite(value - bonus),
        }
    }

    /// Clamps to the reported best: an unreachable goal counts as zero collectibles. The
    /// accompanying flag is what distinguishes the two cases.
    fn best_and_reachable(self) -> (u32, bool) {
        match self {
            Self::Unreachable => (0_u32, false),
            Self::Finite(value) => (value, true),
        }
    }
}

/// Result of a top-down solve.
///
/// `states_visited` counts every evaluator call, including calls that return immediately because
/// the state is out of bounds, on a bomb, or over the step budget. That inflates it past the
/// distinct-state count, but it is the figure the two memo layouts are compared by.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Exploration {
    pub best: u32,
    pub reachable: bool,
    pub states_visited: u64,
}

/// Result of a bottom-up solve. `path` is *an* optimal start-to-goal route, or a partial prefix
/// when the goal is unreachable.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Tabulation {
    pub best: u32,
    pub reachable: bool,
    pub table_entries: usize,
    pub path: Vec<IVec2>,
}

/// Memo storage for the top-down evaluator.
///
/// The evaluator is generic over this seam so that both layouts share one call pattern, which
/// makes their `states_visited` counts equal by construction.
trait Memo {
    fn get(&self, pos: IVec2, time: i32) -> Option<Value>;
    fn insert(&mut self, pos: IVec2, time: i32, value: Value);
}

/// Dense storage: one slot per `(x, y, t)` triple, allocated up front.
struct ArrayMemo {
    values: Vec<Option<Value>>,
    dimensions: IVec2,
}

impl ArrayMemo {
    fn new(board: &Board) -> Self {
        let dimensions: IVec2 = board.grid().dimensions();
        let time_layers: usize = board.t_max() as usize + 1_usize;

        Self {
            values: vec![None; time_layers * (dimensions.x * dimensions.y) as usize],
            dimensions,
        }
    }

    /// Callers only present in-bounds positions and in-budget times.
    fn index(&self, pos: IVec2, time: i32) -> usize {
        (time * self.dimensions.x * self.dimensions.y + pos.y * self.dimensions.x + pos.x) as usize
    }
}

impl Memo for ArrayMemo {
    fn get(&self, pos: IVec2, time: i32) -> Option<Value> {
        self.values[self.index(pos, time)]
    }

    fn insert(&mut self, pos: IVec2, time: i32, value: Value) {
        let index: usize = self.index(pos, time);

        self.values[index] = Some(value);
    }
}

/// Sparse storage: only stores triples that were actually computed.
#[derive(Default)]
struct MapMemo(HashMap<(IVec2, i32), Value>);

impl Memo for MapMemo {
    fn get(&self, pos: IVec2, time: i32) -> Option<Value> {
        self.0.get(&(pos, time)).copied()
    }

    fn insert(&mut self, pos: IVec2, time: i32, value: Value) {
        self.0.insert((pos, time), value);
    }
}

struct Explorer<'b, M: Memo> {
    board: &'b Board,
    memo: M,
    states_visited: u64,
}

impl<'b, M: Memo> Explorer<'b, M> {
    fn new(board: &'b Board, memo: M) -> Self {
        Self {
            board,
            memo,
            states_visited: 0_u64,
        }
    }

    /// Recursive evaluation of the recurrence. Depth is bounded by `t_max + 2`, since `time`
    /// increases on every recursive call.
    fn evaluate(&mut self, pos: IVec2, time: i32) -> Value {
        // Count before any validity check: invalid calls are part of the comparison figure.
        self.states_visited += 1_u64;

        let Some(cell) = self.board.cell(pos) else {
            return Value::Unreachable;
        };

        if cell == Cell::Bomb || time > self.board.t_max() {
            return Value::Unreachable;
        }

        if cell == Cell::Goal {
            return Value::Finite(0_u32);
        }

        if let Some(value) = self.memo.get(pos, time) {
            return value;
        }

        let mut best: Value = Value::Unreachable;

        for dir in Direction::iter() {
            best = best.max(self.evaluate(pos + dir.vec(), time + 1_i32));
        }

        let value: Value = best.add_bonus((cell == Cell::RadAway) as u32);

        self.memo.insert(pos, time, value);

        value
    }

    fn run(mut self) -> Exploration {
        let (best, reachable): (u32, bool) = self
            .evaluate(self.board.start(), 0_i32)
            .best_and_reachable();

        Exploration {
            best,
            reachable,
            states_visited: self.states_visited,
        }
    }
}

/// Top-down solve memoized in a dense 3-dimensional table.
pub fn top_down_array(board: &Board) -> Exploration {
    Explorer::new(board, ArrayMemo::new(board)).run()
}

/// Top-down solve memoized in a sparse map. Returns the same `best` and `states_visited` as
/// `top_down_array` for any valid board.
pub fn top_down_map(board: &Board) -> Exploration {
    Explorer::new(board, MapMemo::default()).run()
}

/// The full bottom-up table: `(t_max + 1)` layers of the board's area, indexed `[t][y][x]`.
struct Table<'b> {
    board: &'b Board,
    values: Vec<Value>,
}

impl<'b> Table<'b> {
    fn fill(board: &'b Board) -> Self {
        let area: usize = board.grid().area();
        let t_max: i32 = board.t_max();
        let mut table: Self = Self {
            board,
            values: vec![Value::Unreachable; (t_max as usize + 1_usize) * area],
        };

        // Base case: the goal is worth zero at every layer. Everything else stays `Unreachable`
        // until the fill proves otherwise.
        for pos in board.grid().iter_positions_with_cell(&Cell::Goal) {
            for time in 0_i32..=t_max {
                table.set(pos, time, Value::Finite(0_u32));
            }
        }

        for time in (0_i32..t_max).rev() {
            for pos in board.grid().iter_positions() {
                let cell: Cell = board.cell(pos).unwrap();

                if cell == Cell::Bomb || cell == Cell::Goal {
                    continue;
                }

                let best: Value = Direction::iter()
                    .filter_map(|dir| {
                        let neighbor: IVec2 = pos + dir.vec();

                        board
                            .grid()
                            .contains(neighbor)
                            .then(|| table.get(neighbor, time + 1_i32))
                    })
                    .max()
                    .unwrap_or(Value::Unreachable);

                table.set(pos, time, best.add_bonus((cell == Cell::RadAway) as u32));
            }
        }

        table
    }

    fn index(&self, pos: IVec2, time: i32) -> usize {
        time as usize * self.board.grid().area() + self.board.grid().index_from_pos(pos)
    }

    fn get(&self, pos: IVec2, time: i32) -> Value {
        self.values[self.index(pos, time)]
    }

    fn set(&mut self, pos: IVec2, time: i32, value: Value) {
        let index: usize = self.index(pos, time);

        self.values[index] = value;
    }

    /// Replays the recurrence forward from the start state, stepping to the first neighbor (in
    /// fixed scan order) whose stored value accounts for the remainder of the current one. Ties
    /// mean the result is *an* optimal path, not a canonical one. Halts at the goal, at the step
    /// budget, or when no neighbor matches, so the path may be a partial prefix.
    fn reconstruct_path(&self) -> Vec<IVec2> {
        let board: &Board = self.board;
        let mut pos: IVec2 = board.start();
        let mut path: Vec<IVec2> = vec![pos];

        for time in 0_i32..board.t_max() {
            let cell: Cell = board.cell(pos).unwrap();

            if cell == Cell::Goal {
                break;
            }

            let target: Value = self
                .get(pos, time)
                .sub_bonus((cell == Cell::RadAway) as u32);

            let Some(next) = Direction::iter().map(|dir| pos + dir.vec()).find(|&neighbor| {
                board
                    .cell(neighbor)
                    .is_some_and(|cell| cell != Cell::Bomb && self.get(neighbor, time + 1_i32) == target)
            }) else {
                break;
            };

            pos = next;
            path.push(pos);
        }

        path
    }
}

/// Bottom-up tabulated solve, plus path reconstruction as a by-product.
pub fn bottom_up(board: &Board) -> Tabulation {
    let table: Table = Table::fill(board);
    let (best, reachable): (u32, bool) = table.get(board.start(), 0_i32).best_and_reachable();
    let path: Vec<IVec2> = table.reconstruct_path();

    Tabulation {
        best,
        reachable,
        table_entries: table.values.len(),
        path,
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{rngs::StdRng, SeedableRng},
    };

    const EMPTY_2: &str = "\
        S.\n\
        .E\n";
    const RADAWAY_2: &str = "\
        SR\n\
        .E\n";
    const WALLED_2: &str = "\
        SB\n\
        BE\n";
    const RADAWAY_3: &str = "\
        S..\n\
        R..\n\
        .RE\n";

    fn board(board_str: &str) -> Board {
        board_str.try_into().unwrap()
    }

    fn assert_path_is_valid(board: &Board, path: &[IVec2]) {
        assert_eq!(path.first().copied(), Some(board.start()));
        assert!(path.len() <= board.t_max() as usize + 1_usize);

        for pos in path {
            let cell: Cell = board.cell(*pos).unwrap();

            assert_ne!(cell, Cell::Bomb);
        }

        for window in path.windows(2_usize) {
            assert_eq!(
                manhattan_magnitude_2d(window[1_usize] - window[0_usize]),
                1_i32
            );
        }
    }

    #[test]
    fn test_empty_board() {
        let board: Board = board(EMPTY_2);
        let tabulation: Tabulation = bottom_up(&board);

        assert_eq!(top_down_array(&board).best, 0_u32);
        assert_eq!(top_down_map(&board).best, 0_u32);
        assert_eq!(tabulation.best, 0_u32);
        assert!(tabulation.reachable);
        assert_eq!(tabulation.path.len(), 3_usize);
        assert_eq!(tabulation.path.last().copied(), Some(board.goal()));
        assert_path_is_valid(&board, &tabulation.path);
    }

    #[test]
    fn test_single_collectible() {
        let board: Board = board(RADAWAY_2);

        assert_eq!(top_down_array(&board).best, 1_u32);
        assert_eq!(top_down_map(&board).best, 1_u32);

        let tabulation: Tabulation = bottom_up(&board);

        assert_eq!(tabulation.best, 1_u32);
        assert_eq!(
            tabulation.path,
            vec![
                IVec2::new(0_i32, 0_i32),
                IVec2::new(1_i32, 0_i32),
                IVec2::new(1_i32, 1_i32)
            ]
        );
    }

    #[test]
    fn test_walled_goal() {
        let board: Board = board(WALLED_2);
        let array: Exploration = top_down_array(&board);
        let tabulation: Tabulation = bottom_up(&board);

        assert_eq!(array.best, 0_u32);
        assert!(!array.reachable);
        assert_eq!(tabulation.best, 0_u32);
        assert!(!tabulation.reachable);

        // Both neighbors of the start are bombs, so reconstruction halts immediately.
        assert_eq!(tabulation.path, vec![IVec2::ZERO]);
        assert_path_is_valid(&board, &tabulation.path);
    }

    #[test]
    fn test_two_collectibles() {
        let board: Board = board(RADAWAY_3);

        assert_eq!(top_down_array(&board).best, 2_u32);
        assert_eq!(top_down_map(&board).best, 2_u32);

        let tabulation: Tabulation = bottom_up(&board);

        assert_eq!(tabulation.best, 2_u32);
        assert_eq!(tabulation.path.last().copied(), Some(board.goal()));
        assert_path_is_valid(&board, &tabulation.path);
    }

    #[test]
    fn test_goal_only_board() {
        let board: Board = board("E\n");
        let tabulation: Tabulation = bottom_up(&board);

        assert_eq!(top_down_array(&board).best, 0_u32);
        assert!(top_down_array(&board).reachable);
        assert_eq!(tabulation.best, 0_u32);
        assert_eq!(tabulation.table_entries, 2_usize);
        assert_eq!(tabulation.path, vec![IVec2::ZERO]);
    }

    #[test]
    fn test_table_entries() {
        for side_len in 1_usize..=6_usize {
            let mut rng: StdRng = StdRng::seed_from_u64(side_len as u64);
            let board: Board = Board::generate(side_len, 0.0_f64, 0.0_f64, &mut rng);

            assert_eq!(
                bottom_up(&board).table_entries,
                2_usize * side_len * side_len * side_len
            );
        }
    }

    #[test]
    fn test_cross_solver_agreement() {
        for seed in 0_u64..8_u64 {
            for side_len in [2_usize, 3_usize, 5_usize, 8_usize] {
                let mut rng: StdRng = StdRng::seed_from_u64(seed);
                let board: Board = Board::generate(side_len, 0.2_f64, 0.2_f64, &mut rng);
                let array: Exploration = top_down_array(&board);
                let map: Exploration = top_down_map(&board);
                let tabulation: Tabulation = bottom_up(&board);

                assert_eq!(array.best, map.best);
                assert_eq!(array.best, tabulation.best);
                assert_eq!(array.reachable, tabulation.reachable);

                // Same call pattern, same count, regardless of memo layout.
                assert_eq!(array.states_visited, map.states_visited);

                assert_path_is_valid(&board, &tabulation.path);

                if tabulation.reachable {
                    assert_eq!(tabulation.path.last().copied(), Some(board.goal()));
                }
            }
        }
    }

    #[test]
    fn test_all_bomb_interior() {
        let mut rng: StdRng = StdRng::seed_from_u64(0_u64);
        let board: Board = Board::generate(5_usize, 1.0_f64, 0.0_f64, &mut rng);
        let array: Exploration = top_down_array(&board);

        assert_eq!(array.best, 0_u32);
        assert!(!array.reachable);
        assert_eq!(top_down_map(&board).best, 0_u32);
        assert_eq!(bottom_up(&board).best, 0_u32);
    }

    #[test]
    fn test_collectible_monotonicity() {
        let without: Board = board("S..\n...\n..E\n");
        let with: Board = board("S..\nR..\n..E\n");

        assert_eq!(top_down_array(&without).best, 0_u32);
        assert_eq!(top_down_array(&with).best, 1_u32);
        assert!(top_down_array(&with).best > top_down_array(&without).best);
    }

    #[test]
    fn test_idempotence() {
        let mut rng: StdRng = StdRng::seed_from_u64(7_u64);
        let board: Board = Board::generate(6_usize, 0.25_f64, 0.25_f64, &mut rng);

        assert_eq!(top_down_array(&board), top_down_array(&board));
        assert_eq!(top_down_map(&board), top_down_map(&board));
        assert_eq!(bottom_up(&board), bottom_up(&board));
    }
}
