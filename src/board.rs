use {
    crate::*,
    glam::IVec2,
    nom::{character::complete::one_of, combinator::map, Err, IResult},
    rand::Rng,
    std::fmt::Write,
};

#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Cell {
    Start = Self::START,
    Goal = Self::GOAL,
    Bomb = Self::BOMB,
    RadAway = Self::RAD_AWAY,
    #[default]
    Empty = Self::EMPTY,
}

impl Cell {
    const START: u8 = b'S';
    const GOAL: u8 = b'E';
    const BOMB: u8 = b'B';
    const RAD_AWAY: u8 = b'R';
    const EMPTY: u8 = b'.';
    const STR: &'static str =
        // SAFETY: Trivial
        unsafe {
            std::str::from_utf8_unchecked(&[
                Self::START,
                Self::GOAL,
                Self::BOMB,
                Self::RAD_AWAY,
                Self::EMPTY,
            ])
        };

    pub fn legend_entry(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Goal => "goal",
            Self::Bomb => "bomb",
            Self::RadAway => "RadAway",
            Self::Empty => "empty",
        }
    }

    /// SGR parameters used by `ColorMode::Ansi`.
    const fn sgr(self) -> &'static str {
        match self {
            Self::Start => "32",
            Self::Goal => "35",
            Self::Bomb => "31",
            Self::RadAway => "36",
            Self::Empty => "37",
        }
    }
}

// SAFETY: `Cell` is `#[repr(u8)]`, and all discriminants are ASCII bytes.
unsafe impl IsValidAscii for Cell {}

impl Parse for Cell {
    fn parse<'i>(input: &'i str) -> IResult<&'i str, Self> {
        map(one_of(Self::STR), |value: char| {
            Self::try_from(value).unwrap()
        })(input)
    }
}

impl TryFrom<u8> for Cell {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            Self::START => Ok(Self::Start),
            Self::GOAL => Ok(Self::Goal),
            Self::BOMB => Ok(Self::Bomb),
            Self::RAD_AWAY => Ok(Self::RadAway),
            Self::EMPTY => Ok(Self::Empty),
            _ => Err(()),
        }
    }
}

impl TryFrom<char> for Cell {
    type Error = ();

    fn try_from(value: char) -> Result<Self, Self::Error> {
        (value as u8).try_into()
    }
}

/// Whether cell symbols are wrapped in SGR color sequences when rendering.
///
/// Selected once at startup; the rendering code itself is oblivious to whether the output device
/// understands colors.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ColorMode {
    #[default]
    Ansi,
    Plain,
}

impl ColorMode {
    fn write_cell(self, string: &mut String, cell: Cell) {
        match self {
            Self::Ansi => {
                write!(string, "\x1b[{}m{}\x1b[0m", cell.sgr(), cell as u8 as char).unwrap()
            }
            Self::Plain => string.push(cell as u8 as char),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
pub enum BoardError {
    UnparsedInput,
    NotSquare { dimensions: IVec2 },
    MissingStart,
    MissingGoal,
    ExtraStart { pos: IVec2 },
    ExtraGoal { pos: IVec2 },
}

/// A square puzzle grid with `Start` in the north-west corner and `Goal` in the south-east corner.
///
/// Immutable once constructed: solvers and the benchmark harness only ever borrow it.
#[derive(Clone, Debug, PartialEq)]
pub struct Board(Grid2D<Cell>);

impl Board {
    /// Randomly assigns each cell `Bomb`, `RadAway`, or `Empty` by comparing a uniform draw
    /// against the cumulative probability thresholds, then forces the two corner cells regardless
    /// of their drawn kind.
    pub fn generate<R: Rng>(
        side_len: usize,
        bomb_prob: f64,
        radaway_prob: f64,
        rng: &mut R,
    ) -> Self {
        let dimensions: IVec2 = SideLen(side_len).into();
        let mut grid: Grid2D<Cell> = Grid2D::allocate(dimensions);

        for _ in 0_usize..side_len * side_len {
            let draw: f64 = rng.gen::<f64>();

            grid.cells_mut().push(if draw < bomb_prob {
                Cell::Bomb
            } else if draw < bomb_prob + radaway_prob {
                Cell::RadAway
            } else {
                Cell::Empty
            });
        }

        *grid.get_mut(IVec2::ZERO).unwrap() = Cell::Start;
        *grid.get_mut(grid.max_dimensions()).unwrap() = Cell::Goal;

        Self(grid)
    }

    pub fn try_from_grid(grid: Grid2D<Cell>) -> Result<Self, BoardError> {
        use BoardError as Error;

        let dimensions: IVec2 = grid.dimensions();

        if dimensions.x != dimensions.y || dimensions.x < 1_i32 {
            return Err(Error::NotSquare { dimensions });
        }

        let goal: IVec2 = grid.max_dimensions();

        if *grid.get(goal).unwrap() != Cell::Goal {
            return Err(Error::MissingGoal);
        }

        // A 1x1 board is just its goal cell.
        if goal != IVec2::ZERO && *grid.get(IVec2::ZERO).unwrap() != Cell::Start {
            return Err(Error::MissingStart);
        }

        if let Some(pos) = grid
            .iter_positions_with_cell(&Cell::Start)
            .find(|pos| *pos != IVec2::ZERO)
        {
            return Err(Error::ExtraStart { pos });
        }

        if let Some(pos) = grid
            .iter_positions_with_cell(&Cell::Goal)
            .find(|pos| *pos != goal)
        {
            return Err(Error::ExtraGoal { pos });
        }

        Ok(Self(grid))
    }

    #[inline]
    pub fn grid(&self) -> &Grid2D<Cell> {
        &self.0
    }

    #[inline]
    pub fn side_len(&self) -> usize {
        self.0.dimensions().x as usize
    }

    /// The step budget: generous enough to admit any simple path plus slack, not a tight
    /// shortest-path bound.
    #[inline]
    pub fn t_max(&self) -> i32 {
        2_i32 * self.0.dimensions().x - 1_i32
    }

    #[inline]
    pub fn start(&self) -> IVec2 {
        IVec2::ZERO
    }

    #[inline]
    pub fn goal(&self) -> IVec2 {
        self.0.max_dimensions()
    }

    pub fn cell(&self, pos: IVec2) -> Option<Cell> {
        self.0.get(pos).copied()
    }

    /// Renders the board with row and column indices plus a legend.
    pub fn render(&self, color_mode: ColorMode) -> String {
        let side_len: usize = self.side_len();
        let mut string: String = String::new();

        string.push_str("   ");

        for x in 0_usize..side_len {
            write!(&mut string, "{x:2} ").unwrap();
        }

        string.push('\n');

        for y in 0_i32..side_len as i32 {
            write!(&mut string, "{y:2} ").unwrap();

            for x in 0_i32..side_len as i32 {
                string.push(' ');
                color_mode.write_cell(&mut string, self.cell(IVec2::new(x, y)).unwrap());
                string.push(' ');
            }

            string.push('\n');
        }

        string.push_str("\nlegend:\n");

        for cell in [Cell::Start, Cell::Goal, Cell::Bomb, Cell::RadAway, Cell::Empty] {
            string.push(' ');
            color_mode.write_cell(&mut string, cell);
            writeln!(&mut string, " : {}", cell.legend_entry()).unwrap();
        }

        string
    }
}

impl<'s> TryFrom<&'s str> for Board {
    type Error = BoardError;

    fn try_from(board_str: &'s str) -> Result<Self, Self::Error> {
        let (remaining, grid): (&str, Grid2D<Cell>) = Grid2D::<Cell>::parse(board_str)
            .map_err(|_: Err<_>| BoardError::UnparsedInput)?;

        if !remaining.trim_end().is_empty() {
            return Err(BoardError::UnparsedInput);
        }

        Self::try_from_grid(grid)
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        rand::{rngs::StdRng, SeedableRng},
    };

    const BOARD_STR: &str = "\
        S.R\n\
        .B.\n\
        ..E\n";

    #[test]
    fn test_try_from_str() {
        let board: Board = BOARD_STR.try_into().unwrap();

        assert_eq!(board.side_len(), 3_usize);
        assert_eq!(board.t_max(), 5_i32);
        assert_eq!(board.cell(IVec2::ZERO), Some(Cell::Start));
        assert_eq!(board.cell(IVec2::new(2_i32, 0_i32)), Some(Cell::RadAway));
        assert_eq!(board.cell(IVec2::new(1_i32, 1_i32)), Some(Cell::Bomb));
        assert_eq!(board.cell(board.goal()), Some(Cell::Goal));
        assert_eq!(board.cell(IVec2::new(3_i32, 0_i32)), None);

        // Symbol round-trip through the ASCII conversion.
        assert_eq!(String::from(board.grid().clone()), BOARD_STR);
    }

    #[test]
    fn test_try_from_str_errors() {
        assert_eq!(
            Board::try_from("S.\n.E\nextra"),
            Err(BoardError::UnparsedInput)
        );
        assert_eq!(
            Board::try_from("S.R\n.B.\n"),
            Err(BoardError::NotSquare {
                dimensions: IVec2::new(3_i32, 2_i32)
            })
        );
        assert_eq!(Board::try_from("S.\n..\n"), Err(BoardError::MissingGoal));
        assert_eq!(Board::try_from("..\n.E\n"), Err(BoardError::MissingStart));
        assert_eq!(
            Board::try_from("S.\nSE\n"),
            Err(BoardError::ExtraStart {
                pos: IVec2::new(0_i32, 1_i32)
            })
        );
        assert_eq!(
            Board::try_from("SE\n.E\n"),
            Err(BoardError::ExtraGoal {
                pos: IVec2::new(1_i32, 0_i32)
            })
        );
    }

    #[test]
    fn test_generate() {
        let mut rng: StdRng = StdRng::seed_from_u64(0_u64);
        let board: Board = Board::generate(8_usize, 0.2_f64, 0.2_f64, &mut rng);

        assert_eq!(board.cell(board.start()), Some(Cell::Start));
        assert_eq!(board.cell(board.goal()), Some(Cell::Goal));
        assert_eq!(
            board
                .grid()
                .iter_positions_with_cell(&Cell::Start)
                .count(),
            1_usize
        );
        assert_eq!(board.grid().iter_positions_with_cell(&Cell::Goal).count(), 1_usize);

        // Same seed, same board.
        let mut rng: StdRng = StdRng::seed_from_u64(0_u64);

        assert_eq!(Board::generate(8_usize, 0.2_f64, 0.2_f64, &mut rng), board);
    }

    #[test]
    fn test_generate_extreme_probabilities() {
        let mut rng: StdRng = StdRng::seed_from_u64(1_u64);
        let board: Board = Board::generate(4_usize, 1.0_f64, 0.0_f64, &mut rng);

        assert!(board
            .grid()
            .iter_positions()
            .all(|pos| pos == board.start()
                || pos == board.goal()
                || board.cell(pos) == Some(Cell::Bomb)));
    }

    #[test]
    fn test_render_plain() {
        let board: Board = BOARD_STR.try_into().unwrap();
        let rendered: String = board.render(ColorMode::Plain);

        assert!(rendered.starts_with("    0  1  2 \n 0  S  .  R \n 1  .  B  . \n 2  .  .  E \n"));
        assert!(rendered.contains("R : RadAway"));
    }
}
