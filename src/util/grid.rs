use {
    super::Parse,
    glam::IVec2,
    nom::{
        character::complete::line_ending,
        combinator::{map_res, opt},
        error::{Error as NomError, ErrorKind as NomErrorKind},
        multi::many1_count,
        sequence::tuple,
        Err, IResult,
    },
    static_assertions::const_assert,
    std::{
        fmt::{Debug, DebugList, Formatter, Result as FmtResult, Write},
        mem::transmute,
        str::from_utf8,
    },
    strum::{EnumCount, EnumIter},
};

#[derive(Copy, Clone, Debug, Default, EnumCount, EnumIter, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum Direction {
    #[default]
    North,
    East,
    South,
    West,
}

const VECS: [IVec2; Direction::COUNT] = [IVec2::NEG_Y, IVec2::X, IVec2::Y, IVec2::NEG_X];

// This guarantees we can safely convert from `u8` to `Direction` by masking the smallest 2 bits,
// which is the same as masking by `MASK`
const_assert!(Direction::COUNT == 4_usize);

impl Direction {
    pub const COUNT_U8: u8 = Self::COUNT as u8;
    pub const MASK: u8 = Self::COUNT_U8 - 1_u8;
    pub const HALF_COUNT: u8 = Self::COUNT_U8 / 2_u8;

    #[inline]
    pub const fn vec(self) -> IVec2 {
        VECS[self as usize]
    }

    #[inline]
    pub const fn from_u8(value: u8) -> Self {
        // SAFETY: See `const_assert` above
        unsafe { transmute(value & Self::MASK) }
    }

    #[inline]
    pub const fn next(self) -> Self {
        Self::from_u8(self as u8 + 1_u8)
    }

    #[inline]
    pub const fn rev(self) -> Self {
        Self::from_u8(self as u8 + Self::HALF_COUNT)
    }
}

impl From<Direction> for IVec2 {
    fn from(value: Direction) -> Self {
        value.vec()
    }
}

impl From<u8> for Direction {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

pub struct SideLen(pub usize);

impl From<SideLen> for IVec2 {
    fn from(side_len: SideLen) -> Self {
        IVec2::new(side_len.0 as i32, side_len.0 as i32)
    }
}

pub fn manhattan_magnitude_2d(pos: IVec2) -> i32 {
    let abs: IVec2 = pos.abs();

    abs.x + abs.y
}

pub fn grid_2d_contains(pos: IVec2, dimensions: IVec2) -> bool {
    (pos.cmpge(IVec2::ZERO) & pos.cmplt(dimensions)).all()
}

pub struct Grid2D<T> {
    cells: Vec<T>,

    /// Should only contain unsigned values, but is signed for ease of use for iterating
    dimensions: IVec2,
}

impl<T> Grid2D<T> {
    pub fn try_from_cells_and_width(cells: Vec<T>, width: usize) -> Option<Self> {
        let cells_len: usize = cells.len();

        if width == 0_usize || cells_len % width != 0_usize {
            None
        } else {
            Some(Self {
                cells,
                dimensions: IVec2::new(width as i32, (cells_len / width) as i32),
            })
        }
    }

    pub fn allocate(dimensions: IVec2) -> Self {
        Self {
            cells: Vec::with_capacity((dimensions.x * dimensions.y) as usize),
            dimensions,
        }
    }

    #[inline]
    pub fn cells(&self) -> &[T] {
        &self.cells
    }

    #[inline]
    pub fn cells_mut(&mut self) -> &mut Vec<T> {
        &mut self.cells
    }

    #[inline]
    pub fn dimensions(&self) -> IVec2 {
        self.dimensions
    }

    #[inline]
    pub fn area(&self) -> usize {
        (self.dimensions.x * self.dimensions.y) as usize
    }

    #[inline]
    pub fn contains(&self, pos: IVec2) -> bool {
        grid_2d_contains(pos, self.dimensions)
    }

    #[inline]
    pub fn index_from_pos(&self, pos: IVec2) -> usize {
        pos.y as usize * self.dimensions.x as usize + pos.x as usize
    }

    pub fn try_index_from_pos(&self, pos: IVec2) -> Option<usize> {
        self.contains(pos).then(|| self.index_from_pos(pos))
    }

    pub fn pos_from_index(&self, index: usize) -> IVec2 {
        let x: usize = self.dimensions.x as usize;

        IVec2::new((index % x) as i32, (index / x) as i32)
    }

    #[inline(always)]
    pub fn max_dimensions(&self) -> IVec2 {
        self.dimensions - IVec2::ONE
    }

    pub fn get(&self, pos: IVec2) -> Option<&T> {
        self.try_index_from_pos(pos)
            .map(|index: usize| &self.cells[index])
    }

    pub fn get_mut(&mut self, pos: IVec2) -> Option<&mut T> {
        self.try_index_from_pos(pos)
            .map(|index: usize| &mut self.cells[index])
    }

    pub fn iter_positions(&self) -> impl Iterator<Item = IVec2> + '_ {
        (0_usize..self.area()).map(|index: usize| self.pos_from_index(index))
    }

    pub fn iter_filtered_positions<'a, P: Fn(&T) -> bool + 'a>(
        &'a self,
        predicate: P,
    ) -> impl Iterator<Item = IVec2> + 'a {
        self.cells
            .iter()
            .enumerate()
            .filter_map(move |(index, cell)| predicate(cell).then(|| self.pos_from_index(index)))
    }

    pub fn iter_positions_with_cell<'a>(&'a self, target: &'a T) -> impl Iterator<Item = IVec2> + 'a
    where
        T: PartialEq,
    {
        self.iter_filtered_positions(|cell| *cell == *target)
    }
}

impl<T: Clone> Clone for Grid2D<T> {
    fn clone(&self) -> Self {
        Self {
            cells: self.cells.clone(),
            dimensions: self.dimensions,
        }
    }
}

impl<T: Debug> Debug for Grid2D<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str("Grid2D")?;
        let mut y_list: DebugList = f.debug_list();

        for y in 0_i32..self.dimensions.y {
            let start: usize = (y * self.dimensions.x) as usize;

            y_list.entry(&&self.cells[start..(start + self.dimensions.x as usize)]);
        }

        y_list.finish()
    }
}

impl<T: Default> Grid2D<T> {
    pub fn default(dimensions: IVec2) -> Self {
        let capacity: usize = (dimensions.x * dimensions.y) as usize;
        let mut cells: Vec<T> = Vec::with_capacity(capacity);

        cells.resize_with(capacity, T::default);

        Self { cells, dimensions }
    }
}

impl<T: PartialEq> PartialEq for Grid2D<T> {
    fn eq(&self, other: &Self) -> bool {
        self.dimensions == other.dimensions && self.cells == other.cells
    }
}

impl<T: Parse> Parse for Grid2D<T> {
    fn parse(input: &str) -> IResult<&str, Self> {
        let mut width: Option<usize> = None;
        let mut cells: Vec<T> = Vec::new();
        let (input, _) = many1_count(map_res(
            tuple((T::parse, opt(line_ending))),
            |(cell, opt_line_ending)| -> Result<(), ()> {
                cells.push(cell);

                if opt_line_ending.is_some() {
                    match width {
                        Some(width) => {
                            if cells.len() % width != 0_usize {
                                Err(())?;
                            }
                        }
                        None => {
                            width = Some(cells.len());
                        }
                    }
                }

                Ok(())
            },
        ))(input)?;

        let width: usize = width.unwrap_or(cells.len());

        Grid2D::try_from_cells_and_width(cells, width)
            .map(|grid| (input, grid))
            .ok_or_else(|| Err::Failure(NomError::new(input, NomErrorKind::ManyMN)))
    }
}

/// A marker trait to indicate that a type is a single byte, and any possible value is a valid
/// ASCII byte.
///
/// # Safety
///
/// Only implement this on a type that meets the following criteria:
///
/// * `std::mem::size_of::<Self>() == 1_usize`
/// * `std::str::from_utf8(std::mem::transmute::<[Self], [u8]>(value)).is_ok()` for any `value:
///   [Self]`.
pub unsafe trait IsValidAscii {}

impl<T: IsValidAscii> From<Grid2D<T>> for String {
    fn from(value: Grid2D<T>) -> Self {
        let dimensions: IVec2 = value.dimensions;
        let width: usize = dimensions.x as usize;
        let height: usize = dimensions.y as usize;

        // SAFETY: Guaranteed by `T` implementing `IsValidAscii`
        let bytes: &[u8] = unsafe { transmute(value.cells()) };

        let mut string: String = String::with_capacity((width + 1_usize) * height);

        for y in 0_usize..height {
            let start: usize = y * width;

            // `IsValidAscii` makes this infallible
            let row_str: &str = from_utf8(&bytes[start..start + width]).unwrap();

            writeln!(&mut string, "{row_str}").unwrap();
        }

        string
    }
}

#[cfg(test)]
mod tests {
    use {super::*, strum::IntoEnumIterator};

    #[test]
    fn test_direction_vecs() {
        for dir in Direction::iter() {
            assert_eq!(dir.rev().vec(), -dir.vec());
            assert_eq!(dir.vec().dot(dir.next().vec()), 0_i32);
            assert_eq!(manhattan_magnitude_2d(dir.vec()), 1_i32);
        }
    }

    #[test]
    fn test_grid_2d_indexing() {
        let grid: Grid2D<u8> = Grid2D::try_from_cells_and_width(vec![0_u8; 12_usize], 4_usize)
            .unwrap();

        assert_eq!(grid.dimensions(), IVec2::new(4_i32, 3_i32));
        assert_eq!(grid.area(), 12_usize);

        for index in 0_usize..grid.area() {
            assert_eq!(grid.index_from_pos(grid.pos_from_index(index)), index);
        }

        assert!(!grid.contains(IVec2::new(4_i32, 0_i32)));
        assert!(!grid.contains(IVec2::new(0_i32, -1_i32)));
        assert_eq!(grid.try_index_from_pos(IVec2::new(3_i32, 2_i32)), Some(11_usize));
    }
}
