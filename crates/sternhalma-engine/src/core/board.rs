use std::{fmt, sync::LazyLock};

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};

use super::coord::{CubeCoord, Direction};

/// Radius of the central hexagon of the star board.
pub const HEX_RADIUS: i32 = 4;
/// Number of rows in each triangular arm.
pub const ARM_SIZE: i32 = 4;
/// Total number of cells on the star board.
pub const CELL_COUNT: usize = 121;

const SPAN: i32 = HEX_RADIUS + ARM_SIZE;
const GRID_WIDTH: usize = (2 * SPAN + 1) as usize;

/// A player (seat) index, `0..player_count`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[display("P{_0}")]
#[serde(transparent)]
pub struct Player(pub u8);

impl Player {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Content of a single board cell.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::IsVariant,
)]
pub enum CellContent {
    #[default]
    Empty,
    Piece(Player),
    Wall,
}

impl CellContent {
    /// Returns the owner if this cell holds a piece.
    #[must_use]
    pub const fn piece(self) -> Option<Player> {
        match self {
            Self::Piece(player) => Some(player),
            Self::Empty | Self::Wall => None,
        }
    }
}

/// Index of a cell in the canonical board order.
pub type CellIndex = u8;

/// Static geometry of the star board: cell list, coordinate lookup and
/// neighbor table.
struct Geometry {
    cells: Vec<CubeCoord>,
    lookup: [Option<CellIndex>; GRID_WIDTH * GRID_WIDTH],
    neighbors: Vec<[Option<CellIndex>; Direction::LEN]>,
}

fn is_star_cell(c: CubeCoord) -> bool {
    let (q, r, s) = (c.q(), c.r(), c.s());
    let lower = -HEX_RADIUS;
    let upper = HEX_RADIUS;
    (q >= lower && r >= lower && s >= lower) || (q <= upper && r <= upper && s <= upper)
}

fn grid_slot(c: CubeCoord) -> Option<usize> {
    let q = usize::try_from(c.q() + SPAN).ok()?;
    let r = usize::try_from(c.r() + SPAN).ok()?;
    (q < GRID_WIDTH && r < GRID_WIDTH).then_some(q * GRID_WIDTH + r)
}

static GEOMETRY: LazyLock<Geometry> = LazyLock::new(|| {
    let mut cells = vec![];
    for q in -SPAN..=SPAN {
        for r in -SPAN..=SPAN {
            let c = CubeCoord::axial(q, r);
            if c.s().abs() <= SPAN && is_star_cell(c) {
                cells.push(c);
            }
        }
    }
    assert_eq!(cells.len(), CELL_COUNT);

    let mut lookup = [None; GRID_WIDTH * GRID_WIDTH];
    for (i, &c) in cells.iter().enumerate() {
        let slot = grid_slot(c).expect("star cell inside grid");
        lookup[slot] = Some(CellIndex::try_from(i).expect("cell index fits in u8"));
    }

    let neighbors = cells
        .iter()
        .map(|&c| Direction::ALL.map(|d| grid_slot(c.neighbor(d)).and_then(|slot| lookup[slot])))
        .collect();

    Geometry {
        cells,
        lookup,
        neighbors,
    }
});

/// Returns the canonical index of `coord`, or `None` when it is off the board.
#[must_use]
pub fn cell_index(coord: CubeCoord) -> Option<CellIndex> {
    grid_slot(coord).and_then(|slot| GEOMETRY.lookup[slot])
}

/// Returns the coordinate of a canonical cell index.
#[must_use]
pub fn cell_coord(index: CellIndex) -> CubeCoord {
    GEOMETRY.cells[usize::from(index)]
}

/// Returns the neighbor of `index` in direction `dir`, if on the board.
#[must_use]
pub fn neighbor_index(index: CellIndex, dir: Direction) -> Option<CellIndex> {
    GEOMETRY.neighbors[usize::from(index)][dir as usize]
}

/// Returns all on-board neighbors of `index`, in direction order.
#[must_use]
pub fn neighbor_indices(index: CellIndex) -> ArrayVec<CellIndex, { Direction::LEN }> {
    GEOMETRY.neighbors[usize::from(index)]
        .iter()
        .flatten()
        .copied()
        .collect()
}

/// Iterates all board coordinates in canonical order.
pub fn all_cells() -> impl Iterator<Item = CubeCoord> {
    GEOMETRY.cells.iter().copied()
}

/// Returns `true` if `coord` is one of the 121 star cells.
#[must_use]
pub fn is_on_board(coord: CubeCoord) -> bool {
    cell_index(coord).is_some()
}

/// One of the six triangular arms of the star, numbered clockwise starting
/// from the `q >= 5` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Arm(u8);

impl Arm {
    pub const COUNT: u8 = 6;

    /// # Panics
    ///
    /// Panics if `index >= 6`.
    #[must_use]
    pub fn new(index: u8) -> Self {
        assert!(index < Self::COUNT, "arm index {index} out of range");
        Self(index)
    }

    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }

    #[must_use]
    pub const fn opposite(self) -> Self {
        Self((self.0 + 3) % Self::COUNT)
    }

    /// The 10 cells of this arm, in canonical board order.
    #[must_use]
    pub fn cells(self) -> Vec<CubeCoord> {
        // arm 0 is `q > HEX_RADIUS`; the others are its rotations
        all_cells()
            .filter(|c| c.rotate60(-i32::from(self.0)).q() > HEX_RADIUS)
            .collect()
    }

    /// The outermost cell of this arm.
    #[must_use]
    pub fn tip(self) -> CubeCoord {
        CubeCoord::new(SPAN, -ARM_SIZE, -ARM_SIZE).rotate60(i32::from(self.0))
    }
}

/// Occupancy of every board cell.
///
/// The board is a dense array in canonical cell order, so it is cheap to copy
/// (turn snapshots) and to hash (evaluation cache keys), and its contents do
/// not depend on any insertion order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [CellContent; CELL_COUNT],
}

impl Default for Board {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl Board {
    pub const EMPTY: Self = Self {
        cells: [CellContent::Empty; CELL_COUNT],
    };

    /// Returns the content at `coord`, or `None` when off the board.
    #[must_use]
    pub fn get(&self, coord: CubeCoord) -> Option<CellContent> {
        cell_index(coord).map(|i| self.at(i))
    }

    #[must_use]
    pub fn at(&self, index: CellIndex) -> CellContent {
        self.cells[usize::from(index)]
    }

    pub fn set_at(&mut self, index: CellIndex, content: CellContent) {
        self.cells[usize::from(index)] = content;
    }

    /// Sets the content at `coord`.
    ///
    /// # Panics
    ///
    /// Panics if `coord` is off the board.
    pub fn set(&mut self, coord: CubeCoord, content: CellContent) {
        let index = cell_index(coord).unwrap_or_else(|| panic!("{coord} is off the board"));
        self.set_at(index, content);
    }

    #[must_use]
    pub fn is_empty_at(&self, index: CellIndex) -> bool {
        self.at(index).is_empty()
    }

    /// Iterates `(index, owner)` for every piece on the board.
    pub fn pieces(&self) -> impl Iterator<Item = (CellIndex, Player)> + '_ {
        (0..)
            .zip(&self.cells)
            .filter_map(|(i, c)| c.piece().map(|p| (i, p)))
    }

    /// Iterates the cell indices of `player`'s pieces in canonical order.
    pub fn pieces_of(&self, player: Player) -> impl Iterator<Item = CellIndex> + '_ {
        self.pieces()
            .filter(move |(_, p)| *p == player)
            .map(|(i, _)| i)
    }

    #[must_use]
    pub fn piece_count(&self, player: Player) -> usize {
        self.pieces_of(player).count()
    }

    /// Moves whatever is at `from` to the empty cell `to`.
    pub(crate) fn relocate(&mut self, from: CellIndex, to: CellIndex) {
        debug_assert!(self.is_empty_at(to));
        self.cells[usize::from(to)] = self.cells[usize::from(from)];
        self.cells[usize::from(from)] = CellContent::Empty;
    }

    pub(crate) fn exchange(&mut self, a: CellIndex, b: CellIndex) {
        self.cells.swap(usize::from(a), usize::from(b));
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.pieces().map(|(i, p)| (cell_coord(i), p)))
            .finish()
    }
}

impl fmt::Display for Board {
    /// Renders the board as text rows of constant `r`, indented to show the
    /// hex layout: `.` empty, `#` wall, digit = player.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in -SPAN..=SPAN {
            let row: Vec<_> = all_cells().filter(|c| c.r() == r).collect();
            let Some(first) = row.first() else {
                continue;
            };
            // x position in half-cells; the widest rows start at -3 * HEX_RADIUS
            let indent = 2 * first.q() + r + 3 * HEX_RADIUS;
            write!(f, "{:width$}", "", width = usize::try_from(indent).unwrap_or(0))?;
            for (n, c) in row.iter().enumerate() {
                if n > 0 {
                    f.write_str(" ")?;
                }
                match self.get(*c) {
                    Some(CellContent::Piece(p)) => write!(f, "{}", p.0)?,
                    Some(CellContent::Wall) => f.write_str("#")?,
                    _ => f.write_str(".")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_star_has_121_cells() {
        assert_eq!(all_cells().count(), CELL_COUNT);
        let hex: HashSet<_> = CubeCoord::ORIGIN.disk(4).into_iter().collect();
        assert!(hex.iter().all(|&c| is_on_board(c)));
        assert!(!is_on_board(CubeCoord::new(5, 0, -5)));
        assert!(is_on_board(CubeCoord::new(8, -4, -4)));
        assert!(!is_on_board(CubeCoord::new(9, -4, -5)));
    }

    #[test]
    fn test_index_roundtrip() {
        for (i, c) in all_cells().enumerate() {
            let index = cell_index(c).unwrap();
            assert_eq!(usize::from(index), i);
            assert_eq!(cell_coord(index), c);
        }
    }

    #[test]
    fn test_arms_partition_outer_cells() {
        let mut seen = HashSet::new();
        for a in 0..Arm::COUNT {
            let arm = Arm::new(a);
            let cells = arm.cells();
            assert_eq!(cells.len(), 10);
            assert!(cells.contains(&arm.tip()));
            for c in cells {
                assert!(c.length() > HEX_RADIUS);
                assert!(seen.insert(c));
            }
        }
        assert_eq!(seen.len(), CELL_COUNT - 61);
        assert_eq!(Arm::new(1).opposite(), Arm::new(4));
    }

    #[test]
    fn test_neighbor_table_matches_coordinates() {
        for c in all_cells() {
            let index = cell_index(c).unwrap();
            for dir in Direction::ALL {
                let expected = cell_index(c.neighbor(dir));
                assert_eq!(neighbor_index(index, dir), expected);
            }
        }
    }

    #[test]
    fn test_relocate_and_exchange() {
        let mut board = Board::EMPTY;
        let a = cell_index(CubeCoord::ORIGIN).unwrap();
        let b = cell_index(CubeCoord::new(1, 0, -1)).unwrap();
        board.set_at(a, CellContent::Piece(Player(0)));
        board.relocate(a, b);
        assert!(board.at(a).is_empty());
        assert_eq!(board.at(b), CellContent::Piece(Player(0)));

        board.set_at(a, CellContent::Piece(Player(1)));
        board.exchange(a, b);
        assert_eq!(board.at(a), CellContent::Piece(Player(0)));
        assert_eq!(board.at(b), CellContent::Piece(Player(1)));
        assert_eq!(board.piece_count(Player(0)), 1);
    }
}
