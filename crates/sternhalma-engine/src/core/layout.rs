use std::collections::{HashSet, VecDeque};

use super::{
    board::{
        Arm, Board, CELL_COUNT, CellContent, CellIndex, Player, cell_index, neighbor_indices,
    },
    coord::CubeCoord,
};

/// Distance value for cells that cannot reach the target region.
pub const UNREACHABLE: u8 = u8::MAX;

/// Maximum number of players on the star board.
pub const MAX_PLAYERS: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum LayoutError {
    #[display("player count {_0} is not supported (expected 2..=6)")]
    PlayerCount(#[error(not(source))] usize),
    #[display("cell {_0} is off the board")]
    OffBoard(#[error(not(source))] CubeCoord),
    #[display("cell {_0} is used more than once")]
    DuplicateCell(#[error(not(source))] CubeCoord),
    #[display("{_0} has an empty goal region")]
    EmptyGoal(#[error(not(source))] Player),
}

/// Starting cells and goal region of one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub home: Vec<CubeCoord>,
    pub goal: Vec<CubeCoord>,
}

impl Seat {
    /// The seat starting on `arm` and racing to the opposite arm.
    #[must_use]
    pub fn from_arm(arm: Arm) -> Self {
        Self {
            home: arm.cells(),
            goal: arm.opposite().cells(),
        }
    }
}

/// Precomputed per-seat distance tables.
///
/// Distances are BFS step counts over the board with walls as obstacles
/// (pieces move, so they are ignored).
#[derive(Debug, Clone)]
pub struct SeatGeometry {
    seat: Seat,
    goal_mask: [bool; CELL_COUNT],
    apex: CubeCoord,
    goal_distance: [u8; CELL_COUNT],
    apex_distance: [u8; CELL_COUNT],
    max_progress: u8,
    max_goal_depth: u8,
}

impl SeatGeometry {
    fn new(seat: Seat, walls: &[bool; CELL_COUNT]) -> Self {
        let mut goal_mask = [false; CELL_COUNT];
        for &c in &seat.goal {
            if let Some(i) = cell_index(c) {
                goal_mask[usize::from(i)] = true;
            }
        }
        // the deepest goal cell is the one farthest from the center
        let apex = seat
            .goal
            .iter()
            .copied()
            .reduce(|best, c| if c.length() > best.length() { c } else { best })
            .unwrap_or(CubeCoord::ORIGIN);
        let goal_distance = bfs(seat.goal.iter().filter_map(|&c| cell_index(c)), walls);
        let apex_distance = bfs(cell_index(apex), walls);
        let finite_max = |cells: &[CubeCoord]| {
            cells
                .iter()
                .filter_map(|&c| cell_index(c))
                .map(|i| apex_distance[usize::from(i)])
                .filter(|&d| d != UNREACHABLE)
                .max()
                .unwrap_or(0)
        };
        let max_progress = finite_max(&seat.home);
        let max_goal_depth = finite_max(&seat.goal);
        Self {
            seat,
            goal_mask,
            apex,
            goal_distance,
            apex_distance,
            max_progress,
            max_goal_depth,
        }
    }

    #[must_use]
    pub fn home(&self) -> &[CubeCoord] {
        &self.seat.home
    }

    #[must_use]
    pub fn goal(&self) -> &[CubeCoord] {
        &self.seat.goal
    }

    #[must_use]
    pub fn is_goal(&self, index: CellIndex) -> bool {
        self.goal_mask[usize::from(index)]
    }

    /// The goal cell farthest from the board center.
    #[must_use]
    pub fn apex(&self) -> CubeCoord {
        self.apex
    }

    /// Steps from `index` to the nearest goal cell (0 inside the goal).
    #[must_use]
    pub fn goal_distance(&self, index: CellIndex) -> u8 {
        self.goal_distance[usize::from(index)]
    }

    /// Steps from `index` to the goal apex.
    #[must_use]
    pub fn apex_distance(&self, index: CellIndex) -> u8 {
        self.apex_distance[usize::from(index)]
    }

    /// Largest apex distance among the home cells.
    #[must_use]
    pub fn max_progress(&self) -> u8 {
        self.max_progress
    }

    /// Largest apex distance among the goal cells.
    #[must_use]
    pub fn max_goal_depth(&self) -> u8 {
        self.max_goal_depth
    }
}

fn bfs<I>(sources: I, walls: &[bool; CELL_COUNT]) -> [u8; CELL_COUNT]
where
    I: IntoIterator<Item = CellIndex>,
{
    let mut dist = [UNREACHABLE; CELL_COUNT];
    let mut queue = VecDeque::new();
    for s in sources {
        if !walls[usize::from(s)] && dist[usize::from(s)] == UNREACHABLE {
            dist[usize::from(s)] = 0;
            queue.push_back(s);
        }
    }
    while let Some(i) = queue.pop_front() {
        let d = dist[usize::from(i)];
        for n in neighbor_indices(i) {
            if walls[usize::from(n)] || dist[usize::from(n)] != UNREACHABLE {
                continue;
            }
            dist[usize::from(n)] = d + 1;
            queue.push_back(n);
        }
    }
    dist
}

/// A starting layout: one seat per player plus fixed walls.
///
/// Layouts are immutable once built and are shared between game states
/// through an `Arc`.
#[derive(Debug, Clone)]
pub struct Layout {
    seats: Vec<SeatGeometry>,
    walls: Vec<CubeCoord>,
}

impl Layout {
    /// The standard star layout for `player_count` players.
    ///
    /// Seats use the conventional arms (2 players sit opposite each other,
    /// 3 players on alternating arms, ...), each racing to the opposite arm.
    ///
    /// # Example
    ///
    /// ```
    /// use sternhalma_engine::Layout;
    ///
    /// let layout = Layout::standard(3).unwrap();
    /// assert_eq!(layout.player_count(), 3);
    /// assert!(Layout::standard(7).is_err());
    /// ```
    pub fn standard(player_count: usize) -> Result<Self, LayoutError> {
        let arms: &[u8] = match player_count {
            2 => &[0, 3],
            3 => &[0, 2, 4],
            4 => &[0, 1, 3, 4],
            5 => &[0, 1, 2, 3, 4],
            6 => &[0, 1, 2, 3, 4, 5],
            n => return Err(LayoutError::PlayerCount(n)),
        };
        let seats = arms.iter().map(|&a| Seat::from_arm(Arm::new(a))).collect();
        Self::custom(seats, vec![])
    }

    /// Builds a custom layout.
    ///
    /// Home cells and walls must be on the board and must not overlap; goal
    /// regions must be non-empty. Overlaps are rejected rather than merged.
    pub fn custom(seats: Vec<Seat>, walls: Vec<CubeCoord>) -> Result<Self, LayoutError> {
        if !(2..=MAX_PLAYERS).contains(&seats.len()) {
            return Err(LayoutError::PlayerCount(seats.len()));
        }
        let mut used = HashSet::new();
        for &c in seats.iter().flat_map(|s| &s.home).chain(&walls) {
            if cell_index(c).is_none() {
                return Err(LayoutError::OffBoard(c));
            }
            if !used.insert(c) {
                return Err(LayoutError::DuplicateCell(c));
            }
        }
        for (i, seat) in seats.iter().enumerate() {
            if seat.goal.is_empty() {
                return Err(LayoutError::EmptyGoal(player_at(i)));
            }
            if let Some(&c) = seat.goal.iter().find(|&&c| cell_index(c).is_none()) {
                return Err(LayoutError::OffBoard(c));
            }
        }

        let mut wall_mask = [false; CELL_COUNT];
        for &w in &walls {
            if let Some(i) = cell_index(w) {
                wall_mask[usize::from(i)] = true;
            }
        }
        let seats = seats
            .into_iter()
            .map(|s| SeatGeometry::new(s, &wall_mask))
            .collect();
        Ok(Self { seats, walls })
    }

    #[must_use]
    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    /// Returns the seat geometry of `player`.
    ///
    /// # Panics
    ///
    /// Panics if `player` has no seat in this layout.
    #[must_use]
    pub fn seat(&self, player: Player) -> &SeatGeometry {
        &self.seats[player.index()]
    }

    pub fn players(&self) -> impl Iterator<Item = Player> + use<> {
        (0..self.seats.len()).map(player_at)
    }

    #[must_use]
    pub fn walls(&self) -> &[CubeCoord] {
        &self.walls
    }

    /// The starting board: walls plus every player's home pieces.
    #[must_use]
    pub fn initial_board(&self) -> Board {
        let mut board = Board::EMPTY;
        for &w in &self.walls {
            board.set(w, CellContent::Wall);
        }
        for (player, seat) in self.players().zip(&self.seats) {
            for &c in seat.home() {
                board.set(c, CellContent::Piece(player));
            }
        }
        board
    }
}

fn player_at(index: usize) -> Player {
    Player(u8::try_from(index).expect("seat index fits in u8"))
}
