//! Legal move generation.
//!
//! For a piece at an origin the generator produces every legal destination:
//!
//! - **Steps** onto adjacent empty cells
//! - **Swaps** into an adjacent goal cell held by another player's piece (when
//!   [`RuleSet::allow_swap`] is on)
//! - **Jumps**: one or more hops over an adjacent piece (or wall, when
//!   [`RuleSet::jump_over_walls`] is on) onto the empty cell right behind it
//!
//! Chain jumps are explored depth-first with an explicit stack over an arena of
//! `(cell, parent)` nodes. Every landing cell is visited at most once and the
//! origin counts as visited, so no path repeats a coordinate and the search
//! always terminates. Paths are rebuilt from the arena, never shared between
//! branches.
//!
//! Every hop moves the piece by twice a unit vector, so jump destinations
//! keep the parity of the origin's axial coordinates and can never be
//! adjacent to it. A destination is therefore reached either by a step (or
//! swap) or by a jump, never both.
//!
//! The output order is fixed: steps/swaps in [`Direction::ALL`] order, then jump
//! destinations in discovery order. It depends only on the board contents and
//! the origin, which keeps AI candidate enumeration deterministic.

use crate::{
    core::{
        Board, CELL_COUNT, CellContent, CellIndex, CubeCoord, Direction, Move, Player,
        SeatGeometry, cell_coord, cell_index, neighbor_index,
    },
    engine::state::{GameState, RuleSet},
};

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum MoveGenError {
    #[display("{_0} is off the board")]
    OffBoard(#[error(not(source))] CubeCoord),
    #[display("no piece at {_0}")]
    NoPiece(#[error(not(source))] CubeCoord),
    #[display("piece at {at} belongs to {owner}, but it is {current}'s turn")]
    NotYourPiece {
        at: CubeCoord,
        owner: Player,
        current: Player,
    },
}

/// Returns every legal move of the current player's piece at `origin`.
///
/// A piece without moves yields an empty list. Asking for an empty cell or for
/// another player's piece is an error.
///
/// # Example
///
/// ```
/// use sternhalma_engine::{CubeCoord, GameState, move_gen};
///
/// let state = GameState::standard(2).unwrap();
/// // a front-row piece of player 0 can step forward
/// let moves = move_gen::legal_moves(&state, CubeCoord::new(5, -1, -4)).unwrap();
/// assert!(moves.iter().any(|m| m.to == CubeCoord::new(4, -1, -3)));
/// // a second-row piece is surrounded by its own pieces and can only jump
/// let back = move_gen::legal_moves(&state, CubeCoord::new(6, -2, -4)).unwrap();
/// assert!(!back.is_empty());
/// assert!(back.iter().all(|m| m.is_jump()));
/// ```
pub fn legal_moves(state: &GameState, origin: CubeCoord) -> Result<Vec<Move>, MoveGenError> {
    let index = cell_index(origin).ok_or(MoveGenError::OffBoard(origin))?;
    let owner = state
        .board()
        .at(index)
        .piece()
        .ok_or(MoveGenError::NoPiece(origin))?;
    let current = state.current_player();
    if owner != current {
        return Err(MoveGenError::NotYourPiece {
            at: origin,
            owner,
            current,
        });
    }
    Ok(moves_for_piece(
        state.board(),
        state.seat(owner),
        state.rules(),
        index,
        owner,
    ))
}

/// Every move of every piece of `player`, pieces taken in board order.
#[must_use]
pub fn all_moves(state: &GameState, player: Player) -> Vec<Move> {
    let board = state.board();
    let seat = state.seat(player);
    board
        .pieces_of(player)
        .flat_map(|i| moves_for_piece(board, seat, state.rules(), i, player))
        .collect()
}

/// Returns `true` if `player` has at least one legal move.
#[must_use]
pub fn has_any_move(state: &GameState, player: Player) -> bool {
    let board = state.board();
    let seat = state.seat(player);
    board
        .pieces_of(player)
        .any(|i| !moves_for_piece(board, seat, state.rules(), i, player).is_empty())
}

/// Legal moves of `player`'s piece at `origin`, without ownership checks.
#[must_use]
pub fn moves_for_piece(
    board: &Board,
    seat: &SeatGeometry,
    rules: RuleSet,
    origin: CellIndex,
    player: Player,
) -> Vec<Move> {
    let from = cell_coord(origin);
    let mut moves = vec![];
    for dir in Direction::ALL {
        let Some(n) = neighbor_index(origin, dir) else {
            continue;
        };
        match board.at(n) {
            CellContent::Empty => moves.push(Move::step(from, cell_coord(n))),
            CellContent::Piece(occupant)
                if rules.allow_swap && occupant != player && seat.is_goal(n) =>
            {
                moves.push(Move::swap(from, cell_coord(n)));
            }
            CellContent::Piece(_) | CellContent::Wall => {}
        }
    }
    moves.extend(jump_moves(board, rules, origin, &[]));
    moves
}

/// Chain jumps still available to a piece standing at `at` in the middle of a
/// turn, never landing on a cell in `visited`.
#[must_use]
pub fn continuation_jumps(
    board: &Board,
    rules: RuleSet,
    at: CubeCoord,
    visited: &[CubeCoord],
) -> Vec<Move> {
    let Some(origin) = cell_index(at) else {
        return vec![];
    };
    let visited: Vec<_> = visited.iter().filter_map(|&c| cell_index(c)).collect();
    jump_moves(board, rules, origin, &visited)
}

#[derive(Debug, Clone, Copy)]
struct HopNode {
    cell: CellIndex,
    parent: Option<usize>,
}

fn jump_moves(
    board: &Board,
    rules: RuleSet,
    origin: CellIndex,
    visited: &[CellIndex],
) -> Vec<Move> {
    let mut seen = [false; CELL_COUNT];
    seen[usize::from(origin)] = true;
    for &v in visited {
        seen[usize::from(v)] = true;
    }

    let can_hop_over = |over: CellIndex| {
        // the moving piece has left its origin
        over != origin
            && match board.at(over) {
                CellContent::Piece(_) => true,
                CellContent::Wall => rules.jump_over_walls,
                CellContent::Empty => false,
            }
    };
    let hops = |from: CellIndex| {
        Direction::ALL.into_iter().filter_map(move |dir| {
            let over = neighbor_index(from, dir)?;
            let landing = neighbor_index(over, dir)?;
            (can_hop_over(over) && board.is_empty_at(landing)).then_some(landing)
        })
    };

    let mut arena: Vec<HopNode> = vec![];
    let mut stack: Vec<HopNode> = hops(origin)
        .map(|cell| HopNode { cell, parent: None })
        .collect();
    stack.reverse();
    while let Some(node) = stack.pop() {
        if seen[usize::from(node.cell)] {
            continue;
        }
        seen[usize::from(node.cell)] = true;
        let id = arena.len();
        arena.push(node);
        let children: Vec<_> = hops(node.cell)
            .filter(|c| !seen[usize::from(*c)])
            .map(|cell| HopNode {
                cell,
                parent: Some(id),
            })
            .collect();
        stack.extend(children.into_iter().rev());
    }

    let from = cell_coord(origin);
    (0..arena.len())
        .map(|id| Move::jump(from, landing_path(&arena, id)))
        .collect()
}

fn landing_path(arena: &[HopNode], mut id: usize) -> Vec<CubeCoord> {
    let mut path = vec![];
    loop {
        let node = arena[id];
        path.push(cell_coord(node.cell));
        match node.parent {
            Some(parent) => id = parent,
            None => break,
        }
    }
    path.reverse();
    path
}
