use serde::{Deserialize, Serialize};

use super::coord::CubeCoord;

/// How a move reaches its destination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, derive_more::IsVariant)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    /// A single step onto an adjacent empty cell.
    Step,
    /// One or more hops. The path lists every landing cell in hop order and
    /// ends with the destination.
    Jump(Vec<CubeCoord>),
    /// A step into the mover's goal region that sends the occupying opponent
    /// piece back to the mover's origin.
    Swap,
}

/// A single piece movement.
///
/// Moves are immutable values; once appended to a game's history they are
/// never edited.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub from: CubeCoord,
    pub to: CubeCoord,
    pub kind: MoveKind,
}

impl Move {
    #[must_use]
    pub fn step(from: CubeCoord, to: CubeCoord) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Step,
        }
    }

    #[must_use]
    pub fn swap(from: CubeCoord, to: CubeCoord) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Swap,
        }
    }

    /// Builds a jump from its landing cells.
    ///
    /// # Panics
    ///
    /// Panics if `path` is empty.
    #[must_use]
    pub fn jump(from: CubeCoord, path: Vec<CubeCoord>) -> Self {
        let to = *path.last().expect("jump path has at least one landing");
        Self {
            from,
            to,
            kind: MoveKind::Jump(path),
        }
    }

    #[must_use]
    pub fn is_jump(&self) -> bool {
        self.kind.is_jump()
    }

    #[must_use]
    pub fn is_swap(&self) -> bool {
        self.kind.is_swap()
    }

    /// Landing cells of a jump, empty for steps and swaps.
    #[must_use]
    pub fn jump_path(&self) -> &[CubeCoord] {
        match &self.kind {
            MoveKind::Jump(path) => path,
            MoveKind::Step | MoveKind::Swap => &[],
        }
    }

    /// Returns `true` if `self` undoes `previous` (same piece, swapped ends).
    #[must_use]
    pub fn reverses(&self, previous: &Self) -> bool {
        self.from == previous.to && self.to == previous.from
    }
}
