//! Game flow on top of the board model.
//!
//! - [`GameState`] - Board, players, history and finish records of one game
//! - [`move_gen`] - Legal step, jump and swap moves of a piece
//! - [`GameSession`] - Interactive turn state machine (select, move, confirm, undo)
//! - [`wire`] - Serialized turns and reconciliation with a server
//!
//! # Game Flow
//!
//! 1. Build a [`GameState`] from a [`Layout`](crate::Layout)
//! 2. The current player selects a piece and moves it, possibly chaining jumps
//! 3. The turn is confirmed (or undone) and the next unfinished player is up
//! 4. Players whose pieces all sit in their goal region are recorded as finished
//! 5. The game is over once every active player has finished
//!
//! Headless code (the AI search) skips the session and plays whole moves
//! directly with [`GameState::play_turn`] and [`GameState::revert_turn`].

pub use self::{session::*, state::*, wire::*};

pub mod move_gen;
mod session;
mod state;
pub mod wire;
