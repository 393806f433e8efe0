//! Sternhalma rules engine.
//!
//! Hex-grid geometry in cube coordinates, the 121-cell star board, legal move
//! generation (steps, chain jumps, goal swaps) and the turn state machine for
//! two to six players.
//!
//! # Example
//!
//! ```
//! use sternhalma_engine::{GameState, move_gen};
//!
//! let state = GameState::standard(2).unwrap();
//! let moves = move_gen::all_moves(&state, state.current_player());
//! assert!(!moves.is_empty());
//! ```

pub use self::{core::*, engine::*};

pub mod core;
pub mod engine;
