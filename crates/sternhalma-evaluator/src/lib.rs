//! Position evaluation and AI move search for Sternhalma.
//!
//! # Architecture
//!
//! ```text
//! Difficulty / GenomeSource (which genome, how deep)
//!     ↓ configures
//! SearchEngine (paranoid alpha-beta over GameState::play_turn / revert_turn)
//!     ↓ scores leaves with
//! position_evaluator (genome-weighted terms plus history penalties)
//! ```
//!
//! - [`genome`] - the tunable weights and constants, with per-field bounds
//! - [`position_evaluator`] - score terms, move penalties, relative score and
//!   the evaluation cache
//! - [`search`] - the search engine and move ordering
//! - [`difficulty`] - strength presets
//! - [`cache`] - time-limited holder of the latest evolved genome
//! - [`insights`] - running averages collected from finished games
//! - [`dispatch`] - searching on a background thread with staleness checks
//! - [`match_play`] - headless engine-vs-engine games, used by training
//!
//! # Example: Playing a Headless Game
//!
//! ```
//! use sternhalma_evaluator::{
//!     difficulty::Difficulty, genome::Genome, match_play, search::SearchEngine,
//! };
//!
//! let mut engines: Vec<_> = (0..2)
//!     .map(|seed| SearchEngine::new(Difficulty::Easy.params(), Genome::default(), seed))
//!     .collect();
//! let outcome = match_play::play_standard(&mut engines, 4).unwrap();
//! assert_eq!(outcome.turns, 4);
//! ```

pub mod cache;
pub mod difficulty;
pub mod dispatch;
pub mod genome;
pub mod insights;
pub mod match_play;
pub mod position_evaluator;
pub mod search;
