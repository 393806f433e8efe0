//! Evolutionary training of evaluation genomes.
//!
//! A population of [`Genome`](sternhalma_evaluator::genome::Genome)s plays a
//! round-robin tournament of headless two-player games. The results decide
//! the fitness of each individual, and the fittest are bred into the next
//! generation.
//!
//! # Architecture
//!
//! ```text
//! TrainingScheduler::invoke (load, one batch, save)
//!     ↓ runs
//! scheduler::step (games of the current generation, in parallel)
//!     ↓ plays
//! match_play (sternhalma-evaluator)
//!     ↓ at generation end
//! PopulationEvolver (elitism, tournament, BLX-α, Gaussian mutation)
//! ```
//!
//! - [`genome_ops`] - random genomes, crossover and mutation
//! - [`genetic`] - individuals, population and evolution
//! - [`schedule`] - round-robin matchups and seat order
//! - [`state`] - the persisted training record and its config
//! - [`scheduler`] - batch execution and invocation
//! - [`store`] - persistence interface and an in-memory store
//!
//! Training runs indefinitely: after `generations` generations a new cycle
//! begins with the evolved population, never from scratch.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use sternhalma_training::{
//!     scheduler::TrainingScheduler,
//!     state::TrainingConfig,
//!     store::{MemoryStore, TrainingStore},
//! };
//!
//! let config = TrainingConfig {
//!     population_size: 3,
//!     max_turns: 10,
//!     batch_budget: 2,
//!     ..TrainingConfig::default()
//! };
//! let scheduler = TrainingScheduler::new(config);
//! let mut store = MemoryStore::new();
//! let telemetry = scheduler.invoke(&mut store, Utc::now()).unwrap();
//! assert_eq!(telemetry.games_played, 2);
//! assert!(store.load_state().unwrap().is_some());
//! ```

pub mod genetic;
pub mod genome_ops;
pub mod schedule;
pub mod scheduler;
pub mod state;
pub mod store;
