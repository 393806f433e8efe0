//! Small statistics helpers shared by the evaluator and the trainer.
//!
//! - [`summary`]: min/max/mean/median/standard deviation of a dataset
//! - [`running`]: incrementally updated averages that survive serialization
//!
//! # Examples
//!
//! ```
//! use sternhalma_stats::{running::RunningAverage, summary::Summary};
//!
//! let stats = Summary::new([3.0, 1.0, 2.0]).unwrap();
//! assert_eq!(stats.mean, 2.0);
//!
//! let mut avg = RunningAverage::default();
//! avg.push(4.0);
//! avg.push(2.0);
//! assert_eq!(avg.mean(), 3.0);
//! ```

pub mod running;
pub mod summary;
