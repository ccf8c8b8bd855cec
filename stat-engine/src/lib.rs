//! # Stat Engine
//!
//! Numerically stable online statistical estimators with O(1) update
//! complexity, designed for tick-rate streams:
//!
//! - **Primitives**: `RunningStats` (Welford), `EmaStats`, `WindowedStats`
//! - **Comoments**: `Covariance`, `EmaCovariance`
//!
//! All estimators expose `add`, `reset`, and plain numeric accessors, stay
//! finite over tens of millions of bounded observations, and never compute
//! the catastrophically cancelling `sum(x^2) - sum(x)^2 / n` form on
//! unbounded counts. Ratios over a non-positive variance are defined to
//! return 0 instead of propagating infinities.
//!
//! ## Example
//!
//! ```rust
//! use stat_engine::RunningStats;
//!
//! let mut stats = RunningStats::new();
//! for price in [101.0, 99.5, 100.2, 100.8] {
//!     stats.add(price);
//! }
//! let z = stats.z_score(104.0);
//! assert!(z > 0.0);
//! ```

pub mod comoment;
pub mod primitives;

// Re-exports
pub use comoment::{Covariance, EmaCovariance};
pub use primitives::{EmaStats, RunningStats, WindowedStats};
