//! # sc-calibration
//!
//! Fits the short-term factor `(vol, mean_reversion)` of the seasonal
//! three-factor spot model so that storage valuations match target present
//! values in a weighted least-squares sense.
//!
//! ```text
//! validate_targets ─▶ normalize weights ─▶ minimizer ⇄ ObjectiveEvaluator ─▶ StorageValuer
//!                                              │
//!                                              ▼
//!                                       CalibrationResult
//! ```
//!
//! Enable the `parallel` feature to value the targets of each trial point on
//! the rayon thread pool.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod calibrate;
pub mod objective;
pub mod targets;
pub mod weights;

pub use calibrate::{calibrate, calibrate_with_tracing, CalibrationResult, CalibrationSettings};
#[cfg(feature = "parallel")]
pub use calibrate::calibrate_parallel;
pub use objective::{ObjectiveEvaluator, TargetFit};
pub use targets::{validate_curve_coverage, validate_targets};
pub use weights::{normalize, WeightVector};
