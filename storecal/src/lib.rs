//! # storecal
//!
//! Calibrates the short-term factor of a seasonal three-factor commodity
//! spot model so that storage valuations match target present values.
//!
//! This crate is a **façade** that re-exports the workspace crates.
//! Application code should depend on this crate rather than the individual
//! `sc-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use storecal::prelude::*;
//!
//! struct Tank;
//!
//! // Stand-in for a Monte Carlo storage valuer.
//! let valuer = valuer_fn(|req: &ValuationRequest<'_, Tank>| {
//!     Ok(StorageValuation::new(100.0 + 10.0 * req.model.spot_vol()))
//! });
//!
//! let d = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
//! let targets = vec![CalibrationTarget::new(
//!     Tank,
//!     100.0,
//!     1.0,
//!     d,
//!     0.0,
//!     [(d, 30.0)].into_iter().collect(),
//!     [(d, 0.03)].into_iter().collect(),
//!     0.14,
//!     0.28,
//! )];
//! let settings = CalibrationSettings::new(
//!     SpotFactorBounds::try_from(((0.0, 1.0), (0.0, 1.0)))?,
//!     SimulationControls::new(1000, "1 + x_st + x_lt + x_sw").with_seed(12),
//! );
//!
//! let result = calibrate(
//!     &targets,
//!     &SettlementRule::day_of_following_month(20)?,
//!     &valuer,
//!     &settings,
//!     &NoopDiagnostics,
//! )?;
//! assert!(result.params.vol < 1e-4);
//! # Ok::<(), storecal::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Core types, curves, diagnostics and error definitions.
pub use sc_core as core;

/// Arrays and bounded optimizers.
pub use sc_math as math;

/// Model parameters, targets and the valuation interface.
pub use sc_models as models;

/// Weighting, objective and calibration driver.
pub use sc_calibration as calibration;

/// The items needed for a typical calibration.
pub mod prelude {
    pub use sc_calibration::{
        calibrate, calibrate_with_tracing, normalize, CalibrationResult, CalibrationSettings,
        ObjectiveEvaluator, TargetFit, WeightVector,
    };
    #[cfg(feature = "parallel")]
    pub use sc_calibration::calibrate_parallel;
    pub use sc_core::{
        Diagnostics, Error, NoopDiagnostics, RecordingDiagnostics, Result, TimeSeries,
        TracingDiagnostics,
    };
    pub use sc_math::{EndCriteria, EndCriteriaType, OptimizationMethod};
    pub use sc_models::{
        valuer_fn, BasisFunctions, CalibrationTarget, ForwardCurve, InterestRateCurve,
        SettlementRule, SimulationControls, SpotFactorBounds, SpotFactorParams, StorageTerm,
        StorageValuation, StorageValuer, ValuationRequest,
    };
}
