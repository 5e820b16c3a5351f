//! # sc-models
//!
//! The seasonal three-factor spot model as seen by the calibration: its
//! parameters, the storage targets it is fitted to, and the valuation
//! interface used to price them.
//!
//! ```text
//! CalibrationTarget<S> ──request()──▶ ValuationRequest<S> ──▶ StorageValuer<S>
//!        │                                   ▲
//!        └── SpotFactorParams + fixed vols ──┘ ThreeFactorSeasonalParams
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Market data ──────────────────────────────────────────────────────────
pub mod curves;
pub mod settlement;

// ── Model ────────────────────────────────────────────────────────────────
pub mod parameters;

// ── Valuation boundary ───────────────────────────────────────────────────
pub mod target;
pub mod valuation;

// ── Re-exports ───────────────────────────────────────────────────────────
pub use curves::{act365_discount_factor, ForwardCurve, InterestRateCurve};
pub use parameters::{SpotFactorBounds, SpotFactorParams, ThreeFactorSeasonalParams};
pub use settlement::SettlementRule;
pub use target::CalibrationTarget;
pub use valuation::{
    valuer_fn, BasisFunctions, FnValuer, SimulationControls, SimulationDataReturned,
    StorageTerm, StorageValuation, StorageValuer, ValuationRequest,
};
