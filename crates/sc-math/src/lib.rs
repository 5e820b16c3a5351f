//! # sc-math
//!
//! Numerical building blocks for the calibration: the `Array` newtype over
//! nalgebra and the bounded optimization framework (Nelder–Mead, projected
//! BFGS, differential evolution).

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// 1D real vector newtype.
pub mod array;

/// Box-constrained minimizers.
pub mod optimization;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use array::Array;
pub use optimization::{
    BfgsOptions, Bounds, CostFunction, DifferentialEvolution, DifferentialEvolutionOptions,
    EndCriteria, EndCriteriaType, NelderMead, NelderMeadOptions, OptimizationMethod,
    OptimizationResult, ProjectedBfgs,
};
