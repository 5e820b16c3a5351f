//! # sc-core
//!
//! Core types, error definitions, curves and diagnostics sinks for storecal.
//!
//! This crate provides the foundational building blocks shared across all
//! other crates in the workspace – type aliases, the error enum, the ordered
//! `TimeSeries` used for forward and interest-rate curves, and the injectable
//! `Diagnostics` capability.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Injectable diagnostics sinks (tracing, no-op, in-memory recorder).
pub mod diagnostics;

/// Error types and the `ensure!` / `ensure_config!` / `fail!` macros.
pub mod errors;

/// Ordered time-indexed series.
pub mod time_series;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A discount factor in [0, 1].
pub type DiscountFactor = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A quantity of commodity.
pub type Volume = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use diagnostics::{
    DiagnosticLevel, DiagnosticRecord, Diagnostics, NoopDiagnostics, RecordingDiagnostics,
    TracingDiagnostics, DEFAULT_LOGGER_NAME,
};
pub use errors::{Error, Result};
pub use time_series::TimeSeries;
