//! Error types for storecal.
//!
//! Every crate in the workspace reports failures through the single
//! `thiserror`-derived [`Error`] enum below.  The `ensure!`, `ensure_config!`
//! and `fail!` macros are the early-return helpers used by validation code.

use thiserror::Error;

/// The top-level error type used throughout storecal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// General runtime error.
    #[error("{0}")]
    Runtime(String),

    /// Precondition violated.
    #[error("precondition not satisfied: {0}")]
    Precondition(String),

    /// Malformed calibration request (weights, bounds, targets, controls).
    ///
    /// Always raised before any valuation work is started.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Failure reported by a storage valuation engine.
    ///
    /// The calibration core never constructs this variant itself; it is
    /// available to valuer implementations and is propagated unchanged.
    #[error("valuation failed: {0}")]
    Valuation(String),

    /// A curve has no value for a requested date.
    #[error("no {curve} value provided for {date}")]
    MissingCurveValue {
        /// Name of the curve that was queried.
        curve: String,
        /// The date that was looked up, formatted.
        date: String,
    },
}

/// Shorthand `Result` type used throughout storecal.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Returns `Err(Error::Precondition(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use sc_core::{ensure, errors::Error};
/// fn positive(x: f64) -> sc_core::errors::Result<f64> {
///     ensure!(x > 0.0, "x must be positive, got {x}");
///     Ok(x)
/// }
/// assert!(positive(1.0).is_ok());
/// assert!(matches!(positive(-1.0), Err(Error::Precondition(_))));
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Precondition(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Configuration(...))` if `$cond` is false.
///
/// # Example
/// ```
/// use sc_core::{ensure_config, errors::Error};
/// fn same_len(a: &[f64], b: &[f64]) -> sc_core::errors::Result<()> {
///     ensure_config!(a.len() == b.len(), "lengths differ: {} vs {}", a.len(), b.len());
///     Ok(())
/// }
/// assert!(same_len(&[1.0], &[2.0]).is_ok());
/// assert!(matches!(same_len(&[1.0], &[]), Err(Error::Configuration(_))));
/// ```
#[macro_export]
macro_rules! ensure_config {
    ($cond:expr, $($msg:tt)*) => {
        if !$cond {
            return Err($crate::errors::Error::Configuration(
                format!($($msg)*)
            ));
        }
    };
}

/// Returns `Err(Error::Runtime(...))` immediately.
///
/// # Example
/// ```
/// use sc_core::{fail, errors::Error};
/// fn always_err() -> sc_core::errors::Result<()> {
///     fail!("something went wrong");
/// }
/// assert!(always_err().is_err());
/// ```
#[macro_export]
macro_rules! fail {
    ($($msg:tt)*) => {
        return Err($crate::errors::Error::Runtime(format!($($msg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checked_ratio(num: f64, den: f64) -> Result<f64> {
        ensure_config!(den != 0.0, "denominator must be non-zero");
        Ok(num / den)
    }

    #[test]
    fn configuration_message_is_prefixed() {
        let err = checked_ratio(1.0, 0.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: denominator must be non-zero"
        );
    }

    #[test]
    fn missing_curve_value_display() {
        let err = Error::MissingCurveValue {
            curve: "interest rate".into(),
            date: "2024-01-31".into(),
        };
        assert_eq!(
            err.to_string(),
            "no interest rate value provided for 2024-01-31"
        );
    }
}
