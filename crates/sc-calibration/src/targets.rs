//! Pre-flight checks on the target list.

use sc_core::{ensure_config, errors::Error, errors::Result, Real};
use sc_models::{CalibrationTarget, StorageTerm};

/// Check a calibration request before any valuation work.
///
/// Fails with [`Error::Configuration`] when the list is empty, when explicit
/// `penalty_weights` do not have one entry per target, or when any target
/// fails [`CalibrationTarget::validate`].  Targets are not modified.
pub fn validate_targets<S>(
    targets: &[CalibrationTarget<S>],
    penalty_weights: Option<&[Real]>,
) -> Result<()> {
    ensure_config!(!targets.is_empty(), "at least one calibration target is required");
    if let Some(w) = penalty_weights {
        ensure_config!(
            w.len() == targets.len(),
            "penalty_weights has {} entries but there are {} targets",
            w.len(),
            targets.len()
        );
    }
    for (i, target) in targets.iter().enumerate() {
        target.validate().map_err(|e| at_target(i, e))?;
    }
    Ok(())
}

/// Check every target's curves span its storage term.
pub fn validate_curve_coverage<S: StorageTerm>(targets: &[CalibrationTarget<S>]) -> Result<()> {
    for (i, target) in targets.iter().enumerate() {
        target.validate_curve_coverage().map_err(|e| at_target(i, e))?;
    }
    Ok(())
}

fn at_target(i: usize, e: Error) -> Error {
    match e {
        Error::Configuration(msg) => Error::Configuration(format!("target {i}: {msg}")),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Tank;

    impl StorageTerm for Tank {
        fn end_date(&self) -> NaiveDate {
            NaiveDate::from_ymd_opt(2025, 3, 31).unwrap()
        }
    }

    fn target(notional: Real) -> CalibrationTarget<Tank> {
        let start = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        CalibrationTarget::new(
            Tank,
            10.0,
            notional,
            start,
            0.0,
            [(start, 50.0)].into_iter().collect(),
            [(start, 0.02)].into_iter().collect(),
            0.1,
            0.1,
        )
    }

    #[test]
    fn empty_list_rejected() {
        let targets: Vec<CalibrationTarget<Tank>> = Vec::new();
        assert!(matches!(
            validate_targets(&targets, None),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn weight_length_mismatch() {
        let targets = vec![target(1.0), target(2.0)];
        assert!(validate_targets(&targets, Some(&[1.0, 1.0])).is_ok());
        let err = validate_targets(&targets, Some(&[1.0])).unwrap_err();
        assert_eq!(
            err,
            Error::Configuration("penalty_weights has 1 entries but there are 2 targets".into())
        );
    }

    #[test]
    fn bad_target_is_named() {
        let targets = vec![target(1.0), target(0.0)];
        match validate_targets(&targets, None) {
            Err(Error::Configuration(msg)) => assert!(msg.starts_with("target 1:"), "{msg}"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn single_point_curves_do_not_cover_term() {
        let targets = vec![target(1.0)];
        assert!(validate_curve_coverage(&targets).is_err());
    }
}
