//! The calibration driver.
//!
//! Validates the request, normalises the weights, wraps the
//! [`ObjectiveEvaluator`] in a bounded minimizer and reports what the
//! minimizer found.  A run that stops without meeting its convergence test is
//! not an error: the result comes back with `success == false` and a warning
//! is emitted.

use crate::objective::ObjectiveEvaluator;
use crate::targets::validate_targets;
use crate::weights::normalize;
use sc_core::{
    ensure_config, errors::Result, Diagnostics, Real, TracingDiagnostics,
};
use sc_math::{Array, EndCriteria, EndCriteriaType, OptimizationMethod};
use sc_models::{
    CalibrationTarget, SettlementRule, SimulationControls, SpotFactorBounds, SpotFactorParams,
    StorageValuer,
};
use std::cell::RefCell;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Everything about a calibration run except the targets, the settlement
/// rule and the valuer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationSettings {
    /// Search box for `(vol, mean_reversion)`.
    pub bounds: SpotFactorBounds,
    /// Monte Carlo settings passed to every valuation.
    pub controls: SimulationControls,
    /// Optional per-target importance, normalised before use.
    pub penalty_weights: Option<Vec<Real>>,
    /// Minimizer and its options.
    pub method: OptimizationMethod,
    /// Single tolerance applied to the function, parameter and gradient tests.
    pub tolerance: Option<Real>,
    /// Iteration/evaluation caps and stopping tolerances.
    pub end_criteria: EndCriteria,
    /// Starting point; the centre of `bounds` when `None`.
    pub initial_guess: Option<SpotFactorParams>,
}

impl CalibrationSettings {
    /// Settings with default method, criteria and equal weights.
    pub fn new(bounds: SpotFactorBounds, controls: SimulationControls) -> Self {
        Self {
            bounds,
            controls,
            penalty_weights: None,
            method: OptimizationMethod::default(),
            tolerance: None,
            end_criteria: EndCriteria::default(),
            initial_guess: None,
        }
    }

    /// Weight the targets.
    pub fn with_penalty_weights(mut self, weights: Vec<Real>) -> Self {
        self.penalty_weights = Some(weights);
        self
    }

    /// Choose the minimizer.
    pub fn with_method(mut self, method: OptimizationMethod) -> Self {
        self.method = method;
        self
    }

    /// Set the convergence tolerance.
    pub fn with_tolerance(mut self, tolerance: Real) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    /// Replace the end criteria.
    pub fn with_end_criteria(mut self, end_criteria: EndCriteria) -> Self {
        self.end_criteria = end_criteria;
        self
    }

    /// Start the search at `guess`.
    pub fn with_initial_guess(mut self, guess: SpotFactorParams) -> Self {
        self.initial_guess = Some(guess);
        self
    }

    /// End criteria with `tolerance` applied.
    pub fn effective_end_criteria(&self) -> EndCriteria {
        match self.tolerance {
            Some(tol) => self.end_criteria.clone().with_tolerance(tol),
            None => self.end_criteria.clone(),
        }
    }

    fn start(&self) -> Result<SpotFactorParams> {
        match self.initial_guess {
            Some(guess) => {
                ensure_config!(
                    self.bounds.contains(&guess),
                    "initial guess ({guess}) lies outside the bounds"
                );
                Ok(guess)
            }
            None => Ok(self.bounds.center()),
        }
    }
}

/// Outcome of a calibration run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationResult {
    /// Fitted spot factor.
    pub params: SpotFactorParams,
    /// Objective value at `params`.
    pub penalty: Real,
    /// Whether the minimizer met its convergence test.
    pub success: bool,
    /// Minimizer iterations.
    pub iterations: usize,
    /// Objective evaluations (each one values every target once).
    pub evaluations: usize,
    /// Why the minimizer stopped.
    pub end_type: EndCriteriaType,
    /// Human-readable status.
    pub message: String,
    /// Name of the minimizer used.
    pub method: String,
    /// Penalty of every objective evaluation, in call order.
    pub penalty_trajectory: Vec<Real>,
}

/// Calibrate the spot factor so the valuer reproduces the targets' PVs.
///
/// Configuration problems are reported before the valuer is called.  Errors
/// from the valuer end the run and are returned unchanged.
pub fn calibrate<S, V>(
    targets: &[CalibrationTarget<S>],
    settlement_rule: &SettlementRule,
    valuer: &V,
    settings: &CalibrationSettings,
    diagnostics: &dyn Diagnostics,
) -> Result<CalibrationResult>
where
    V: StorageValuer<S> + ?Sized,
{
    drive(targets, settlement_rule, valuer, settings, diagnostics, |ev, p| {
        ev.evaluate(p)
    })
}

/// [`calibrate`] logging through `tracing` under the default logger name.
pub fn calibrate_with_tracing<S, V>(
    targets: &[CalibrationTarget<S>],
    settlement_rule: &SettlementRule,
    valuer: &V,
    settings: &CalibrationSettings,
) -> Result<CalibrationResult>
where
    V: StorageValuer<S> + ?Sized,
{
    calibrate(
        targets,
        settlement_rule,
        valuer,
        settings,
        &TracingDiagnostics::default(),
    )
}

/// [`calibrate`] with the targets of each trial valued concurrently.
///
/// Penalties, and so the whole run, are identical to the sequential version.
#[cfg(feature = "parallel")]
pub fn calibrate_parallel<S, V>(
    targets: &[CalibrationTarget<S>],
    settlement_rule: &SettlementRule,
    valuer: &V,
    settings: &CalibrationSettings,
    diagnostics: &dyn Diagnostics,
) -> Result<CalibrationResult>
where
    S: Sync,
    V: StorageValuer<S> + Sync + ?Sized,
{
    drive(targets, settlement_rule, valuer, settings, diagnostics, |ev, p| {
        ev.evaluate_parallel(p)
    })
}

fn drive<S, V, F>(
    targets: &[CalibrationTarget<S>],
    settlement_rule: &SettlementRule,
    valuer: &V,
    settings: &CalibrationSettings,
    diagnostics: &dyn Diagnostics,
    objective: F,
) -> Result<CalibrationResult>
where
    V: StorageValuer<S> + ?Sized,
    F: Fn(&ObjectiveEvaluator<'_, S, V>, SpotFactorParams) -> Result<Real>,
{
    validate_targets(targets, settings.penalty_weights.as_deref())?;
    settings.controls.validate()?;
    let bounds = settings.bounds.to_bounds()?;
    let start = settings.start()?;
    let end_criteria = settings.effective_end_criteria();
    end_criteria.validate()?;

    let weights = normalize(settings.penalty_weights.as_deref(), targets.len(), diagnostics)?;
    let evaluator = ObjectiveEvaluator::new(
        targets,
        &weights,
        valuer,
        settlement_rule,
        &settings.controls,
        diagnostics,
    )?;

    diagnostics.info(&format!(
        "Calibrating spot factor to {} storage targets with {} starting from {start}",
        targets.len(),
        settings.method
    ));

    let trajectory = RefCell::new(Vec::new());
    let cost = |x: &Array| -> Result<Real> {
        let penalty = objective(&evaluator, SpotFactorParams::from_array(x)?)?;
        trajectory.borrow_mut().push(penalty);
        Ok(penalty)
    };
    let outcome = settings
        .method
        .minimize(&cost, &bounds, &start.to_array(), &end_criteria)?;

    let params = SpotFactorParams::from_array(&outcome.x)?;
    let result = CalibrationResult {
        params,
        penalty: outcome.value,
        success: outcome.success(),
        iterations: outcome.iterations,
        evaluations: outcome.evaluations,
        end_type: outcome.end_type,
        message: outcome.end_type.message().to_owned(),
        method: settings.method.name().to_owned(),
        penalty_trajectory: trajectory.into_inner(),
    };

    if result.success {
        diagnostics.info(&format!(
            "Calibration finished: {params}, penalty={} after {} iterations ({} evaluations): {}",
            result.penalty, result.iterations, result.evaluations, result.message
        ));
    } else {
        diagnostics.warn(&format!(
            "Calibration did not converge: {}. Best point {params}, penalty={} after {} \
             iterations ({} evaluations)",
            result.message, result.penalty, result.iterations, result.evaluations
        ));
    }
    Ok(result)
}
