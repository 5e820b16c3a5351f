//! Weighted least-squares objective over storage valuations.
//!
//! For a trial `(vol, mean_reversion)` each target is valued once, in input
//! order, and contributes
//!
//! ```text
//! weight_i * ((storage_pv_i - target_pv_i) / notional_volume_i)^2
//! ```
//!
//! to the penalty.  A valuation error aborts the evaluation and is returned
//! as-is.

use crate::weights::WeightVector;
use sc_core::{ensure_config, errors::Result, Diagnostics, Price, Real};
use sc_math::{Array, CostFunction};
use sc_models::{
    CalibrationTarget, SettlementRule, SimulationControls, SpotFactorParams, StorageValuer,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// How one target fitted at a given trial point.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TargetFit {
    /// Position of the target in the input list.
    pub index: usize,
    /// Model value returned by the valuer.
    pub storage_pv: Price,
    /// `storage_pv - target_pv`.
    pub pv_diff: Price,
    /// `pv_diff / notional_volume`.
    pub normalized_diff: Real,
    /// Normalised weight of the target.
    pub weight: Real,
    /// `normalized_diff^2 * weight`.
    pub contribution: Real,
}

/// The calibration objective.
///
/// Borrows everything it needs for the duration of one calibration run; all
/// of it is read-only, so evaluations share no mutable state.
pub struct ObjectiveEvaluator<'a, S, V: ?Sized> {
    targets: &'a [CalibrationTarget<S>],
    weights: &'a WeightVector,
    valuer: &'a V,
    settlement_rule: &'a SettlementRule,
    controls: &'a SimulationControls,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a, S, V> ObjectiveEvaluator<'a, S, V>
where
    V: StorageValuer<S> + ?Sized,
{
    /// Create an evaluator. `weights` must have one entry per target.
    pub fn new(
        targets: &'a [CalibrationTarget<S>],
        weights: &'a WeightVector,
        valuer: &'a V,
        settlement_rule: &'a SettlementRule,
        controls: &'a SimulationControls,
        diagnostics: &'a dyn Diagnostics,
    ) -> Result<Self> {
        ensure_config!(
            weights.len() == targets.len(),
            "{} weights supplied for {} targets",
            weights.len(),
            targets.len()
        );
        Ok(Self {
            targets,
            weights,
            valuer,
            settlement_rule,
            controls,
            diagnostics,
        })
    }

    /// Weighted sum of squared normalised PV errors at `params`.
    pub fn evaluate(&self, params: SpotFactorParams) -> Result<Real> {
        self.log_trial(params);
        let mut penalty = 0.0;
        for i in 0..self.targets.len() {
            let fit = self.fit_target(i, params)?;
            penalty += fit.contribution;
            self.log_fit(&fit, penalty);
        }
        self.log_penalty(params, penalty);
        Ok(penalty)
    }

    /// Per-target fits at `params`, in input order.
    pub fn breakdown(&self, params: SpotFactorParams) -> Result<Vec<TargetFit>> {
        (0..self.targets.len())
            .map(|i| self.fit_target(i, params))
            .collect()
    }

    fn fit_target(&self, i: usize, params: SpotFactorParams) -> Result<TargetFit> {
        let target = &self.targets[i];
        let request = target.request(params, self.settlement_rule, self.controls)?;
        let storage_pv = self.valuer.value(&request)?.npv;
        let pv_diff = storage_pv - target.target_pv;
        let normalized_diff = pv_diff / target.notional_volume;
        let weight = self.weights[i];
        Ok(TargetFit {
            index: i,
            storage_pv,
            pv_diff,
            normalized_diff,
            weight,
            contribution: normalized_diff * normalized_diff * weight,
        })
    }

    fn log_trial(&self, params: SpotFactorParams) {
        if self.diagnostics.debug_enabled() {
            self.diagnostics
                .debug(&format!("Evaluating storage valuations for {params}"));
        }
    }

    fn log_fit(&self, fit: &TargetFit, running_penalty: Real) {
        if self.diagnostics.debug_enabled() {
            self.diagnostics.debug(&format!(
                "Target {}: storage_pv={}, pv_diff={}, normalized_diff={}, \
                 penalty_contribution={}, running_penalty={}",
                fit.index,
                fit.storage_pv,
                fit.pv_diff,
                fit.normalized_diff,
                fit.contribution,
                running_penalty
            ));
        }
    }

    fn log_penalty(&self, params: SpotFactorParams, penalty: Real) {
        if self.diagnostics.debug_enabled() {
            self.diagnostics
                .debug(&format!("Penalty {penalty} for {params}"));
        }
    }
}

#[cfg(feature = "parallel")]
impl<'a, S, V> ObjectiveEvaluator<'a, S, V>
where
    S: Sync,
    V: StorageValuer<S> + Sync + ?Sized,
{
    /// [`evaluate`](Self::evaluate) with the targets valued concurrently.
    ///
    /// Fits are collected in input order and summed sequentially, so the
    /// penalty is bit-identical to the sequential one.  If several valuations
    /// fail, which of their errors is returned is unspecified.
    pub fn evaluate_parallel(&self, params: SpotFactorParams) -> Result<Real> {
        use rayon::prelude::*;

        self.log_trial(params);
        let fits: Vec<TargetFit> = (0..self.targets.len())
            .into_par_iter()
            .map(|i| self.fit_target(i, params))
            .collect::<Result<_>>()?;
        let mut penalty = 0.0;
        for fit in &fits {
            penalty += fit.contribution;
            self.log_fit(fit, penalty);
        }
        self.log_penalty(params, penalty);
        Ok(penalty)
    }
}

impl<S, V> CostFunction for ObjectiveEvaluator<'_, S, V>
where
    V: StorageValuer<S> + ?Sized,
{
    fn value(&self, x: &Array) -> Result<Real> {
        self.evaluate(SpotFactorParams::from_array(x)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::weights::normalize;
    use chrono::NaiveDate;
    use sc_core::{DiagnosticLevel, Error, NoopDiagnostics, RecordingDiagnostics};
    use sc_models::{StorageValuation, ValuationRequest};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Storage identified by the PV the stub should return at zero vol.
    struct Stub {
        base_pv: Real,
    }

    /// `base_pv + slope * vol`.
    struct LinearValuer {
        slope: Real,
        calls: AtomicUsize,
    }

    impl LinearValuer {
        fn new(slope: Real) -> Self {
            Self {
                slope,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl StorageValuer<Stub> for LinearValuer {
        fn value(&self, req: &ValuationRequest<'_, Stub>) -> Result<StorageValuation> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StorageValuation::new(
                req.storage.base_pv + self.slope * req.model.spot_vol(),
            ))
        }
    }

    fn target(base_pv: Real, target_pv: Real, notional: Real) -> CalibrationTarget<Stub> {
        let d = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        CalibrationTarget::new(
            Stub { base_pv },
            target_pv,
            notional,
            d,
            0.0,
            [(d, 1.0)].into_iter().collect(),
            [(d, 0.0)].into_iter().collect(),
            0.1,
            0.2,
        )
    }

    #[test]
    fn single_target_squared_error() {
        let targets = vec![target(100.0, 100.0, 1.0)];
        let weights = normalize(None, 1, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(10.0);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let ev = ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &NoopDiagnostics)
            .unwrap();
        for vol in [0.0, 0.25, 0.5, 1.0] {
            let p = ev.evaluate(SpotFactorParams::new(vol, 3.0)).unwrap();
            assert!((p - (vol * 10.0).powi(2)).abs() < 1e-10, "vol={vol} p={p}");
        }
        assert_eq!(valuer.calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn notional_and_weights_scale_errors() {
        let targets = vec![target(110.0, 100.0, 5.0), target(50.0, 40.0, 2.0)];
        let weights = normalize(Some(&[1.0, 3.0]), 2, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(0.0);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let ev = ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &NoopDiagnostics)
            .unwrap();
        let params = SpotFactorParams::new(0.3, 1.0);
        // (10/5)^2 * 0.25 + (10/2)^2 * 0.75
        let expected = 4.0 * 0.25 + 25.0 * 0.75;
        assert!((ev.evaluate(params).unwrap() - expected).abs() < 1e-12);

        let fits = ev.breakdown(params).unwrap();
        assert_eq!(fits.len(), 2);
        assert_eq!(fits[1].index, 1);
        assert_eq!(fits[1].storage_pv, 50.0);
        assert_eq!(fits[1].pv_diff, 10.0);
        assert_eq!(fits[1].normalized_diff, 5.0);
        assert_eq!(fits[1].contribution, 25.0 * 0.75);
    }

    #[test]
    fn debug_trace_per_target() {
        let targets = vec![target(101.0, 100.0, 1.0), target(99.0, 100.0, 1.0)];
        let weights = normalize(None, 2, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(0.0);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let rec = RecordingDiagnostics::new();
        let ev = ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &rec).unwrap();
        ev.evaluate(SpotFactorParams::new(0.5, 2.0)).unwrap();

        let debug = rec.messages(DiagnosticLevel::Debug);
        assert_eq!(debug.len(), 4);
        assert!(debug[0].contains("spot_factor_vol=0.5"));
        assert!(debug[1].starts_with("Target 0: storage_pv=101"));
        assert!(debug[1].contains("running_penalty=0.5"));
        assert!(debug[2].starts_with("Target 1: storage_pv=99"));
        assert!(debug[2].contains("running_penalty=1"));
        assert!(debug[3].starts_with("Penalty 1 for"));
    }

    #[test]
    fn valuer_error_passes_through() {
        struct Failing;
        impl StorageValuer<Stub> for Failing {
            fn value(&self, _: &ValuationRequest<'_, Stub>) -> Result<StorageValuation> {
                Err(Error::Valuation("regression matrix is singular".into()))
            }
        }
        let targets = vec![target(1.0, 1.0, 1.0)];
        let weights = normalize(None, 1, &NoopDiagnostics).unwrap();
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let ev = ObjectiveEvaluator::new(&targets, &weights, &Failing, &rule, &controls, &NoopDiagnostics)
            .unwrap();
        assert_eq!(
            ev.evaluate(SpotFactorParams::new(0.1, 0.1)).unwrap_err(),
            Error::Valuation("regression matrix is singular".into())
        );
    }

    #[test]
    fn weight_count_must_match() {
        let targets = vec![target(1.0, 1.0, 1.0), target(1.0, 1.0, 1.0)];
        let weights = normalize(None, 1, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(0.0);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        assert!(matches!(
            ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &NoopDiagnostics),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn cost_function_unpacks_vector() {
        let targets = vec![target(100.0, 100.0, 1.0)];
        let weights = normalize(None, 1, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(10.0);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let ev = ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &NoopDiagnostics)
            .unwrap();
        let v = CostFunction::value(&ev, &Array::from_slice(&[0.2, 5.0])).unwrap();
        assert!((v - 4.0).abs() < 1e-12);
        assert!(CostFunction::value(&ev, &Array::from_slice(&[0.2])).is_err());
    }

    #[cfg(feature = "parallel")]
    #[test]
    fn parallel_matches_sequential_bitwise() {
        let targets: Vec<_> = (0..16)
            .map(|i| target(100.0 + i as Real * 0.37, 100.0, 1.0 + i as Real))
            .collect();
        let raw: Vec<Real> = (0..16).map(|i| 1.0 + (i % 3) as Real).collect();
        let weights = normalize(Some(&raw), 16, &NoopDiagnostics).unwrap();
        let valuer = LinearValuer::new(3.3);
        let rule = SettlementRule::same_day();
        let controls = SimulationControls::new(1, "1");
        let ev = ObjectiveEvaluator::new(&targets, &weights, &valuer, &rule, &controls, &NoopDiagnostics)
            .unwrap();
        let p = SpotFactorParams::new(0.7, 4.0);
        assert_eq!(
            ev.evaluate(p).unwrap().to_bits(),
            ev.evaluate_parallel(p).unwrap().to_bits()
        );
    }
}
