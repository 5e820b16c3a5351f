//! Benchmarks for objective evaluation and a full calibration run.

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use sc_calibration::{calibrate, normalize, CalibrationSettings, ObjectiveEvaluator};
use sc_core::{NoopDiagnostics, Real, Result};
use sc_models::{
    CalibrationTarget, SettlementRule, SimulationControls, SpotFactorBounds, SpotFactorParams,
    StorageValuation, StorageValuer, ValuationRequest,
};

struct Slope(Real);

struct LinearValuer;

impl StorageValuer<Slope> for LinearValuer {
    fn value(&self, req: &ValuationRequest<'_, Slope>) -> Result<StorageValuation> {
        let spot = req.model.spot_factor();
        Ok(StorageValuation::new(
            100.0 + req.storage.0 * spot.vol - 2.0 * spot.mean_reversion,
        ))
    }
}

fn targets(n: usize) -> Vec<CalibrationTarget<Slope>> {
    let d = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
    (0..n)
        .map(|i| {
            let slope = 5.0 + i as Real;
            CalibrationTarget::new(
                Slope(slope),
                100.0 + slope * 0.35 - 2.0 * 0.8,
                1.0 + i as Real,
                d,
                0.0,
                [(d, 30.0)].into_iter().collect(),
                [(d, 0.02)].into_iter().collect(),
                0.1,
                0.2,
            )
        })
        .collect()
}

fn benchmark_objective(c: &mut Criterion) {
    let targets = targets(50);
    let weights = normalize(None, targets.len(), &NoopDiagnostics).unwrap();
    let rule = SettlementRule::same_day();
    let controls = SimulationControls::new(1000, "1 + x_st + x_lt + x_sw");
    let ev = ObjectiveEvaluator::new(
        &targets,
        &weights,
        &LinearValuer,
        &rule,
        &controls,
        &NoopDiagnostics,
    )
    .unwrap();

    c.bench_function("objective_50_targets", |b| {
        b.iter(|| ev.evaluate(black_box(SpotFactorParams::new(0.4, 1.1))))
    });
}

fn benchmark_calibration(c: &mut Criterion) {
    let targets = targets(10);
    let rule = SettlementRule::same_day();
    let settings = CalibrationSettings::new(
        SpotFactorBounds::new((0.0, 1.0), (0.0, 2.0)).unwrap(),
        SimulationControls::new(1000, "1 + s"),
    )
    .with_tolerance(1e-10);

    c.bench_function("calibrate_10_targets_bfgs", |b| {
        b.iter(|| calibrate(black_box(&targets), &rule, &LinearValuer, &settings, &NoopDiagnostics))
    });
}

criterion_group!(benches, benchmark_objective, benchmark_calibration);
criterion_main!(benches);
