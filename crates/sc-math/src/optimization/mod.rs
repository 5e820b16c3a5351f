//! Bounded optimization framework.
//!
//! Provides the objective trait, box bounds, end criteria, and three
//! bounded minimizers selectable at runtime through [`OptimizationMethod`]:
//! Nelder–Mead simplex, projected BFGS and differential evolution.

/// Projected BFGS.
pub mod bfgs;
/// Seeded differential evolution.
pub mod differential_evolution;
/// Nelder–Mead simplex.
pub mod simplex;

pub use bfgs::{BfgsOptions, ProjectedBfgs};
pub use differential_evolution::{DifferentialEvolution, DifferentialEvolutionOptions};
pub use simplex::{NelderMead, NelderMeadOptions};

use crate::array::Array;
use sc_core::{ensure_config, errors::Error, errors::Result, fail, Real};
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ── Cost function trait ───────────────────────────────────────────────────────

/// A scalar objective to be minimized.
///
/// Evaluation is fallible: an error aborts the minimization and is returned
/// to the caller unchanged.
pub trait CostFunction {
    /// Evaluate the objective at `x`.
    fn value(&self, x: &Array) -> Result<Real>;
}

impl<F> CostFunction for F
where
    F: Fn(&Array) -> Result<Real>,
{
    fn value(&self, x: &Array) -> Result<Real> {
        self(x)
    }
}

// ── Bounds ────────────────────────────────────────────────────────────────────

/// Box constraints `lower[i] <= x[i] <= upper[i]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    lower: Vec<Real>,
    upper: Vec<Real>,
}

impl Bounds {
    /// Create bounds; each pair must be finite with `lower <= upper`.
    pub fn new(lower: Vec<Real>, upper: Vec<Real>) -> Result<Self> {
        ensure_config!(!lower.is_empty(), "bounds must have at least one dimension");
        ensure_config!(
            lower.len() == upper.len(),
            "lower bounds have {} entries but upper bounds have {}",
            lower.len(),
            upper.len()
        );
        for (i, (lo, hi)) in lower.iter().zip(upper.iter()).enumerate() {
            ensure_config!(
                lo.is_finite() && hi.is_finite() && lo <= hi,
                "invalid bound at index {i}: [{lo}, {hi}]"
            );
        }
        Ok(Self { lower, upper })
    }

    /// Number of dimensions.
    pub fn dimension(&self) -> usize {
        self.lower.len()
    }

    /// Lower bounds.
    pub fn lower(&self) -> &[Real] {
        &self.lower
    }

    /// Upper bounds.
    pub fn upper(&self) -> &[Real] {
        &self.upper
    }

    /// Width of dimension `i`.
    pub fn width(&self, i: usize) -> Real {
        self.upper[i] - self.lower[i]
    }

    /// Whether `x` lies inside the box (inclusive).
    pub fn contains(&self, x: &Array) -> bool {
        x.size() == self.dimension()
            && x
                .iter()
                .enumerate()
                .all(|(i, &v)| v >= self.lower[i] && v <= self.upper[i])
    }

    /// Clamp `x` onto the box.
    pub fn project(&self, x: &Array) -> Array {
        let clamped: Vec<Real> = x
            .iter()
            .enumerate()
            .map(|(i, &v)| v.clamp(self.lower[i], self.upper[i]))
            .collect();
        Array::from(clamped)
    }

    /// Centre of the box.
    pub fn center(&self) -> Array {
        let mid: Vec<Real> = self
            .lower
            .iter()
            .zip(self.upper.iter())
            .map(|(lo, hi)| 0.5 * (lo + hi))
            .collect();
        Array::from(mid)
    }
}

// ── End criteria ──────────────────────────────────────────────────────────────

/// Criteria to stop an optimization.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EndCriteria {
    /// Maximum number of iterations.
    pub max_iterations: usize,
    /// Maximum number of objective evaluations.
    pub max_evaluations: usize,
    /// Maximum number of iterations without improvement of the best value.
    pub max_stationary_state_iterations: usize,
    /// Stop as soon as the objective drops to or below this value.
    pub root_epsilon: Real,
    /// Objective change / spread considered negligible.
    pub function_epsilon: Real,
    /// Parameter change / spread considered negligible.
    pub x_epsilon: Real,
    /// Projected-gradient norm considered negligible.
    pub gradient_norm_epsilon: Real,
}

impl EndCriteria {
    /// Create new end criteria.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        max_iterations: usize,
        max_evaluations: usize,
        max_stationary_state_iterations: usize,
        root_epsilon: Real,
        function_epsilon: Real,
        x_epsilon: Real,
        gradient_norm_epsilon: Real,
    ) -> Self {
        Self {
            max_iterations,
            max_evaluations,
            max_stationary_state_iterations,
            root_epsilon,
            function_epsilon,
            x_epsilon,
            gradient_norm_epsilon,
        }
    }

    /// Use a single tolerance for the function, parameter and gradient tests.
    pub fn with_tolerance(mut self, tol: Real) -> Self {
        self.function_epsilon = tol;
        self.x_epsilon = tol;
        self.gradient_norm_epsilon = tol;
        self
    }

    /// Replace the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replace the evaluation cap.
    pub fn with_max_evaluations(mut self, max_evaluations: usize) -> Self {
        self.max_evaluations = max_evaluations;
        self
    }

    /// Check the criteria are usable.
    pub fn validate(&self) -> Result<()> {
        ensure_config!(self.max_iterations > 0, "max_iterations must be positive");
        ensure_config!(self.max_evaluations > 0, "max_evaluations must be positive");
        for (name, eps) in [
            ("function_epsilon", self.function_epsilon),
            ("x_epsilon", self.x_epsilon),
            ("gradient_norm_epsilon", self.gradient_norm_epsilon),
        ] {
            ensure_config!(
                eps.is_finite() && eps >= 0.0,
                "{name} must be finite and non-negative, got {eps}"
            );
        }
        ensure_config!(!self.root_epsilon.is_nan(), "root_epsilon must not be NaN");
        Ok(())
    }
}

impl Default for EndCriteria {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_evaluations: 10_000,
            max_stationary_state_iterations: 100,
            root_epsilon: 0.0,
            function_epsilon: 1e-8,
            x_epsilon: 1e-8,
            gradient_norm_epsilon: 1e-8,
        }
    }
}

/// The reason an optimization terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum EndCriteriaType {
    /// Maximum iterations reached.
    MaxIterations,
    /// Maximum objective evaluations reached.
    MaxEvaluations,
    /// Objective at or below root epsilon.
    RootEpsilon,
    /// Objective and parameter changes below their epsilons.
    FunctionEpsilon,
    /// Projected gradient norm below gradient norm epsilon.
    GradientNormEpsilon,
    /// No further progress possible (failed line search or stagnant best value).
    StationaryPoint,
}

impl EndCriteriaType {
    /// Whether the minimizer's own convergence test was met.
    pub fn is_success(self) -> bool {
        !matches!(
            self,
            EndCriteriaType::MaxIterations | EndCriteriaType::MaxEvaluations
        )
    }

    /// Human-readable status message.
    pub fn message(self) -> &'static str {
        match self {
            EndCriteriaType::MaxIterations => "maximum number of iterations reached",
            EndCriteriaType::MaxEvaluations => "maximum number of objective evaluations reached",
            EndCriteriaType::RootEpsilon => "objective reached the root epsilon",
            EndCriteriaType::FunctionEpsilon => "objective and parameter changes below tolerance",
            EndCriteriaType::GradientNormEpsilon => "projected gradient norm below tolerance",
            EndCriteriaType::StationaryPoint => "no further improvement found",
        }
    }
}

impl fmt::Display for EndCriteriaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of an optimization.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Final parameter values.
    pub x: Array,
    /// Final objective value.
    pub value: Real,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Number of objective evaluations performed.
    pub evaluations: usize,
    /// Reason for termination.
    pub end_type: EndCriteriaType,
}

impl OptimizationResult {
    /// Whether the minimizer reports convergence.
    pub fn success(&self) -> bool {
        self.end_type.is_success()
    }
}

// ── Evaluation bookkeeping ────────────────────────────────────────────────────

/// Counts objective calls and rejects non-finite objective values.
pub(crate) struct Evaluator<'a, C: ?Sized> {
    cost_fn: &'a C,
    count: Cell<usize>,
}

impl<'a, C: CostFunction + ?Sized> Evaluator<'a, C> {
    pub(crate) fn new(cost_fn: &'a C) -> Self {
        Self {
            cost_fn,
            count: Cell::new(0),
        }
    }

    pub(crate) fn value(&self, x: &Array) -> Result<Real> {
        self.count.set(self.count.get() + 1);
        let v = self.cost_fn.value(x)?;
        if !v.is_finite() {
            fail!("objective returned non-finite value {v} at {x}");
        }
        Ok(v)
    }

    pub(crate) fn evaluations(&self) -> usize {
        self.count.get()
    }
}

pub(crate) fn check_start(bounds: &Bounds, initial_values: &Array) -> Result<()> {
    ensure_config!(
        initial_values.size() == bounds.dimension(),
        "initial point has {} dimensions but bounds have {}",
        initial_values.size(),
        bounds.dimension()
    );
    ensure_config!(
        bounds.contains(initial_values),
        "initial point {initial_values} lies outside the bounds"
    );
    Ok(())
}

// ── Method selection ──────────────────────────────────────────────────────────

/// A bounded minimizer together with its method-specific options.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OptimizationMethod {
    /// Derivative-free Nelder–Mead simplex with iterates clipped to the box.
    NelderMead(NelderMeadOptions),
    /// Quasi-Newton BFGS on the projected gradient (finite differences).
    ProjectedBfgs(BfgsOptions),
    /// Seeded population-based global search.
    DifferentialEvolution(DifferentialEvolutionOptions),
}

impl Default for OptimizationMethod {
    fn default() -> Self {
        OptimizationMethod::ProjectedBfgs(BfgsOptions::default())
    }
}

impl OptimizationMethod {
    /// Canonical method name.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizationMethod::NelderMead(_) => "nelder-mead",
            OptimizationMethod::ProjectedBfgs(_) => "l-bfgs-b",
            OptimizationMethod::DifferentialEvolution(_) => "differential-evolution",
        }
    }

    /// Minimize `cost_fn` inside `bounds`, starting from `initial_values`.
    pub fn minimize<C: CostFunction + ?Sized>(
        &self,
        cost_fn: &C,
        bounds: &Bounds,
        initial_values: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        match self {
            OptimizationMethod::NelderMead(opts) => {
                NelderMead::new(opts.clone()).minimize(cost_fn, bounds, initial_values, end_criteria)
            }
            OptimizationMethod::ProjectedBfgs(opts) => ProjectedBfgs::new(opts.clone())
                .minimize(cost_fn, bounds, initial_values, end_criteria),
            OptimizationMethod::DifferentialEvolution(opts) => {
                DifferentialEvolution::new(opts.clone())
                    .minimize(cost_fn, bounds, initial_values, end_criteria)
            }
        }
    }
}

impl FromStr for OptimizationMethod {
    type Err = Error;

    /// Parse a method name with default options.
    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        match key.as_str() {
            "nelder-mead" | "neldermead" | "simplex" => {
                Ok(OptimizationMethod::NelderMead(NelderMeadOptions::default()))
            }
            "l-bfgs-b" | "bfgs" | "projected-bfgs" => {
                Ok(OptimizationMethod::ProjectedBfgs(BfgsOptions::default()))
            }
            "differential-evolution" | "de" => Ok(OptimizationMethod::DifferentialEvolution(
                DifferentialEvolutionOptions::default(),
            )),
            _ => Err(Error::Configuration(format!(
                "unknown optimization method '{s}'"
            ))),
        }
    }
}

impl fmt::Display for OptimizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_validation() {
        assert!(Bounds::new(vec![0.0, 0.0], vec![1.0, 2.0]).is_ok());
        assert!(matches!(
            Bounds::new(vec![0.0], vec![1.0, 2.0]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Bounds::new(vec![1.0], vec![0.0]),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            Bounds::new(vec![Real::NEG_INFINITY], vec![0.0]),
            Err(Error::Configuration(_))
        ));
        assert!(Bounds::new(vec![], vec![]).is_err());
    }

    #[test]
    fn bounds_project_and_center() {
        let b = Bounds::new(vec![0.0, -1.0], vec![1.0, 1.0]).unwrap();
        let p = b.project(&Array::from_slice(&[1.5, -3.0]));
        assert_eq!(p.as_slice(), &[1.0, -1.0]);
        assert!(b.contains(&p));
        assert_eq!(b.center().as_slice(), &[0.5, 0.0]);
        assert!(!b.contains(&Array::from_slice(&[0.5])));
    }

    #[test]
    fn method_names_parse() {
        assert!(matches!(
            "Nelder-Mead".parse::<OptimizationMethod>(),
            Ok(OptimizationMethod::NelderMead(_))
        ));
        assert!(matches!(
            "L-BFGS-B".parse::<OptimizationMethod>(),
            Ok(OptimizationMethod::ProjectedBfgs(_))
        ));
        assert!(matches!(
            "differential_evolution".parse::<OptimizationMethod>(),
            Ok(OptimizationMethod::DifferentialEvolution(_))
        ));
        assert!(matches!(
            "powell".parse::<OptimizationMethod>(),
            Err(Error::Configuration(_))
        ));
        assert_eq!(OptimizationMethod::default().name(), "l-bfgs-b");
    }

    #[test]
    fn end_criteria_tolerance() {
        let ec = EndCriteria::default().with_tolerance(1e-6);
        assert_eq!(ec.function_epsilon, 1e-6);
        assert_eq!(ec.x_epsilon, 1e-6);
        assert_eq!(ec.gradient_norm_epsilon, 1e-6);
        assert!(ec.validate().is_ok());
        assert!(EndCriteria::default().with_tolerance(-1.0).validate().is_err());
        assert!(EndCriteria::default().with_max_iterations(0).validate().is_err());
    }

    #[test]
    fn evaluator_rejects_nan() {
        let f = |_: &Array| -> Result<Real> { Ok(Real::NAN) };
        let ev = Evaluator::new(&f);
        assert!(matches!(
            ev.value(&Array::from_slice(&[0.0])),
            Err(Error::Runtime(_))
        ));
        assert_eq!(ev.evaluations(), 1);
    }

    #[test]
    fn end_type_success() {
        assert!(EndCriteriaType::FunctionEpsilon.is_success());
        assert!(!EndCriteriaType::MaxEvaluations.is_success());
    }
}
