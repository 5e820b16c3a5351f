//! Nelder–Mead simplex restricted to a box.
//!
//! Every trial vertex (reflection, expansion, contraction, shrink) is clipped
//! onto the bounds before it is evaluated, so the objective is never called
//! outside the box.

use crate::array::Array;
use crate::optimization::{
    check_start, Bounds, CostFunction, EndCriteria, EndCriteriaType, Evaluator,
    OptimizationResult,
};
use sc_core::{ensure_config, errors::Result, Real};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for [`NelderMead`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NelderMeadOptions {
    /// Initial simplex edge as a fraction of each bound's width.
    pub initial_step: Real,
    /// Reflection coefficient.
    pub reflection: Real,
    /// Expansion coefficient.
    pub expansion: Real,
    /// Contraction coefficient.
    pub contraction: Real,
    /// Shrink coefficient.
    pub shrink: Real,
}

impl Default for NelderMeadOptions {
    fn default() -> Self {
        Self {
            initial_step: 0.05,
            reflection: 1.0,
            expansion: 2.0,
            contraction: 0.5,
            shrink: 0.5,
        }
    }
}

impl NelderMeadOptions {
    /// Override the initial simplex step.
    pub fn with_initial_step(mut self, initial_step: Real) -> Self {
        self.initial_step = initial_step;
        self
    }

    fn validate(&self) -> Result<()> {
        ensure_config!(
            self.initial_step > 0.0 && self.initial_step <= 1.0,
            "Nelder-Mead initial_step must be in (0, 1], got {}",
            self.initial_step
        );
        ensure_config!(self.reflection > 0.0, "Nelder-Mead reflection must be positive");
        ensure_config!(
            self.expansion > 1.0 && self.expansion > self.reflection,
            "Nelder-Mead expansion must exceed 1 and the reflection coefficient"
        );
        ensure_config!(
            self.contraction > 0.0 && self.contraction < 1.0,
            "Nelder-Mead contraction must be in (0, 1)"
        );
        ensure_config!(
            self.shrink > 0.0 && self.shrink < 1.0,
            "Nelder-Mead shrink must be in (0, 1)"
        );
        Ok(())
    }
}

/// Derivative-free Nelder–Mead minimizer.
#[derive(Debug, Clone, Default)]
pub struct NelderMead {
    options: NelderMeadOptions,
}

impl NelderMead {
    /// Create a simplex optimizer with the given options.
    pub fn new(options: NelderMeadOptions) -> Self {
        Self { options }
    }

    /// Minimize `cost_fn` inside `bounds`, starting from `initial_values`.
    pub fn minimize<C: CostFunction + ?Sized>(
        &self,
        cost_fn: &C,
        bounds: &Bounds,
        initial_values: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        self.options.validate()?;
        end_criteria.validate()?;
        check_start(bounds, initial_values)?;

        let opts = &self.options;
        let eval = Evaluator::new(cost_fn);
        let n = initial_values.size();

        let f0 = eval.value(initial_values)?;
        let mut simplex = self.simplex_around(&eval, bounds, initial_values.clone(), f0)?;
        // Best value when the simplex was last rebuilt.
        let mut restarted_at: Option<Real> = None;

        let mut iterations = 0;
        loop {
            simplex.sort_by(|a, b| a.1.total_cmp(&b.1));
            let (best_x, best_f) = (&simplex[0].0, simplex[0].1);

            let finish = |end_type| OptimizationResult {
                x: best_x.clone(),
                value: best_f,
                iterations,
                evaluations: eval.evaluations(),
                end_type,
            };

            if best_f <= end_criteria.root_epsilon {
                return Ok(finish(EndCriteriaType::RootEpsilon));
            }
            let f_spread = simplex[1..]
                .iter()
                .map(|(_, f)| (f - best_f).abs())
                .fold(0.0, Real::max);
            let x_spread = simplex[1..]
                .iter()
                .map(|(x, _)| x.max_abs_diff(best_x))
                .fold(0.0, Real::max);
            if f_spread <= end_criteria.function_epsilon && x_spread <= end_criteria.x_epsilon {
                // Clipping can flatten the simplex onto a face of the box, so a
                // collapse only counts once a fresh simplex fails to improve.
                if restarted_at.is_some_and(|f| best_f >= f - end_criteria.function_epsilon) {
                    return Ok(finish(EndCriteriaType::FunctionEpsilon));
                }
                if eval.evaluations() >= end_criteria.max_evaluations {
                    return Ok(finish(EndCriteriaType::MaxEvaluations));
                }
                restarted_at = Some(best_f);
                let (x, f) = simplex.swap_remove(0);
                simplex = self.simplex_around(&eval, bounds, x, f)?;
                continue;
            }
            if iterations >= end_criteria.max_iterations {
                return Ok(finish(EndCriteriaType::MaxIterations));
            }
            if eval.evaluations() >= end_criteria.max_evaluations {
                return Ok(finish(EndCriteriaType::MaxEvaluations));
            }
            iterations += 1;

            let mut centroid = Array::zeros(n);
            for (x, _) in &simplex[..n] {
                centroid = &centroid + x;
            }
            let centroid = &centroid * (1.0 / n as Real);
            let worst_f = simplex[n].1;
            let toward_worst = &centroid - &simplex[n].0;
            let along = |t: Real| bounds.project(&(&centroid + &(&toward_worst * t)));

            let xr = along(opts.reflection);
            let fr = eval.value(&xr)?;

            if fr < best_f {
                let xe = along(opts.reflection * opts.expansion);
                let fe = eval.value(&xe)?;
                simplex[n] = if fe < fr { (xe, fe) } else { (xr, fr) };
                continue;
            }
            if fr < simplex[n - 1].1 {
                simplex[n] = (xr, fr);
                continue;
            }

            let accepted = if fr < worst_f {
                let xc = along(opts.contraction * opts.reflection);
                let fc = eval.value(&xc)?;
                (fc <= fr).then_some((xc, fc))
            } else {
                let xcc = along(-opts.contraction);
                let fcc = eval.value(&xcc)?;
                (fcc < worst_f).then_some((xcc, fcc))
            };

            match accepted {
                Some(vertex) => simplex[n] = vertex,
                None => {
                    let anchor = simplex[0].0.clone();
                    for vertex in simplex.iter_mut().skip(1) {
                        let shrunk = &anchor + &(&(&vertex.0 - &anchor) * opts.shrink);
                        let f = eval.value(&shrunk)?;
                        *vertex = (shrunk, f);
                    }
                }
            }
        }
    }

    /// Simplex with `x` as first vertex and one vertex per axis, stepping down
    /// where the upward step would leave the box.
    fn simplex_around<C: CostFunction + ?Sized>(
        &self,
        eval: &Evaluator<'_, C>,
        bounds: &Bounds,
        x: Array,
        f: Real,
    ) -> Result<Vec<(Array, Real)>> {
        let n = x.size();
        let mut simplex = Vec::with_capacity(n + 1);
        for i in 0..n {
            let step = self.options.initial_step * bounds.width(i);
            let mut v = x.clone();
            if v[i] + step <= bounds.upper()[i] {
                v[i] += step;
            } else {
                v[i] -= step;
            }
            let v = bounds.project(&v);
            let fv = eval.value(&v)?;
            simplex.push((v, fv));
        }
        simplex.insert(0, (x, f));
        Ok(simplex)
    }
}
