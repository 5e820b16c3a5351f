//! Projected BFGS quasi-Newton optimizer for box-constrained problems.
//!
//! Gradients come from one-sided finite differences that stay inside the
//! box.  Variables sitting on a bound with the gradient pointing outward are
//! held fixed for the step; the remaining ones follow the BFGS direction and
//! each trial point is projected back onto the box before evaluation.

use crate::array::Array;
use crate::optimization::{
    check_start, Bounds, CostFunction, EndCriteria, EndCriteriaType, Evaluator,
    OptimizationResult,
};
use nalgebra::{DMatrix, DVector};
use sc_core::{ensure_config, errors::Result, Real};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for [`ProjectedBfgs`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BfgsOptions {
    /// Relative finite-difference step, scaled by `max(1, |x_i|)`.
    pub finite_difference_step: Real,
    /// Maximum number of halvings in the backtracking line search.
    pub max_line_search_steps: usize,
    /// Armijo sufficient-decrease constant.
    pub armijo: Real,
}

impl Default for BfgsOptions {
    fn default() -> Self {
        Self {
            finite_difference_step: Real::EPSILON.sqrt(),
            max_line_search_steps: 30,
            armijo: 1e-4,
        }
    }
}

impl BfgsOptions {
    /// Override the finite-difference step.
    pub fn with_finite_difference_step(mut self, step: Real) -> Self {
        self.finite_difference_step = step;
        self
    }

    fn validate(&self) -> Result<()> {
        ensure_config!(
            self.finite_difference_step > 0.0 && self.finite_difference_step.is_finite(),
            "BFGS finite_difference_step must be positive, got {}",
            self.finite_difference_step
        );
        ensure_config!(
            self.max_line_search_steps > 0,
            "BFGS max_line_search_steps must be positive"
        );
        ensure_config!(
            self.armijo > 0.0 && self.armijo < 1.0,
            "BFGS armijo constant must be in (0, 1)"
        );
        Ok(())
    }
}

/// Bounded quasi-Newton minimizer.
#[derive(Debug, Clone, Default)]
pub struct ProjectedBfgs {
    options: BfgsOptions,
}

impl ProjectedBfgs {
    /// Create a projected BFGS optimizer.
    pub fn new(options: BfgsOptions) -> Self {
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

        let eval = Evaluator::new(cost_fn);
        let n = initial_values.size();

        let mut x = initial_values.clone();
        let mut value = eval.value(&x)?;
        let mut grad = self.gradient(&eval, bounds, &x, value)?;
        let mut h_inv = DMatrix::<Real>::identity(n, n);

        let mut iterations = 0;
        let end_type = loop {
            if value <= end_criteria.root_epsilon {
                break EndCriteriaType::RootEpsilon;
            }
            let free = free_variables(bounds, &x, &grad);
            let pg = masked(&grad, &free);
            if pg.norm() <= end_criteria.gradient_norm_epsilon {
                break EndCriteriaType::GradientNormEpsilon;
            }
            if iterations >= end_criteria.max_iterations {
                break EndCriteriaType::MaxIterations;
            }
            if eval.evaluations() >= end_criteria.max_evaluations {
                break EndCriteriaType::MaxEvaluations;
            }
            iterations += 1;

            let pg_vec = DVector::from_column_slice(pg.as_slice());
            let mut direction = masked(&Array::from(-(&h_inv * &pg_vec)), &free);
            if direction.dot(&pg) >= 0.0 {
                h_inv = DMatrix::identity(n, n);
                direction = &pg * -1.0;
            }

            let Some((x_new, value_new)) =
                self.line_search(&eval, bounds, &x, value, &grad, &direction)?
            else {
                break EndCriteriaType::StationaryPoint;
            };

            let grad_new = self.gradient(&eval, bounds, &x_new, value_new)?;
            let s = DVector::from_column_slice((&x_new - &x).as_slice());
            let y = DVector::from_column_slice((&grad_new - &grad).as_slice());
            let sy = s.dot(&y);
            if sy > Real::EPSILON * s.norm() * y.norm() {
                // H⁺ = (I − ρ s yᵀ) H (I − ρ y sᵀ) + ρ s sᵀ
                let rho = 1.0 / sy;
                let identity = DMatrix::<Real>::identity(n, n);
                let left = &identity - (&s * y.transpose()) * rho;
                let right = &identity - (&y * s.transpose()) * rho;
                h_inv = &left * &h_inv * &right + (&s * s.transpose()) * rho;
            }

            let scale = value.abs().max(value_new.abs()).max(1.0);
            let f_change = (value - value_new) / scale;
            let x_change = x_new.max_abs_diff(&x);

            x = x_new;
            value = value_new;
            grad = grad_new;

            if f_change <= end_criteria.function_epsilon || x_change <= end_criteria.x_epsilon {
                break EndCriteriaType::FunctionEpsilon;
            }
        };

        Ok(OptimizationResult {
            x,
            value,
            iterations,
            evaluations: eval.evaluations(),
            end_type,
        })
    }

    /// One-sided finite-difference gradient that never leaves the box.
    fn gradient<C: CostFunction + ?Sized>(
        &self,
        eval: &Evaluator<'_, C>,
        bounds: &Bounds,
        x: &Array,
        fx: Real,
    ) -> Result<Array> {
        let n = x.size();
        let mut grad = Array::zeros(n);
        for i in 0..n {
            let width = bounds.width(i);
            if width == 0.0 {
                continue;
            }
            let mut h = (self.options.finite_difference_step * x[i].abs().max(1.0)).min(0.5 * width);
            if x[i] + h > bounds.upper()[i] {
                h = -h;
            }
            let mut xh = x.clone();
            xh[i] += h;
            let fh = eval.value(&bounds.project(&xh))?;
            grad[i] = (fh - fx) / h;
        }
        Ok(grad)
    }

    /// Backtracking Armijo search along the projected path `P(x + α d)`.
    fn line_search<C: CostFunction + ?Sized>(
        &self,
        eval: &Evaluator<'_, C>,
        bounds: &Bounds,
        x: &Array,
        value: Real,
        grad: &Array,
        direction: &Array,
    ) -> Result<Option<(Array, Real)>> {
        let mut alpha = 1.0;
        for _ in 0..self.options.max_line_search_steps {
            let trial = bounds.project(&(x + &(direction * alpha)));
            let step = &trial - x;
            if step.norm() == 0.0 {
                return Ok(None);
            }
            let f_trial = eval.value(&trial)?;
            if f_trial <= value + self.options.armijo * grad.dot(&step) {
                return Ok(Some((trial, f_trial)));
            }
            alpha *= 0.5;
        }
        Ok(None)
    }
}

/// `true` for variables allowed to move: not pinned on a bound by a gradient
/// pointing out of the box.
fn free_variables(bounds: &Bounds, x: &Array, grad: &Array) -> Vec<bool> {
    (0..x.size())
        .map(|i| {
            let at_lower = x[i] <= bounds.lower()[i] && grad[i] > 0.0;
            let at_upper = x[i] >= bounds.upper()[i] && grad[i] < 0.0;
            !(at_lower || at_upper) && bounds.width(i) > 0.0
        })
        .collect()
}

fn masked(v: &Array, free: &[bool]) -> Array {
    let kept: Vec<Real> = v
        .iter()
        .zip(free)
        .map(|(&g, &f)| if f { g } else { 0.0 })
        .collect();
    Array::from(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn unit_box() -> Bounds {
        Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()
    }

    #[test]
    fn quadratic_interior_minimum() {
        let f = |x: &Array| -> Result<Real> {
            Ok(3.0 * (x[0] - 0.25).powi(2) + (x[1] - 0.6).powi(2) + 0.5 * (x[0] - 0.25) * (x[1] - 0.6))
        };
        let ec = EndCriteria::default().with_tolerance(1e-14);
        let res = ProjectedBfgs::default()
            .minimize(&f, &unit_box(), &unit_box().center(), &ec)
            .unwrap();
        assert!(res.success(), "{:?}", res.end_type);
        assert_abs_diff_eq!(res.x[0], 0.25, epsilon = 1e-5);
        assert_abs_diff_eq!(res.x[1], 0.6, epsilon = 1e-5);
    }

    #[test]
    fn active_lower_bound() {
        // Minimum at vol = -0.2 is outside the box, so the fit pins vol at 0.
        let f = |x: &Array| -> Result<Real> { Ok((x[0] + 0.2).powi(2) + (x[1] - 0.4).powi(2)) };
        let ec = EndCriteria::default().with_tolerance(1e-12);
        let res = ProjectedBfgs::default()
            .minimize(&f, &unit_box(), &unit_box().center(), &ec)
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(res.x[1], 0.4, epsilon = 1e-5);
    }

    #[test]
    fn exact_zero_stops_on_root_epsilon() {
        let f = |x: &Array| -> Result<Real> { Ok((10.0 * x[0]).powi(2)) };
        let res = ProjectedBfgs::default()
            .minimize(&f, &unit_box(), &unit_box().center(), &EndCriteria::default())
            .unwrap();
        assert_eq!(res.end_type, EndCriteriaType::RootEpsilon);
        assert_eq!(res.x[0], 0.0);
        assert_eq!(res.value, 0.0);
    }

    #[test]
    fn gradient_stays_inside_box() {
        let b = unit_box();
        let f = |x: &Array| -> Result<Real> {
            assert!(b.contains(x), "evaluated outside the box at {x}");
            Ok((x[0] - 1.5).powi(2) + x[1])
        };
        let res = ProjectedBfgs::default()
            .minimize(&f, &b, &Array::from_slice(&[1.0, 1.0]), &EndCriteria::default())
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(res.x[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_dimension_is_fixed() {
        let b = Bounds::new(vec![0.0, 0.5], vec![1.0, 0.5]).unwrap();
        let f = |x: &Array| -> Result<Real> { Ok((x[0] - 0.8).powi(2) + x[1]) };
        let res = ProjectedBfgs::default()
            .minimize(&f, &b, &b.center(), &EndCriteria::default().with_tolerance(1e-12))
            .unwrap();
        assert_eq!(res.x[1], 0.5);
        assert_abs_diff_eq!(res.x[0], 0.8, epsilon = 1e-5);
    }
}
