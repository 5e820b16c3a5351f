//! Differential evolution (DE/rand/1/bin) inside a box.
//!
//! The population is drawn uniformly from the bounds with a seeded
//! MT19937-64 generator, so two runs with the same seed and a deterministic
//! objective visit exactly the same points.  Trial vectors are projected
//! onto the box before evaluation.

use crate::array::Array;
use crate::optimization::{
    check_start, Bounds, CostFunction, EndCriteria, EndCriteriaType, Evaluator,
    OptimizationResult,
};
use rand_mt::Mt19937GenRand64;
use sc_core::{ensure_config, errors::Result, Real};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for [`DifferentialEvolution`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DifferentialEvolutionOptions {
    /// Number of candidates (at least 4).
    pub population_size: usize,
    /// Probability of taking each coordinate from the mutant vector.
    pub crossover_probability: Real,
    /// Scale factor applied to difference vectors.
    pub differential_weight: Real,
    /// Seed of the Mersenne Twister driving initialisation and mutation.
    pub seed: u64,
}

impl Default for DifferentialEvolutionOptions {
    fn default() -> Self {
        Self {
            population_size: 20,
            crossover_probability: 0.7,
            differential_weight: 0.8,
            seed: 42,
        }
    }
}

impl DifferentialEvolutionOptions {
    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the population size.
    pub fn with_population_size(mut self, population_size: usize) -> Self {
        self.population_size = population_size;
        self
    }

    fn validate(&self) -> Result<()> {
        ensure_config!(
            self.population_size >= 4,
            "differential evolution needs a population of at least 4, got {}",
            self.population_size
        );
        ensure_config!(
            (0.0..=1.0).contains(&self.crossover_probability),
            "crossover_probability must be in [0, 1], got {}",
            self.crossover_probability
        );
        ensure_config!(
            self.differential_weight > 0.0 && self.differential_weight <= 2.0,
            "differential_weight must be in (0, 2], got {}",
            self.differential_weight
        );
        Ok(())
    }
}

/// Uniform deviates in `[0, 1)` from MT19937-64.
struct UniformRng {
    rng: Mt19937GenRand64,
}

impl UniformRng {
    fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }

    fn next_real(&mut self) -> Real {
        // top 53 bits: exactly representable, strictly below 1
        (self.rng.next_u64() >> 11) as Real / (1u64 << 53) as Real
    }

    fn next_index(&mut self, n: usize) -> usize {
        ((self.next_real() * n as Real) as usize).min(n - 1)
    }

    /// An index in `0..n` not contained in `exclude`.
    fn next_index_excluding(&mut self, n: usize, exclude: &[usize]) -> usize {
        loop {
            let k = self.next_index(n);
            if !exclude.contains(&k) {
                return k;
            }
        }
    }
}

/// Seeded population-based global minimizer.
#[derive(Debug, Clone, Default)]
pub struct DifferentialEvolution {
    options: DifferentialEvolutionOptions,
}

impl DifferentialEvolution {
    /// Create a differential evolution optimizer.
    pub fn new(options: DifferentialEvolutionOptions) -> Self {
        Self { options }
    }

    /// Minimize `cost_fn` inside `bounds`.
    ///
    /// `initial_values` is kept as the first member of the population; the
    /// rest is sampled uniformly from the box.
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
        let np = opts.population_size;
        let mut rng = UniformRng::new(opts.seed);

        let mut population: Vec<Array> = Vec::with_capacity(np);
        population.push(initial_values.clone());
        for _ in 1..np {
            let candidate: Vec<Real> = (0..n)
                .map(|j| bounds.lower()[j] + rng.next_real() * bounds.width(j))
                .collect();
            population.push(Array::from(candidate));
        }
        let mut costs = Vec::with_capacity(np);
        for member in &population {
            costs.push(eval.value(member)?);
        }

        let mut best = best_index(&costs);
        let mut stationary = 0;
        let mut iterations = 0;
        let end_type = loop {
            if costs[best] <= end_criteria.root_epsilon {
                break EndCriteriaType::RootEpsilon;
            }
            let worst = costs.iter().copied().fold(Real::NEG_INFINITY, Real::max);
            if worst - costs[best] <= end_criteria.function_epsilon {
                break EndCriteriaType::FunctionEpsilon;
            }
            if stationary >= end_criteria.max_stationary_state_iterations {
                break EndCriteriaType::StationaryPoint;
            }
            if iterations >= end_criteria.max_iterations {
                break EndCriteriaType::MaxIterations;
            }
            if eval.evaluations() >= end_criteria.max_evaluations {
                break EndCriteriaType::MaxEvaluations;
            }
            iterations += 1;

            let previous_best = costs[best];
            for i in 0..np {
                if eval.evaluations() >= end_criteria.max_evaluations {
                    break;
                }
                let r1 = rng.next_index_excluding(np, &[i]);
                let r2 = rng.next_index_excluding(np, &[i, r1]);
                let r3 = rng.next_index_excluding(np, &[i, r1, r2]);
                let j_rand = rng.next_index(n);

                let mut trial = population[i].clone();
                for j in 0..n {
                    if j == j_rand || rng.next_real() < opts.crossover_probability {
                        trial[j] = population[r1][j]
                            + opts.differential_weight * (population[r2][j] - population[r3][j]);
                    }
                }
                let trial = bounds.project(&trial);
                let trial_cost = eval.value(&trial)?;
                if trial_cost <= costs[i] {
                    population[i] = trial;
                    costs[i] = trial_cost;
                }
            }

            best = best_index(&costs);
            if costs[best] < previous_best {
                stationary = 0;
            } else {
                stationary += 1;
            }
        };

        Ok(OptimizationResult {
            x: population[best].clone(),
            value: costs[best],
            iterations,
            evaluations: eval.evaluations(),
            end_type,
        })
    }
}

fn best_index(costs: &[Real]) -> usize {
    costs
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map_or(0, |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use sc_core::Error;

    fn unit_box() -> Bounds {
        Bounds::new(vec![0.0, 0.0], vec![1.0, 1.0]).unwrap()
    }

    fn bowl(x: &Array) -> Result<Real> {
        Ok((x[0] - 0.3).powi(2) + (x[1] - 0.7).powi(2))
    }

    #[test]
    fn finds_interior_minimum() {
        let ec = EndCriteria::default()
            .with_tolerance(1e-12)
            .with_max_iterations(5000)
            .with_max_evaluations(200_000);
        let res = DifferentialEvolution::default()
            .minimize(&bowl, &unit_box(), &unit_box().center(), &ec)
            .unwrap();
        assert!(res.success(), "{:?}", res.end_type);
        assert_abs_diff_eq!(res.x[0], 0.3, epsilon = 1e-4);
        assert_abs_diff_eq!(res.x[1], 0.7, epsilon = 1e-4);
    }

    #[test]
    fn same_seed_same_run() {
        let ec = EndCriteria::default().with_max_iterations(30);
        let de = DifferentialEvolution::new(DifferentialEvolutionOptions::default().with_seed(7));
        let a = de.minimize(&bowl, &unit_box(), &unit_box().center(), &ec).unwrap();
        let b = de.minimize(&bowl, &unit_box(), &unit_box().center(), &ec).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn trials_stay_inside_box() {
        let b = unit_box();
        let f = |x: &Array| -> Result<Real> {
            assert!(b.contains(x), "evaluated outside the box at {x}");
            Ok((x[0] + 1.0).powi(2) + (x[1] - 2.0).powi(2))
        };
        let ec = EndCriteria::default().with_max_evaluations(2000);
        let res = DifferentialEvolution::default()
            .minimize(&f, &b, &b.center(), &ec)
            .unwrap();
        assert_abs_diff_eq!(res.x[0], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(res.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn evaluation_cap_is_respected() {
        let ec = EndCriteria::default().with_tolerance(0.0).with_max_evaluations(50);
        let res = DifferentialEvolution::default()
            .minimize(&bowl, &unit_box(), &unit_box().center(), &ec)
            .unwrap();
        assert_eq!(res.end_type, EndCriteriaType::MaxEvaluations);
        assert_eq!(res.evaluations, 50);
    }

    #[test]
    fn tiny_population_rejected() {
        let de = DifferentialEvolution::new(
            DifferentialEvolutionOptions::default().with_population_size(3),
        );
        let res = de.minimize(&bowl, &unit_box(), &unit_box().center(), &EndCriteria::default());
        assert!(matches!(res, Err(Error::Configuration(_))));
    }

    #[test]
    fn uniform_deviates_in_unit_interval() {
        let mut rng = UniformRng::new(1);
        for _ in 0..10_000 {
            let u = rng.next_real();
            assert!((0.0..1.0).contains(&u));
        }
        assert!(rng.next_index(3) < 3);
    }
}
