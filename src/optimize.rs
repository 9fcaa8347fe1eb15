use anyhow::Result;
use argmin::core::{CostFunction, Executor, Gradient, State};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;

use crate::evolve;
use crate::Qbit;

const ALPHA_MAX: f64 = std::f64::consts::TAU;
const BETA_MAX: f64 = std::f64::consts::PI;

const FINITE_DIFF_STEP: f64 = 1e-6;

/// The fixed starting guess when no warm start is available: every angle
/// at pi/4.
pub fn initial_angles(depth: usize) -> DVector<f64> {
    DVector::from_element(2 * depth, std::f64::consts::FRAC_PI_4)
}

/// Project an angle vector into its box.
///
/// The ansatz cost is 2*pi-periodic in every angle, so alpha components
/// (even indices, bound [0, 2*pi]) are wrapped rather than clamped. Beta
/// components (odd indices) are clamped to [0, pi].
pub fn project_into_bounds(angles: &DVector<f64>) -> DVector<f64> {
    DVector::from_iterator(
        angles.len(),
        angles.iter().enumerate().map(|(i, &x)| {
            if i % 2 == 0 {
                x.rem_euclid(ALPHA_MAX)
            } else {
                x.clamp(0.0, BETA_MAX)
            }
        }),
    )
}

/// Scalar objective over the angle box for a fixed pair of generators.
#[derive(Clone)]
pub struct AnsatzCost<'a> {
    h: &'a DMatrix<Qbit>,
    d: &'a DMatrix<Qbit>,
    num_of_qbits: usize,
}

impl<'a> AnsatzCost<'a> {
    pub fn new(h: &'a DMatrix<Qbit>, d: &'a DMatrix<Qbit>, num_of_qbits: usize) -> Self {
        Self { h, d, num_of_qbits }
    }
}

impl CostFunction for AnsatzCost<'_> {
    type Param = DVector<f64>;
    type Output = f64;

    fn cost(&self, angles: &Self::Param) -> Result<Self::Output> {
        let projected = project_into_bounds(angles);
        let (cost, _) = evolve::evaluate(self.h, self.d, self.num_of_qbits, projected.as_slice())?;
        Ok(cost)
    }
}

impl Gradient for AnsatzCost<'_> {
    type Param = DVector<f64>;
    type Gradient = DVector<f64>;

    fn gradient(&self, angles: &Self::Param) -> Result<Self::Gradient> {
        let mut gradient = DVector::zeros(angles.len());
        for i in 0..angles.len() {
            let mut plus = angles.clone();
            plus[i] += FINITE_DIFF_STEP;
            let mut minus = angles.clone();
            minus[i] -= FINITE_DIFF_STEP;
            gradient[i] = (self.cost(&plus)? - self.cost(&minus)?) / (2.0 * FINITE_DIFF_STEP);
        }
        Ok(gradient)
    }
}

/// Result of one global optimization run. The angles always lie inside
/// the box.
pub struct OptimizeOutcome {
    pub angles: DVector<f64>,
    pub cost: f64,
}

/// Basin-hopping search over the angle box.
///
/// Each hop refines the current point with L-BFGS, accepts or rejects the
/// refined point with a Metropolis rule, then perturbs with Gaussian
/// steps. Every few hops the walker restarts from a fresh uniform point
/// so isolated basins are still reachable. Deterministic for a fixed
/// seed.
#[derive(Clone, Copy)]
pub struct BasinHopping {
    pub hops: usize,
    pub step_size: f64,
    pub temperature: f64,
    /// Every this many hops, jump to a uniform random point instead of
    /// perturbing the current one.
    pub restart_every: usize,
    pub local_iters: u64,
    pub seed: u64,
}

impl Default for BasinHopping {
    fn default() -> Self {
        Self {
            hops: 60,
            step_size: 0.5,
            temperature: 0.2,
            restart_every: 10,
            local_iters: 100,
            seed: 0,
        }
    }
}

impl BasinHopping {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }

    /// Minimize the ansatz cost over the 2p-dimensional angle box,
    /// starting from `init` (warm start or `initial_angles`).
    ///
    /// The best point seen across all hops is returned, so the outcome
    /// is never worse than the projected starting point. The global
    /// optimum is not guaranteed for large p; the search may settle in a
    /// local minimum.
    pub fn optimize(
        &self,
        h: &DMatrix<Qbit>,
        d: &DMatrix<Qbit>,
        num_of_qbits: usize,
        init: &DVector<f64>,
    ) -> Result<OptimizeOutcome> {
        let problem = AnsatzCost::new(h, d, num_of_qbits);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let hop_dist = Normal::new(0.0, self.step_size)?;

        let mut current = project_into_bounds(init);
        let mut current_cost = problem.cost(&current)?;

        let mut best = current.clone();
        let mut best_cost = current_cost;

        for hop in 0..self.hops {
            let (candidate, candidate_cost) = self.local_minimize(&problem, &current)?;

            if candidate_cost < best_cost {
                best = candidate.clone();
                best_cost = candidate_cost;
            }

            let accept = candidate_cost <= current_cost || {
                let boltzmann = ((current_cost - candidate_cost) / self.temperature).exp();
                rng.random::<f64>() < boltzmann
            };
            if accept {
                current = candidate;
                current_cost = candidate_cost;
            }

            let next = if self.restart_every > 0 && (hop + 1) % self.restart_every == 0 {
                self.random_point(init.len(), &mut rng)
            } else {
                let hopped = current.map(|x| x + rng.sample(hop_dist));
                project_into_bounds(&hopped)
            };
            current = next;
            current_cost = problem.cost(&current)?;
        }

        Ok(OptimizeOutcome {
            angles: best,
            cost: best_cost,
        })
    }

    fn random_point(&self, len: usize, rng: &mut StdRng) -> DVector<f64> {
        DVector::from_iterator(
            len,
            (0..len).map(|i| {
                if i % 2 == 0 {
                    rng.random_range(0.0..ALPHA_MAX)
                } else {
                    rng.random_range(0.0..BETA_MAX)
                }
            }),
        )
    }

    /// One L-BFGS descent. A line-search breakdown (typical when the
    /// start is already a stationary point) falls back to the start
    /// instead of aborting the whole search.
    fn local_minimize(
        &self,
        problem: &AnsatzCost<'_>,
        init: &DVector<f64>,
    ) -> Result<(DVector<f64>, f64)> {
        let linesearch = MoreThuenteLineSearch::new();
        let solver = LBFGS::new(linesearch, 7).with_tolerance_grad(1e-8)?;

        let refined = Executor::new(problem.clone(), solver)
            .configure(|state| state.param(init.clone()).max_iters(self.local_iters))
            .run()
            .ok()
            .and_then(|res| res.state().get_best_param().cloned())
            .unwrap_or_else(|| init.clone());

        let projected = project_into_bounds(&refined);
        let cost = problem.cost(&projected)?;
        Ok((projected, cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::generator::{driver_generator, marking_generator};
    use crate::qstate::QState;

    #[test]
    fn test_project_into_bounds() {
        let raw = DVector::from_row_slice(&[-1.0, -1.0, 7.0, 4.0]);
        let projected = project_into_bounds(&raw);

        assert_approx_eq!(std::f64::consts::TAU - 1.0, projected[0]);
        assert_approx_eq!(0.0, projected[1]);
        assert_approx_eq!(7.0 - std::f64::consts::TAU, projected[2]);
        assert_approx_eq!(std::f64::consts::PI, projected[3]);
    }

    #[test]
    fn test_gradient_matches_slope_of_cost() -> Result<()> {
        let target = QState::basis("01")?;
        let h = marking_generator(&target);
        let d = driver_generator(2)?;
        let problem = AnsatzCost::new(&h, &d, 2);

        let angles = DVector::from_row_slice(&[1.2, 0.8]);
        let gradient = problem.gradient(&angles)?;

        let coarse = 1e-4;
        for i in 0..2 {
            let mut plus = angles.clone();
            plus[i] += coarse;
            let mut minus = angles.clone();
            minus[i] -= coarse;
            let slope = (problem.cost(&plus)? - problem.cost(&minus)?) / (2.0 * coarse);
            assert!((gradient[i] - slope).abs() < 1e-5);
        }

        Ok(())
    }

    #[test]
    fn test_optimize_never_regresses_from_warm_start() -> Result<()> {
        let target = QState::basis("11")?;
        let h = marking_generator(&target);
        let d = driver_generator(2)?;

        let init = initial_angles(1);
        let problem = AnsatzCost::new(&h, &d, 2);
        let init_cost = problem.cost(&init)?;

        let optimizer = BasinHopping {
            hops: 5,
            ..BasinHopping::with_seed(7)
        };
        let outcome = optimizer.optimize(&h, &d, 2, &init)?;

        assert!(outcome.cost <= init_cost);
        assert_eq!(outcome.angles.len(), 2);
        for (i, &angle) in outcome.angles.iter().enumerate() {
            if i % 2 == 0 {
                assert!((0.0..=ALPHA_MAX).contains(&angle));
            } else {
                assert!((0.0..=BETA_MAX).contains(&angle));
            }
        }

        Ok(())
    }

    #[test]
    fn test_optimize_finds_single_layer_optimum_on_two_qubits() -> Result<()> {
        // For N = 4 the depth-1 ansatz can reach the target exactly.
        let target = QState::basis("11")?;
        let h = marking_generator(&target);
        let d = driver_generator(2)?;

        let optimizer = BasinHopping::with_seed(1);
        let outcome = optimizer.optimize(&h, &d, 2, &initial_angles(1))?;

        assert!(outcome.cost < -0.999);
        Ok(())
    }

    #[test]
    fn test_optimize_is_deterministic_for_a_seed() -> Result<()> {
        let target = QState::basis("10")?;
        let h = marking_generator(&target);
        let d = driver_generator(2)?;

        let optimizer = BasinHopping {
            hops: 8,
            ..BasinHopping::with_seed(99)
        };
        let first = optimizer.optimize(&h, &d, 2, &initial_angles(1))?;
        let second = optimizer.optimize(&h, &d, 2, &initial_angles(1))?;

        assert_approx_eq!(first.cost, second.cost);
        assert_approx_eq!(0.0, (first.angles - second.angles).norm());

        Ok(())
    }
}
