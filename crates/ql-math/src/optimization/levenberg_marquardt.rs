use ql_core::{ensure, errors::Result, Real};
use tracing::debug;

use super::{CostFunction, EndCriteria, EndCriteriaType, OptimizationMethod, OptimizationResult, Problem};
use crate::array::Array;
use crate::matrix_utilities::qr_solve;

/// Levenberg-Marquardt least squares with Marquardt's diagonal scaling.
///
/// Each step solves `min ‖J·δ + r‖² + λ‖D·δ‖²`, where `D` holds the column
/// norms of the Jacobian, through a pivoted QR factorization.  The damping
/// `λ` shrinks after an accepted step and grows after a rejected one; steps
/// leaving the admissible region are shortened along their direction.
#[derive(Debug, Clone, Copy)]
pub struct LevenbergMarquardt {
    initial_damping: Real,
}

impl Default for LevenbergMarquardt {
    fn default() -> Self {
        Self::new(1e-3)
    }
}

impl LevenbergMarquardt {
    /// Optimizer starting with damping `initial_damping`.
    pub fn new(initial_damping: Real) -> Self {
        Self { initial_damping }
    }
}

const MAX_DAMPING: Real = 1e16;

impl OptimizationMethod for LevenbergMarquardt {
    fn minimize<C: CostFunction + ?Sized>(
        &self,
        problem: &Problem<'_, C>,
        initial: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        ensure!(
            problem.constraint().test(initial),
            "initial guess violates the constraint"
        );
        let mut x = initial.clone();
        let mut residuals = problem.values(&x)?;
        let mut cost = residuals.dot(&residuals);
        let mut damping = self.initial_damping;
        let mut stationary = 0;

        let finish = |x: Array, value: Real, iterations: usize, end_type: EndCriteriaType| {
            debug!(iterations, value, ?end_type, "Levenberg-Marquardt finished");
            Ok(OptimizationResult {
                x,
                value,
                iterations,
                function_evaluations: problem.function_evaluations(),
                end_type,
            })
        };

        for iteration in 1..=end_criteria.max_iterations {
            if cost <= end_criteria.function_epsilon {
                return finish(x, cost, iteration - 1, EndCriteriaType::StationaryFunctionAccuracy);
            }
            let jacobian = problem.jacobian(&x)?;
            let gradient = jacobian.transpose().mul_array(&residuals);
            if gradient.max_abs() <= end_criteria.gradient_norm_epsilon {
                return finish(x, cost, iteration - 1, EndCriteriaType::ZeroGradientNorm);
            }
            let scale = Array::from_fn(x.len(), |j| jacobian.column(j).norm().max(Real::EPSILON));
            let minus_r = -&residuals;

            // inner loop: raise the damping until a step decreases the cost
            let accepted = loop {
                let d = &scale * damping.sqrt();
                let direction = qr_solve(&jacobian, &minus_r, Some(&d))?;
                let t = problem.constraint().admissible_step(&x, &direction, 1.0);
                if t > 0.0 {
                    let mut trial = x.clone();
                    trial.axpy(t, &direction);
                    let trial_residuals = problem.values(&trial)?;
                    let trial_cost = trial_residuals.dot(&trial_residuals);
                    if trial_cost < cost {
                        damping = (damping * 0.1).max(1e-12);
                        break Some((trial, trial_residuals, trial_cost, t * direction.norm()));
                    }
                }
                damping *= 10.0;
                if damping > MAX_DAMPING {
                    break None;
                }
            };

            let Some((trial, trial_residuals, trial_cost, step)) = accepted else {
                return finish(x, cost, iteration, EndCriteriaType::StationaryPoint);
            };
            let improvement = cost - trial_cost;
            x = trial;
            residuals = trial_residuals;
            cost = trial_cost;

            if step <= end_criteria.root_epsilon * (x.norm() + end_criteria.root_epsilon) {
                return finish(x, cost, iteration, EndCriteriaType::StationaryPoint);
            }
            if improvement <= end_criteria.function_epsilon {
                stationary += 1;
                if stationary > end_criteria.max_stationary_state_iterations {
                    return finish(x, cost, iteration, EndCriteriaType::StationaryFunctionValue);
                }
            } else {
                stationary = 0;
            }
        }
        finish(x, cost, end_criteria.max_iterations, EndCriteriaType::MaxIterations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::Constraint;
    use approx::assert_abs_diff_eq;

    fn tight() -> EndCriteria {
        EndCriteria::new(1000, 100, 1e-14, 1e-20, 1e-14)
    }

    /// Residuals of `y = a·exp(b·t)` against exact data for `a = 2`, `b = -0.7`.
    fn exponential_fit(x: &Array) -> Result<Array> {
        Ok((0..10)
            .map(|i| {
                let t = i as Real * 0.3;
                x[0] * (x[1] * t).exp() - 2.0 * (-0.7 * t).exp()
            })
            .collect())
    }

    #[test]
    fn recovers_exponential_parameters() {
        let constraint = Constraint::None;
        let problem = Problem::new(&exponential_fit, &constraint);
        let result = LevenbergMarquardt::default()
            .minimize(&problem, &Array::from_slice(&[1.0, 0.0]), &tight())
            .unwrap();
        assert!(result.end_type.succeeded());
        assert_abs_diff_eq!(result.x[0], 2.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.x[1], -0.7, epsilon = 1e-6);
        assert!(result.function_evaluations > result.iterations);
    }

    #[test]
    fn rosenbrock_residuals() {
        let rosenbrock = |x: &Array| -> Result<Array> {
            Ok(Array::from_slice(&[10.0 * (x[1] - x[0] * x[0]), 1.0 - x[0]]))
        };
        let constraint = Constraint::None;
        let problem = Problem::new(&rosenbrock, &constraint);
        let result = LevenbergMarquardt::default()
            .minimize(&problem, &Array::from_slice(&[-1.2, 1.0]), &tight())
            .unwrap();
        assert_abs_diff_eq!(result.x[0], 1.0, epsilon = 1e-6);
        assert_abs_diff_eq!(result.x[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn constrained_minimum_on_the_boundary() {
        // unconstrained minimum at x = -1, constrained to x > 0
        let shifted = |x: &Array| -> Result<Array> { Ok(Array::from_slice(&[x[0] + 1.0])) };
        let constraint = Constraint::Positive;
        let problem = Problem::new(&shifted, &constraint);
        let result = LevenbergMarquardt::default()
            .minimize(&problem, &Array::from_slice(&[2.0]), &EndCriteria::default())
            .unwrap();
        assert!(result.x[0] > 0.0 && result.x[0] < 1e-3);
    }

    #[test]
    fn iteration_cap_is_reported() {
        let constraint = Constraint::None;
        let problem = Problem::new(&exponential_fit, &constraint);
        let result = LevenbergMarquardt::default()
            .minimize(
                &problem,
                &Array::from_slice(&[1.0, 0.0]),
                &EndCriteria::default().with_max_iterations(1),
            )
            .unwrap();
        assert_eq!(result.end_type, EndCriteriaType::MaxIterations);
        assert!(!result.end_type.succeeded());
    }
}
