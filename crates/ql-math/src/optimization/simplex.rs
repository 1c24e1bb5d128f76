use ql_core::{ensure, errors::Result, Real};
use tracing::debug;

use super::{CostFunction, EndCriteria, EndCriteriaType, OptimizationMethod, OptimizationResult, Problem};
use crate::array::Array;

/// Nelder-Mead downhill simplex.
///
/// The initial simplex places one vertex `lambda` away from the guess along
/// each axis.  Points outside the constraint are given an infinite cost.
#[derive(Debug, Clone, Copy)]
pub struct Simplex {
    lambda: Real,
}

impl Simplex {
    /// Simplex optimizer with initial edge length `lambda`.
    pub fn new(lambda: Real) -> Self {
        Self { lambda }
    }
}

impl OptimizationMethod for Simplex {
    fn minimize<C: CostFunction + ?Sized>(
        &self,
        problem: &Problem<'_, C>,
        initial: &Array,
        end_criteria: &EndCriteria,
    ) -> Result<OptimizationResult> {
        ensure!(self.lambda > 0.0, "simplex edge length must be positive");
        ensure!(
            problem.constraint().test(initial),
            "initial guess violates the constraint"
        );
        let n = initial.len();
        let cost = |x: &Array| -> Result<Real> {
            if problem.constraint().test(x) {
                problem.value(x)
            } else {
                Ok(Real::INFINITY)
            }
        };

        let mut vertices = Vec::with_capacity(n + 1);
        vertices.push(initial.clone());
        for i in 0..n {
            let mut v = initial.clone();
            v[i] += self.lambda;
            if !problem.constraint().test(&v) {
                v[i] = initial[i] - self.lambda;
            }
            vertices.push(v);
        }
        let mut values = vertices.iter().map(&cost).collect::<Result<Vec<_>>>()?;

        let mut stationary = 0;
        let mut previous_best = Real::INFINITY;
        let mut iteration = 0;
        let end_type = loop {
            let (mut lo, mut hi) = (0, 0);
            for i in 1..=n {
                if values[i] < values[lo] {
                    lo = i;
                }
                if values[i] > values[hi] {
                    hi = i;
                }
            }
            let next_hi = (0..=n)
                .filter(|&i| i != hi)
                .max_by(|&a, &b| values[a].total_cmp(&values[b]))
                .unwrap_or(hi);

            let size = vertices
                .iter()
                .map(|v| (v - &vertices[lo]).norm())
                .fold(0.0, Real::max);
            if size <= end_criteria.root_epsilon {
                break EndCriteriaType::StationaryPoint;
            }
            if values[lo] <= end_criteria.function_epsilon {
                break EndCriteriaType::StationaryFunctionAccuracy;
            }
            if (previous_best - values[lo]).abs() <= end_criteria.function_epsilon {
                stationary += 1;
                if stationary > end_criteria.max_stationary_state_iterations {
                    break EndCriteriaType::StationaryFunctionValue;
                }
            } else {
                stationary = 0;
            }
            previous_best = values[lo];
            if iteration >= end_criteria.max_iterations {
                break EndCriteriaType::MaxIterations;
            }
            iteration += 1;

            let mut centroid = Array::zeros(n);
            for (i, v) in vertices.iter().enumerate() {
                if i != hi {
                    centroid += v;
                }
            }
            let centroid = &centroid / n as Real;

            let reflected = &(&centroid * 2.0) - &vertices[hi];
            let f_reflected = cost(&reflected)?;
            if f_reflected < values[lo] {
                let expanded = &(&reflected * 2.0) - &centroid;
                let f_expanded = cost(&expanded)?;
                if f_expanded < f_reflected {
                    vertices[hi] = expanded;
                    values[hi] = f_expanded;
                } else {
                    vertices[hi] = reflected;
                    values[hi] = f_reflected;
                }
            } else if f_reflected < values[next_hi] {
                vertices[hi] = reflected;
                values[hi] = f_reflected;
            } else {
                let contracted = if f_reflected < values[hi] {
                    &(&centroid + &reflected) / 2.0
                } else {
                    &(&centroid + &vertices[hi]) / 2.0
                };
                let f_contracted = cost(&contracted)?;
                if f_contracted < values[hi].min(f_reflected) {
                    vertices[hi] = contracted;
                    values[hi] = f_contracted;
                } else {
                    let best = vertices[lo].clone();
                    for i in 0..=n {
                        if i != lo {
                            vertices[i] = &(&best + &vertices[i]) / 2.0;
                            values[i] = cost(&vertices[i])?;
                        }
                    }
                }
            }
        };

        let lo = (0..=n)
            .min_by(|&a, &b| values[a].total_cmp(&values[b]))
            .unwrap_or(0);
        debug!(iterations = iteration, value = values[lo], ?end_type, "simplex finished");
        Ok(OptimizationResult {
            x: vertices.swap_remove(lo),
            value: values[lo],
            iterations: iteration,
            function_evaluations: problem.function_evaluations(),
            end_type,
        })
    }
}
