use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real};

use super::IterativeSolution;
use crate::array::Array;

/// Generalized minimal residual solver with Givens-rotation least squares
/// and optional restarts.
///
/// Each cycle builds a Krylov basis of at most `max_iterations` vectors.
/// [`solve_with_restart`][Self::solve_with_restart] repeats the cycle from
/// the last iterate, bounding memory at the cost of slower convergence.
#[derive(Debug, Clone, Copy)]
pub struct Gmres {
    max_iterations: usize,
    relative_tolerance: Real,
}

impl Gmres {
    /// Solver stopping once `‖b − A·x‖ ≤ relative_tolerance · ‖b‖`.
    pub fn new(max_iterations: usize, relative_tolerance: Real) -> Self {
        Self {
            max_iterations,
            relative_tolerance,
        }
    }

    /// A single cycle from `x0` (zero when `None`).
    pub fn solve<A>(&self, a: A, b: &Array, x0: Option<&Array>) -> Result<IterativeSolution>
    where
        A: Fn(&Array) -> Array,
    {
        self.solve_with_restart(1, a, b, x0)
    }

    /// Up to `restarts` cycles, each restarting from the previous iterate.
    pub fn solve_with_restart<A>(
        &self,
        restarts: usize,
        a: A,
        b: &Array,
        x0: Option<&Array>,
    ) -> Result<IterativeSolution>
    where
        A: Fn(&Array) -> Array,
    {
        ensure!(restarts > 0, "GMRES needs at least one cycle");
        let mut x = match x0 {
            Some(x0) => {
                ensure!(x0.len() == b.len(), "initial guess has the wrong size");
                x0.clone()
            }
            None => Array::zeros(b.len()),
        };
        let b_norm = b.norm();
        if b_norm == 0.0 {
            return Ok(IterativeSolution {
                x: Array::zeros(b.len()),
                iterations: 0,
                residual: 0.0,
            });
        }
        let mut total = 0;
        let mut residual = Real::INFINITY;
        for _ in 0..restarts {
            let (next, iterations, reached) = self.cycle(&a, b, b_norm, &x);
            x = next;
            total += iterations;
            residual = reached;
            if residual < self.relative_tolerance {
                return Ok(IterativeSolution {
                    x,
                    iterations: total,
                    residual,
                });
            }
        }
        Err(Error::NonConvergence {
            iterations: total,
            residual,
        })
    }

    fn cycle<A: Fn(&Array) -> Array>(
        &self,
        a: &A,
        b: &Array,
        b_norm: Real,
        x0: &Array,
    ) -> (Array, usize, Real) {
        let m = self.max_iterations;
        let r = b - &a(x0);
        let beta = r.norm();
        if beta / b_norm < self.relative_tolerance {
            return (x0.clone(), 0, beta / b_norm);
        }

        let mut basis = vec![&r / beta];
        // h[j] is column j of the Hessenberg matrix, already rotated
        let mut h: Vec<Vec<Real>> = Vec::with_capacity(m);
        let mut rotations: Vec<(Real, Real)> = Vec::with_capacity(m);
        let mut g = vec![beta];
        let mut residual = beta / b_norm;

        for j in 0..m {
            let mut w = a(&basis[j]);
            let mut column = Vec::with_capacity(j + 2);
            for v in &basis {
                let hij = w.dot(v);
                w.axpy(-hij, v);
                column.push(hij);
            }
            let h_next = w.norm();
            column.push(h_next);

            for (i, &(c, s)) in rotations.iter().enumerate() {
                let (hi, hk) = (column[i], column[i + 1]);
                column[i] = c * hi + s * hk;
                column[i + 1] = -s * hi + c * hk;
            }
            let denom = column[j].hypot(column[j + 1]);
            let (c, s) = if denom == 0.0 {
                (1.0, 0.0)
            } else {
                (column[j] / denom, column[j + 1] / denom)
            };
            column[j] = denom;
            column[j + 1] = 0.0;
            rotations.push((c, s));
            g.push(-s * g[j]);
            g[j] *= c;
            h.push(column);

            residual = g[j + 1].abs() / b_norm;
            if residual < self.relative_tolerance || h_next == 0.0 {
                break;
            }
            basis.push(&w / h_next);
        }

        // back substitution on the rotated upper triangle
        let k = h.len();
        let mut y = vec![0.0; k];
        for i in (0..k).rev() {
            let tail: Real = (i + 1..k).map(|c| h[c][i] * y[c]).sum();
            y[i] = if h[i][i] == 0.0 { 0.0 } else { (g[i] - tail) / h[i][i] };
        }
        let mut x = x0.clone();
        for (yi, v) in y.iter().zip(&basis) {
            x.axpy(*yi, v);
        }
        (x, k, residual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Matrix;

    fn nonsymmetric(n: usize) -> Matrix {
        Matrix::from_fn(n, n, |i, j| {
            if i == j {
                3.0
            } else if j == i + 1 {
                -1.2
            } else if i == j + 1 {
                -0.6
            } else {
                0.0
            }
        })
    }

    #[test]
    fn full_krylov_space_solves_exactly() {
        let a = nonsymmetric(12);
        let x_true = Array::from_fn(12, |i| 1.0 + i as Real);
        let b = a.mul_array(&x_true);
        let solution = Gmres::new(12, 1e-12).solve(|x: &Array| a.mul_array(x), &b, None).unwrap();
        assert!((&solution.x - &x_true).max_abs() < 1e-9);
        assert!(solution.iterations <= 12);
    }

    #[test]
    fn restarts_make_up_for_a_small_basis() {
        let a = nonsymmetric(40);
        let b = Array::from_element(40, 1.0);
        let op = |x: &Array| a.mul_array(x);
        assert!(Gmres::new(3, 1e-10).solve(op, &b, None).is_err());
        let solution = Gmres::new(3, 1e-10).solve_with_restart(100, op, &b, None).unwrap();
        let residual = (&a.mul_array(&solution.x) - &b).norm() / b.norm();
        assert!(residual < 1e-9);
    }
}
