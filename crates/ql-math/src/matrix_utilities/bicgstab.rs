use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real};

use super::IterativeSolution;
use crate::array::Array;

/// Stabilized bi-conjugate gradient solver for `A·x = b` with a
/// matrix-free operator and optional right preconditioner `M ≈ A⁻¹`.
#[derive(Debug, Clone, Copy)]
pub struct BiCGStab {
    max_iterations: usize,
    relative_tolerance: Real,
}

impl BiCGStab {
    /// Solver stopping once `‖b − A·x‖ ≤ relative_tolerance · ‖b‖`.
    pub fn new(max_iterations: usize, relative_tolerance: Real) -> Self {
        Self {
            max_iterations,
            relative_tolerance,
        }
    }

    /// Solve starting from `x0` (zero when `None`).
    pub fn solve<A, M>(
        &self,
        a: A,
        b: &Array,
        x0: Option<&Array>,
        preconditioner: Option<M>,
    ) -> Result<IterativeSolution>
    where
        A: Fn(&Array) -> Array,
        M: Fn(&Array) -> Array,
    {
        let precondition = |v: &Array| match &preconditioner {
            Some(m) => m(v),
            None => v.clone(),
        };
        let b_norm = b.norm();
        if b_norm == 0.0 {
            return Ok(IterativeSolution {
                x: Array::zeros(b.len()),
                iterations: 0,
                residual: 0.0,
            });
        }
        let mut x = match x0 {
            Some(x0) => {
                ensure!(x0.len() == b.len(), "initial guess has the wrong size");
                x0.clone()
            }
            None => Array::zeros(b.len()),
        };
        let mut r = b - &a(&x);
        let r_tilde = r.clone();
        let mut error = r.norm() / b_norm;
        if error < self.relative_tolerance {
            return Ok(IterativeSolution {
                x,
                iterations: 0,
                residual: error,
            });
        }

        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut p = Array::zeros(b.len());
        let mut v = Array::zeros(b.len());
        for iteration in 1..=self.max_iterations {
            let rho_next = r_tilde.dot(&r);
            if rho_next == 0.0 || omega == 0.0 {
                break;
            }
            let beta = (rho_next / rho) * (alpha / omega);
            rho = rho_next;
            p = &r + &(beta * &(&p - &(omega * &v)));

            let p_hat = precondition(&p);
            v = a(&p_hat);
            alpha = rho / r_tilde.dot(&v);
            let s = &r - &(alpha * &v);
            if s.norm() / b_norm < self.relative_tolerance {
                x.axpy(alpha, &p_hat);
                return Ok(IterativeSolution {
                    x,
                    iterations: iteration,
                    residual: s.norm() / b_norm,
                });
            }

            let s_hat = precondition(&s);
            let t = a(&s_hat);
            let tt = t.dot(&t);
            omega = if tt == 0.0 { 0.0 } else { t.dot(&s) / tt };
            x.axpy(alpha, &p_hat);
            x.axpy(omega, &s_hat);
            r = &s - &(omega * &t);
            error = r.norm() / b_norm;
            if error < self.relative_tolerance {
                return Ok(IterativeSolution {
                    x,
                    iterations: iteration,
                    residual: error,
                });
            }
        }
        Err(Error::NonConvergence {
            iterations: self.max_iterations,
            residual: error,
        })
    }
}
