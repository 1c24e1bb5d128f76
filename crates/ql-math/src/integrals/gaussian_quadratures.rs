//! Fixed-order Gaussian quadratures.
//!
//! Nodes are the eigenvalues of the Jacobi matrix of the orthogonal
//! polynomial family (Golub-Welsch).  Weights come from the orthonormal
//! three-term recurrence evaluated at each node, which stays accurate far
//! out in the tails where eigenvector components underflow.
//!
//! Weights are divided by the family's weight function, so
//! [`GaussianQuadrature::integrate`] approximates the plain integral of `f`
//! over the family's domain: `[-1, 1]` for Legendre and Chebyshev,
//! `[0, ∞)` for Laguerre and `(-∞, ∞)` for Hermite.

use nalgebra::{DMatrix, SymmetricEigen};
use ql_core::errors::Result;
use ql_core::{ensure, Real};
use statrs::function::gamma::ln_gamma;
use std::f64::consts::PI;

/// A set of quadrature nodes and weights.
#[derive(Debug, Clone, PartialEq)]
pub struct GaussianQuadrature {
    x: Vec<Real>,
    w: Vec<Real>,
}

impl GaussianQuadrature {
    /// Gauss-Legendre rule of order `n` on `[-1, 1]`.
    pub fn legendre(n: usize) -> Result<Self> {
        let beta = |k: usize| {
            let k = k as Real;
            k / (4.0 * k * k - 1.0).sqrt()
        };
        Self::golub_welsch(n, |_| 0.0, beta, 2.0_f64.ln(), |_| 0.0)
    }

    /// Generalized Gauss-Laguerre rule of order `n` for the weight
    /// `x^s e^{-x}` on `[0, ∞)`.
    pub fn laguerre(n: usize, s: Real) -> Result<Self> {
        ensure!(s > -1.0, "Gauss-Laguerre parameter s must exceed -1, got {s}");
        Self::golub_welsch(
            n,
            |k| 2.0 * k as Real + 1.0 + s,
            |k| (k as Real * (k as Real + s)).sqrt(),
            ln_gamma(s + 1.0),
            |x| s * x.ln() - x,
        )
    }

    /// Gauss-Hermite rule of order `n` for the weight `e^{-x²}`.
    pub fn hermite(n: usize) -> Result<Self> {
        Self::golub_welsch(
            n,
            |_| 0.0,
            |k| (0.5 * k as Real).sqrt(),
            0.5 * PI.ln(),
            |x| -x * x,
        )
    }

    /// Gauss-Chebyshev rule (first kind) of order `n` on `[-1, 1]`.
    pub fn chebyshev(n: usize) -> Result<Self> {
        ensure!(n > 0, "quadrature order must be positive");
        let (x, w) = (1..=n)
            .map(|i| {
                let theta = (2 * i - 1) as Real * PI / (2 * n) as Real;
                (theta.cos(), PI / n as Real * theta.sin())
            })
            .unzip();
        Ok(Self { x, w })
    }

    /// Gauss-Chebyshev rule (second kind) of order `n` on `[-1, 1]`.
    pub fn chebyshev_2nd(n: usize) -> Result<Self> {
        ensure!(n > 0, "quadrature order must be positive");
        let (x, w) = (1..=n)
            .map(|i| {
                let theta = i as Real * PI / (n + 1) as Real;
                (theta.cos(), PI / (n + 1) as Real * theta.sin())
            })
            .unzip();
        Ok(Self { x, w })
    }

    /// Golub-Welsch construction from the recurrence coefficients `alpha`
    /// (diagonal) and `beta` (sub-diagonal, `beta(k)` couples `k-1` and `k`),
    /// the log of the weight function's total mass and its log-density.
    fn golub_welsch(
        n: usize,
        alpha: impl Fn(usize) -> Real,
        beta: impl Fn(usize) -> Real,
        ln_mu0: Real,
        ln_weight: impl Fn(Real) -> Real,
    ) -> Result<Self> {
        ensure!(n > 0, "quadrature order must be positive");
        let jacobi = DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                alpha(i)
            } else if i + 1 == j {
                beta(j)
            } else if j + 1 == i {
                beta(i)
            } else {
                0.0
            }
        });
        let mut x: Vec<Real> = SymmetricEigen::new(jacobi).eigenvalues.iter().copied().collect();
        x.sort_by(|a, b| a.total_cmp(b));

        let w = x
            .iter()
            .map(|&xi| {
                // sum of squared orthonormal polynomials, rescaled on the fly
                let (mut p_prev, mut p) = (0.0, 1.0);
                let mut ln_scale = -0.5 * ln_mu0;
                let mut sum = 1.0;
                for k in 0..n - 1 {
                    let next = ((xi - alpha(k)) * p - if k > 0 { beta(k) * p_prev } else { 0.0 })
                        / beta(k + 1);
                    p_prev = p;
                    p = next;
                    sum += p * p;
                    if sum > 1e100 {
                        let s = sum.sqrt();
                        p /= s;
                        p_prev /= s;
                        sum = 1.0;
                        ln_scale += s.ln();
                    }
                }
                // weight = 1 / (scale² · sum), divided by the weight function
                (-(2.0 * ln_scale + sum.ln()) - ln_weight(xi)).exp()
            })
            .collect();
        Ok(Self { x, w })
    }

    /// Number of nodes.
    pub fn order(&self) -> usize {
        self.x.len()
    }

    /// Nodes in ascending order.
    pub fn nodes(&self) -> &[Real] {
        &self.x
    }

    /// Weights matching [`nodes`][Self::nodes].
    pub fn weights(&self) -> &[Real] {
        &self.w
    }

    /// Apply the rule to `f` on the family's own domain.
    pub fn integrate<F: Fn(Real) -> Real>(&self, f: F) -> Real {
        self.x.iter().zip(&self.w).map(|(&x, &w)| w * f(x)).sum()
    }

    /// Apply a rule defined on `[-1, 1]` to `[a, b]` by an affine map.
    pub fn integrate_on<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Real {
        let (c, h) = (0.5 * (a + b), 0.5 * (b - a));
        h * self.integrate(|x| f(c + h * x))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn legendre_exact_for_polynomials() {
        let q = GaussianQuadrature::legendre(6).unwrap();
        assert_abs_diff_eq!(q.weights().iter().sum::<Real>(), 2.0, epsilon = 1e-14);
        assert_abs_diff_eq!(q.integrate(|x| x.powi(10)), 2.0 / 11.0, epsilon = 1e-14);
        assert_abs_diff_eq!(q.integrate_on(|x| x * x, 0.0, 3.0), 9.0, epsilon = 1e-13);
    }

    #[test]
    fn laguerre_integrates_exponential_tail() {
        let q = GaussianQuadrature::laguerre(32, 0.0).unwrap();
        // ∫₀^∞ x² e^{-x} dx = 2
        assert_abs_diff_eq!(q.integrate(|x| x * x * (-x).exp()), 2.0, epsilon = 1e-12);
        // ∫₀^∞ e^{-2x} dx = 1/2, not polynomial times e^{-x}
        assert_abs_diff_eq!(q.integrate(|x| (-2.0 * x).exp()), 0.5, epsilon = 1e-10);
    }

    #[test]
    fn high_order_laguerre_weights_stay_finite() {
        let q = GaussianQuadrature::laguerre(128, 0.0).unwrap();
        assert!(q.weights().iter().all(|w| w.is_finite() && *w > 0.0));
        assert_abs_diff_eq!(q.integrate(|x| (-x).exp()), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn hermite_gaussian_moments() {
        let q = GaussianQuadrature::hermite(20).unwrap();
        let pi_sqrt = PI.sqrt();
        assert_abs_diff_eq!(q.integrate(|x| (-x * x).exp()), pi_sqrt, epsilon = 1e-12);
        assert_abs_diff_eq!(q.integrate(|x| x * x * (-x * x).exp()), 0.5 * pi_sqrt, epsilon = 1e-12);
    }

    #[test]
    fn chebyshev_rules() {
        let q1 = GaussianQuadrature::chebyshev(64).unwrap();
        let q2 = GaussianQuadrature::chebyshev_2nd(64).unwrap();
        let exact = 2.0 * 1.0_f64.sinh();
        assert_abs_diff_eq!(q1.integrate(|x: Real| x.exp()), exact, epsilon = 1e-3);
        assert_abs_diff_eq!(q2.integrate(|x: Real| x.exp()), exact, epsilon = 1e-3);
        // exact for polynomials times the Chebyshev weight
        assert_abs_diff_eq!(
            q1.integrate(|x: Real| x * x / (1.0 - x * x).sqrt()),
            0.5 * PI,
            epsilon = 1e-12
        );
    }
}
