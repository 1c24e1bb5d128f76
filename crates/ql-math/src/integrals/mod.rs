//! Numerical integration.
//!
//! Adaptive integrators implement [`Integrator`]: they refine until an
//! accuracy target is met and fail with [`Error::Convergence`] once their
//! evaluation budget is spent.  Each integrator records how many integrand
//! evaluations its last run used.  Fixed-order Gaussian rules live in
//! [`gaussian_quadratures`] and tabulated-data rules in [`discrete`].

pub mod discrete;
pub mod gauss_kronrod;
pub mod gauss_lobatto;
pub mod gaussian_quadratures;

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use ql_core::errors::{Error, Result};
use ql_core::Real;

pub use discrete::{discrete_simpson, discrete_trapezoid, DiscreteSimpsonIntegral, DiscreteTrapezoidIntegral};
pub use gauss_kronrod::GaussKronrodAdaptive;
pub use gauss_lobatto::GaussLobattoIntegral;
pub use gaussian_quadratures::GaussianQuadrature;

/// A numerical integrator over a finite interval.
pub trait Integrator {
    /// Integrate `f` over `[a, b]`.
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real>;

    /// Integrand evaluations used by the last call to
    /// [`integrate`][Self::integrate].
    fn number_of_evaluations(&self) -> usize;
}

/// Counts integrand calls during one integration and publishes the total.
#[derive(Debug, Default)]
pub(crate) struct EvaluationCounter {
    last: AtomicUsize,
}

impl EvaluationCounter {
    pub(crate) fn get(&self) -> usize {
        self.last.load(Ordering::Relaxed)
    }

    pub(crate) fn publish(&self, n: usize) {
        self.last.store(n, Ordering::Relaxed);
    }
}

impl Clone for EvaluationCounter {
    fn clone(&self) -> Self {
        Self {
            last: AtomicUsize::new(self.get()),
        }
    }
}

/// Wraps an integrand so that each call increments `count`.
pub(crate) fn counted<'a, F: Fn(Real) -> Real>(
    f: &'a F,
    count: &'a Cell<usize>,
) -> impl Fn(Real) -> Real + 'a {
    move |x| {
        count.set(count.get() + 1);
        f(x)
    }
}

// ── Newton-Cotes with successive halving ─────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NewtonCotes {
    Trapezoid,
    Simpson,
}

fn refine_newton_cotes<F: Fn(Real) -> Real>(
    rule: NewtonCotes,
    f: &F,
    a: Real,
    b: Real,
    accuracy: Real,
    max_evaluations: usize,
    evaluations: &Cell<usize>,
) -> Result<Real> {
    const MIN_REFINEMENTS: usize = 5;
    let g = counted(f, evaluations);
    let mut n = 1usize;
    let mut trapezoid = 0.5 * (b - a) * (g(a) + g(b));
    let mut previous = trapezoid;
    for refinement in 1.. {
        // add the midpoints of the current n intervals
        let h = (b - a) / n as Real;
        let midpoints: Real = (0..n).map(|i| g(a + (i as Real + 0.5) * h)).sum();
        let next_trapezoid = 0.5 * (trapezoid + h * midpoints);
        n *= 2;
        let estimate = match rule {
            NewtonCotes::Trapezoid => next_trapezoid,
            NewtonCotes::Simpson => (4.0 * next_trapezoid - trapezoid) / 3.0,
        };
        trapezoid = next_trapezoid;
        if refinement > MIN_REFINEMENTS && (estimate - previous).abs() <= accuracy {
            return Ok(estimate);
        }
        if evaluations.get() + n > max_evaluations {
            break;
        }
        previous = estimate;
    }
    Err(Error::Convergence(format!(
        "{rule:?} integration: accuracy {accuracy:e} not reached within {max_evaluations} evaluations"
    )))
}

/// Composite Simpson rule refined by interval halving.
#[derive(Debug, Clone)]
pub struct SimpsonIntegral {
    absolute_accuracy: Real,
    max_evaluations: usize,
    evaluations: EvaluationCounter,
}

impl SimpsonIntegral {
    /// Create an integrator with the given accuracy and evaluation budget.
    pub fn new(absolute_accuracy: Real, max_evaluations: usize) -> Self {
        Self {
            absolute_accuracy,
            max_evaluations,
            evaluations: EvaluationCounter::default(),
        }
    }
}

impl Integrator for SimpsonIntegral {
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real> {
        let count = Cell::new(0);
        let result = refine_newton_cotes(
            NewtonCotes::Simpson,
            &f,
            a,
            b,
            self.absolute_accuracy,
            self.max_evaluations,
            &count,
        );
        self.evaluations.publish(count.get());
        result
    }

    fn number_of_evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

/// Composite trapezoid rule refined by interval halving.
#[derive(Debug, Clone)]
pub struct TrapezoidIntegral {
    absolute_accuracy: Real,
    max_evaluations: usize,
    evaluations: EvaluationCounter,
}

impl TrapezoidIntegral {
    /// Create an integrator with the given accuracy and evaluation budget.
    pub fn new(absolute_accuracy: Real, max_evaluations: usize) -> Self {
        Self {
            absolute_accuracy,
            max_evaluations,
            evaluations: EvaluationCounter::default(),
        }
    }
}

impl Integrator for TrapezoidIntegral {
    fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real> {
        let count = Cell::new(0);
        let result = refine_newton_cotes(
            NewtonCotes::Trapezoid,
            &f,
            a,
            b,
            self.absolute_accuracy,
            self.max_evaluations,
            &count,
        );
        self.evaluations.publish(count.get());
        result
    }

    fn number_of_evaluations(&self) -> usize {
        self.evaluations.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn simpson_is_exact_for_cubics() {
        let s = SimpsonIntegral::new(1e-12, 10_000);
        let v = s.integrate(|x| x * x * x - 2.0 * x, 0.0, 2.0).unwrap();
        assert_abs_diff_eq!(v, 0.0, epsilon = 1e-12);
        assert!(s.number_of_evaluations() > 0);
    }

    #[test]
    fn trapezoid_converges_on_smooth_integrand() {
        let t = TrapezoidIntegral::new(1e-8, 100_000);
        let v = t.integrate(|x: Real| x.exp(), 0.0, 1.0).unwrap();
        assert_abs_diff_eq!(v, std::f64::consts::E - 1.0, epsilon = 1e-7);
    }

    #[test]
    fn budget_exhaustion_is_a_convergence_error() {
        let s = SimpsonIntegral::new(1e-15, 50);
        let err = s.integrate(|x: Real| (50.0 * x).sin(), 0.0, 10.0).unwrap_err();
        assert!(err.is_convergence_failure());
        assert!(s.number_of_evaluations() <= 50);
    }
}
