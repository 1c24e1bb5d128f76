//! Integration rules on tabulated data.
//!
//! [`discrete_trapezoid`] and [`discrete_simpson`] integrate values already
//! sampled on an arbitrary ascending grid.  The [`Integrator`] wrappers
//! sample a function on a uniform grid of fixed size and apply the same
//! rules, so they never refine and never fail on accuracy.

use std::cell::Cell;

use ql_core::errors::Result;
use ql_core::{ensure, Real};

use super::{counted, EvaluationCounter, Integrator};

fn check_grid(x: &[Real], f: &[Real]) -> Result<()> {
    ensure!(
        x.len() == f.len(),
        "abscissae ({}) and ordinates ({}) differ in length",
        x.len(),
        f.len()
    );
    Ok(())
}

/// Composite trapezoid rule on sampled data.
pub fn discrete_trapezoid(x: &[Real], f: &[Real]) -> Result<Real> {
    check_grid(x, f)?;
    Ok(x.windows(2)
        .zip(f.windows(2))
        .map(|(x, f)| 0.5 * (x[1] - x[0]) * (f[0] + f[1]))
        .sum())
}

/// Composite Simpson rule on sampled data with non-uniform spacing.
///
/// Consecutive panel pairs are integrated by the quadratic through their
/// three points; with an odd number of panels the last one falls back to
/// the trapezoid rule.
pub fn discrete_simpson(x: &[Real], f: &[Real]) -> Result<Real> {
    check_grid(x, f)?;
    let n = x.len();
    if n < 3 {
        return discrete_trapezoid(x, f);
    }
    let mut sum = 0.0;
    let mut j = 0;
    while j + 2 < n {
        let h0 = x[j + 1] - x[j];
        let h1 = x[j + 2] - x[j + 1];
        let h = h0 + h1;
        sum += h / 6.0
            * ((2.0 - h1 / h0) * f[j] + h * h / (h0 * h1) * f[j + 1] + (2.0 - h0 / h1) * f[j + 2]);
        j += 2;
    }
    if n % 2 == 0 {
        sum += 0.5 * (x[n - 1] - x[n - 2]) * (f[n - 1] + f[n - 2]);
    }
    Ok(sum)
}

macro_rules! uniform_grid_integral {
    ($(#[$doc:meta])* $name:ident, $rule:ident, $min:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            evaluations_per_run: usize,
            evaluations: EvaluationCounter,
        }

        impl $name {
            /// Sample on `evaluations` equally spaced points.
            pub fn new(evaluations: usize) -> Result<Self> {
                ensure!(
                    evaluations >= $min,
                    "{} needs at least {} points, got {evaluations}",
                    stringify!($name),
                    $min
                );
                Ok(Self {
                    evaluations_per_run: evaluations,
                    evaluations: EvaluationCounter::default(),
                })
            }
        }

        impl Integrator for $name {
            fn integrate<F: Fn(Real) -> Real>(&self, f: F, a: Real, b: Real) -> Result<Real> {
                let count = Cell::new(0);
                let g = counted(&f, &count);
                let n = self.evaluations_per_run;
                let h = (b - a) / (n - 1) as Real;
                let x: Vec<Real> = (0..n).map(|i| a + i as Real * h).collect();
                let y: Vec<Real> = x.iter().map(|&x| g(x)).collect();
                let result = $rule(&x, &y);
                self.evaluations.publish(count.get());
                result
            }

            fn number_of_evaluations(&self) -> usize {
                self.evaluations.get()
            }
        }
    };
}

uniform_grid_integral!(
    /// Trapezoid rule on a fixed uniform grid.
    DiscreteTrapezoidIntegral,
    discrete_trapezoid,
    2
);

uniform_grid_integral!(
    /// Simpson rule on a fixed uniform grid.
    DiscreteSimpsonIntegral,
    discrete_simpson,
    3
);

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    #[test]
    fn trapezoid_exact_for_linear_data() {
        let x = [0.0, 0.25, 0.5, 0.75, 1.0];
        assert_abs_diff_eq!(discrete_trapezoid(&x, &x).unwrap(), 0.5, epsilon = 1e-15);
    }

    #[test]
    fn simpson_handles_uneven_spacing() {
        let x = [0.0, 0.3, 0.7, 0.8, 1.0];
        let f: Vec<Real> = x.iter().map(|x| x * x).collect();
        // two quadratic panels, exact
        assert_abs_diff_eq!(discrete_simpson(&x, &f).unwrap(), 1.0 / 3.0, epsilon = 1e-14);
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        assert!(discrete_simpson(&[0.0, 1.0], &[1.0]).is_err());
    }

    #[test]
    fn uniform_integrators_count_evaluations() {
        let simpson = DiscreteSimpsonIntegral::new(101).unwrap();
        let v = simpson.integrate(|x: Real| x.sin(), 0.0, PI).unwrap();
        assert_abs_diff_eq!(v, 2.0, epsilon = 1e-7);
        assert_eq!(simpson.number_of_evaluations(), 101);

        let trapezoid = DiscreteTrapezoidIntegral::new(2001).unwrap();
        let v = trapezoid.integrate(|x: Real| x.sin(), 0.0, PI).unwrap();
        assert_abs_diff_eq!(v, 2.0, epsilon = 1e-6);
        assert!(DiscreteTrapezoidIntegral::new(1).is_err());
    }
}
