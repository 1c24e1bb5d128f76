//! One-dimensional root finders.
//!
//! Bracketing solvers implement [`Solver1D`]: given a root bracket they
//! iterate to the requested accuracy, and [`Solver1D::solve`] first finds
//! a bracket by expanding outward from a guess.  Exceeding the evaluation
//! budget is an [`Error::Convergence`].

use ql_core::{
    ensure,
    errors::{Error, Result},
    Real,
};

const GROWTH_FACTOR: Real = 1.6;

/// A bracketing root finder.
pub trait Solver1D {
    /// Maximum number of function evaluations per solve.
    fn max_evaluations(&self) -> usize;

    /// Bounds enforced while searching for a bracket.
    fn bounds(&self) -> (Option<Real>, Option<Real>) {
        (None, None)
    }

    /// Find a root of `f` in `[x_min, x_max]`, where `f` changes sign.
    fn solve_bracketed<F: Fn(Real) -> Real>(
        &self,
        f: F,
        accuracy: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real>;

    /// Find a root of `f` near `guess`, expanding a bracket of initial
    /// half-width `step` geometrically until `f` changes sign.
    fn solve<F: Fn(Real) -> Real>(
        &self,
        f: F,
        accuracy: Real,
        guess: Real,
        step: Real,
    ) -> Result<Real> {
        ensure!(accuracy > 0.0, "accuracy must be positive, got {accuracy}");
        ensure!(step > 0.0, "bracketing step must be positive, got {step}");
        let (lower, upper) = self.bounds();
        let clamp = |x: Real| {
            let x = lower.map_or(x, |l| x.max(l));
            upper.map_or(x, |u| x.min(u))
        };
        let mut x_min = clamp(guess - step);
        let mut x_max = clamp(guess + step);
        let mut f_min = f(x_min);
        let mut f_max = f(x_max);
        let mut evaluations = 2;
        while f_min * f_max > 0.0 {
            if evaluations >= self.max_evaluations() {
                return Err(Error::Convergence(format!(
                    "no bracket found within {} evaluations: [{x_min}, {x_max}] -> [{f_min}, {f_max}]",
                    self.max_evaluations()
                )));
            }
            // expand on the side whose value is smaller in magnitude
            if f_min.abs() < f_max.abs() {
                let next = clamp(x_min + GROWTH_FACTOR * (x_min - x_max));
                if next == x_min {
                    break;
                }
                x_min = next;
                f_min = f(x_min);
            } else {
                let next = clamp(x_max + GROWTH_FACTOR * (x_max - x_min));
                if next == x_max {
                    break;
                }
                x_max = next;
                f_max = f(x_max);
            }
            evaluations += 1;
        }
        self.solve_bracketed(f, accuracy, x_min, x_max)
    }
}

fn check_bracket(x_min: Real, x_max: Real, f_min: Real, f_max: Real) -> Result<()> {
    ensure!(x_min < x_max, "invalid range: x_min ({x_min}) >= x_max ({x_max})");
    ensure!(
        f_min * f_max <= 0.0,
        "root not bracketed: f[{x_min}, {x_max}] -> [{f_min:e}, {f_max:e}]"
    );
    Ok(())
}

fn budget_exhausted(name: &str, max_evaluations: usize) -> Error {
    Error::Convergence(format!(
        "{name}: maximum number of function evaluations ({max_evaluations}) exceeded"
    ))
}

// ── Brent ─────────────────────────────────────────────────────────────────────

/// Brent's method: inverse quadratic interpolation safeguarded by bisection.
#[derive(Debug, Clone, Copy)]
pub struct Brent {
    max_evaluations: usize,
    lower_bound: Option<Real>,
    upper_bound: Option<Real>,
}

impl Default for Brent {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Brent {
    /// Solver with the given evaluation budget.
    pub fn new(max_evaluations: usize) -> Self {
        Self {
            max_evaluations,
            lower_bound: None,
            upper_bound: None,
        }
    }

    /// Keep bracket expansion at or above `lower`.
    pub fn with_lower_bound(mut self, lower: Real) -> Self {
        self.lower_bound = Some(lower);
        self
    }

    /// Keep bracket expansion at or below `upper`.
    pub fn with_upper_bound(mut self, upper: Real) -> Self {
        self.upper_bound = Some(upper);
        self
    }
}

impl Solver1D for Brent {
    fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    fn bounds(&self) -> (Option<Real>, Option<Real>) {
        (self.lower_bound, self.upper_bound)
    }

    fn solve_bracketed<F: Fn(Real) -> Real>(
        &self,
        f: F,
        accuracy: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real> {
        let mut a = x_min;
        let mut b = x_max;
        let mut fa = f(a);
        let mut fb = f(b);
        check_bracket(a, b, fa, fb)?;
        if fa == 0.0 {
            return Ok(a);
        }
        if fb == 0.0 {
            return Ok(b);
        }

        let mut c = b;
        let mut fc = fb;
        let mut d = b - a;
        let mut e = d;

        for _ in 2..self.max_evaluations {
            if fb * fc > 0.0 {
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }
            let tol = 2.0 * Real::EPSILON * b.abs() + 0.5 * accuracy;
            let xm = 0.5 * (c - b);
            if xm.abs() <= tol || fb == 0.0 {
                return Ok(b);
            }
            if e.abs() >= tol && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (p, q) = if a == c {
                    (2.0 * xm * s, 1.0 - s)
                } else {
                    let q = fa / fc;
                    let r = fb / fc;
                    (
                        s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                        (q - 1.0) * (r - 1.0) * (s - 1.0),
                    )
                };
                let (p, q) = if p > 0.0 { (p, -q) } else { (-p, q) };
                if 2.0 * p < (3.0 * xm * q - (tol * q).abs()).min((e * q).abs()) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }
            a = b;
            fa = fb;
            b += if d.abs() > tol { d } else { tol.copysign(xm) };
            fb = f(b);
        }
        Err(budget_exhausted("Brent", self.max_evaluations))
    }
}

// ── Bisection ─────────────────────────────────────────────────────────────────

/// Interval halving.
#[derive(Debug, Clone, Copy)]
pub struct Bisection {
    max_evaluations: usize,
}

impl Default for Bisection {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Bisection {
    /// Solver with the given evaluation budget.
    pub fn new(max_evaluations: usize) -> Self {
        Self { max_evaluations }
    }
}

impl Solver1D for Bisection {
    fn max_evaluations(&self) -> usize {
        self.max_evaluations
    }

    fn solve_bracketed<F: Fn(Real) -> Real>(
        &self,
        f: F,
        accuracy: Real,
        x_min: Real,
        x_max: Real,
    ) -> Result<Real> {
        let f_min = f(x_min);
        let f_max = f(x_max);
        check_bracket(x_min, x_max, f_min, f_max)?;
        if f_min == 0.0 {
            return Ok(x_min);
        }
        if f_max == 0.0 {
            return Ok(x_max);
        }
        // orient so that f(root) - f(x) changes sign at root going from x to x + dx
        let (mut root, mut dx) = if f_min < 0.0 {
            (x_min, x_max - x_min)
        } else {
            (x_max, x_min - x_max)
        };
        for _ in 2..self.max_evaluations {
            dx *= 0.5;
            let mid = root + dx;
            let f_mid = f(mid);
            if f_mid <= 0.0 {
                root = mid;
            }
            if dx.abs() < accuracy || f_mid == 0.0 {
                return Ok(root);
            }
        }
        Err(budget_exhausted("Bisection", self.max_evaluations))
    }
}

// ── Newton-safe ───────────────────────────────────────────────────────────────

/// Newton-Raphson safeguarded by bisection; the function supplies its own
/// derivative.
#[derive(Debug, Clone, Copy)]
pub struct NewtonSafe {
    max_evaluations: usize,
}

impl Default for NewtonSafe {
    fn default() -> Self {
        Self::new(100)
    }
}

impl NewtonSafe {
    /// Solver with the given evaluation budget.
    pub fn new(max_evaluations: usize) -> Self {
        Self { max_evaluations }
    }

    /// Find a root in `[x_min, x_max]` of the function whose value and
    /// derivative are returned together by `f_df`.
    pub fn solve_bracketed<F>(&self, f_df: F, accuracy: Real, x_min: Real, x_max: Real) -> Result<Real>
    where
        F: Fn(Real) -> (Real, Real),
    {
        let (f_min, _) = f_df(x_min);
        let (f_max, _) = f_df(x_max);
        check_bracket(x_min, x_max, f_min, f_max)?;
        if f_min == 0.0 {
            return Ok(x_min);
        }
        if f_max == 0.0 {
            return Ok(x_max);
        }
        // xl is the end where f is negative
        let (mut xl, mut xh) = if f_min < 0.0 { (x_min, x_max) } else { (x_max, x_min) };
        let mut root = 0.5 * (x_min + x_max);
        let mut dx_old = (x_max - x_min).abs();
        let mut dx = dx_old;
        let (mut fx, mut dfx) = f_df(root);

        for _ in 3..self.max_evaluations {
            let out_of_range = ((root - xh) * dfx - fx) * ((root - xl) * dfx - fx) > 0.0;
            let too_slow = (2.0 * fx).abs() > (dx_old * dfx).abs();
            dx_old = dx;
            if out_of_range || too_slow {
                dx = 0.5 * (xh - xl);
                root = xl + dx;
            } else {
                dx = fx / dfx;
                root -= dx;
            }
            if dx.abs() < accuracy {
                return Ok(root);
            }
            (fx, dfx) = f_df(root);
            if fx < 0.0 {
                xl = root;
            } else {
                xh = root;
            }
        }
        Err(budget_exhausted("NewtonSafe", self.max_evaluations))
    }
}
