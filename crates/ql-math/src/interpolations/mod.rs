//! One- and two-dimensional interpolation on strictly increasing grids.
//!
//! Outside the node range, one-dimensional schemes extend their first or
//! last segment; callers that must not extrapolate check
//! [`Interpolation::is_in_range`].

pub mod bilinear;
pub mod cubic;

use ql_core::{ensure, errors::Result, Real};

pub use bilinear::BilinearInterpolation;
pub use cubic::CubicNaturalSpline;

/// A real function of one variable defined by nodes.
pub trait Interpolation: std::fmt::Debug + Send + Sync {
    /// Value at `x`.
    fn value(&self, x: Real) -> Real;

    /// First derivative at `x`.
    fn derivative(&self, x: Real) -> Real;

    /// Second derivative at `x`.
    fn second_derivative(&self, _x: Real) -> Real {
        0.0
    }

    /// First node.
    fn x_min(&self) -> Real;

    /// Last node.
    fn x_max(&self) -> Real;

    /// `true` if `x` lies within the nodes, up to rounding.
    fn is_in_range(&self, x: Real) -> bool {
        let tolerance = 1e-12 * (self.x_max() - self.x_min()).abs().max(1.0);
        x >= self.x_min() - tolerance && x <= self.x_max() + tolerance
    }
}

pub(crate) fn check_nodes(xs: &[Real], ys: &[Real], min_points: usize) -> Result<()> {
    ensure!(
        xs.len() >= min_points,
        "interpolation needs at least {min_points} points, got {}",
        xs.len()
    );
    ensure!(
        xs.len() == ys.len(),
        "{} abscissae but {} ordinates",
        xs.len(),
        ys.len()
    );
    ensure!(
        xs.windows(2).all(|w| w[1] > w[0]),
        "abscissae must be strictly increasing"
    );
    Ok(())
}

/// Index `i` of the segment `[xs[i], xs[i+1]]` used for `x`, clamped to the
/// first and last segments.
pub(crate) fn locate(xs: &[Real], x: Real) -> usize {
    let n = xs.len();
    if x <= xs[0] {
        0
    } else if x >= xs[n - 1] {
        n - 2
    } else {
        xs.partition_point(|&node| node <= x) - 1
    }
}

// ── Linear ────────────────────────────────────────────────────────────────────

/// Piecewise linear interpolation.
#[derive(Debug, Clone)]
pub struct LinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl LinearInterpolation {
    /// Interpolate `ys` over `xs`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_nodes(xs, ys, 2)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }

    fn slope(&self, i: usize) -> Real {
        (self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i])
    }
}

impl Interpolation for LinearInterpolation {
    fn value(&self, x: Real) -> Real {
        let i = locate(&self.xs, x);
        self.ys[i] + (x - self.xs[i]) * self.slope(i)
    }

    fn derivative(&self, x: Real) -> Real {
        self.slope(locate(&self.xs, x))
    }

    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }
}

// ── Log-linear ────────────────────────────────────────────────────────────────

/// Linear interpolation of `ln y`; suited to discount factors.
#[derive(Debug, Clone)]
pub struct LogLinearInterpolation {
    log: LinearInterpolation,
}

impl LogLinearInterpolation {
    /// Interpolate the strictly positive `ys` over `xs`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        ensure!(
            ys.iter().all(|&y| y > 0.0),
            "log-linear interpolation needs positive values"
        );
        let logs: Vec<Real> = ys.iter().map(|y| y.ln()).collect();
        Ok(Self {
            log: LinearInterpolation::new(xs, &logs)?,
        })
    }
}

impl Interpolation for LogLinearInterpolation {
    fn value(&self, x: Real) -> Real {
        self.log.value(x).exp()
    }

    fn derivative(&self, x: Real) -> Real {
        self.value(x) * self.log.derivative(x)
    }

    fn second_derivative(&self, x: Real) -> Real {
        let slope = self.log.derivative(x);
        self.value(x) * slope * slope
    }

    fn x_min(&self) -> Real {
        self.log.x_min()
    }

    fn x_max(&self) -> Real {
        self.log.x_max()
    }
}

// ── Backward flat ─────────────────────────────────────────────────────────────

/// Piecewise constant interpolation: on `(xs[i-1], xs[i]]` the value is
/// `ys[i]`, before the first node it is `ys[0]`.
#[derive(Debug, Clone)]
pub struct BackwardFlatInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
}

impl BackwardFlatInterpolation {
    /// Interpolate `ys` over `xs`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_nodes(xs, ys, 1)?;
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
        })
    }
}

impl Interpolation for BackwardFlatInterpolation {
    fn value(&self, x: Real) -> Real {
        let i = self.xs.partition_point(|&node| node < x);
        self.ys[i.min(self.ys.len() - 1)]
    }

    fn derivative(&self, _x: Real) -> Real {
        0.0
    }

    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }
}
