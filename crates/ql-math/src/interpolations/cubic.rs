use ql_core::{errors::Result, Real};

use super::{check_nodes, locate, Interpolation};

/// Natural cubic spline: twice continuously differentiable, with zero
/// second derivative at both ends.
#[derive(Debug, Clone)]
pub struct CubicNaturalSpline {
    xs: Vec<Real>,
    ys: Vec<Real>,
    /// Second derivatives at the nodes.
    m: Vec<Real>,
}

impl CubicNaturalSpline {
    /// Spline through `(xs, ys)`.
    pub fn new(xs: &[Real], ys: &[Real]) -> Result<Self> {
        check_nodes(xs, ys, 2)?;
        let n = xs.len();
        let mut m = vec![0.0; n];
        if n > 2 {
            // Thomas algorithm on the interior equations
            let h: Vec<Real> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let mut diag = vec![0.0; n];
            let mut rhs = vec![0.0; n];
            for i in 1..n - 1 {
                diag[i] = 2.0 * (h[i - 1] + h[i]);
                rhs[i] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
            }
            for i in 2..n - 1 {
                let factor = h[i - 1] / diag[i - 1];
                diag[i] -= factor * h[i - 1];
                rhs[i] -= factor * rhs[i - 1];
            }
            m[n - 2] = rhs[n - 2] / diag[n - 2];
            for i in (1..n - 2).rev() {
                m[i] = (rhs[i] - h[i] * m[i + 1]) / diag[i];
            }
        }
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            m,
        })
    }

    fn segment(&self, x: Real) -> (usize, Real, Real, Real) {
        let i = locate(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;
        (i, h, a, b)
    }
}

impl Interpolation for CubicNaturalSpline {
    fn value(&self, x: Real) -> Real {
        let (i, h, a, b) = self.segment(x);
        a * self.ys[i]
            + b * self.ys[i + 1]
            + ((a * a * a - a) * self.m[i] + (b * b * b - b) * self.m[i + 1]) * h * h / 6.0
    }

    fn derivative(&self, x: Real) -> Real {
        let (i, h, a, b) = self.segment(x);
        (self.ys[i + 1] - self.ys[i]) / h
            - (3.0 * a * a - 1.0) / 6.0 * h * self.m[i]
            + (3.0 * b * b - 1.0) / 6.0 * h * self.m[i + 1]
    }

    fn second_derivative(&self, x: Real) -> Real {
        let (i, _, a, b) = self.segment(x);
        a * self.m[i] + b * self.m[i + 1]
    }

    fn x_min(&self) -> Real {
        self.xs[0]
    }

    fn x_max(&self) -> Real {
        self.xs[self.xs.len() - 1]
    }
}
