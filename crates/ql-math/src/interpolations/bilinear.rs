use ql_core::{ensure, errors::Result, Real};

use super::{check_nodes, locate};

/// Bilinear interpolation of `z = f(x, y)` on a rectangular grid.
///
/// `z` is row-major in `y`: `z[j * xs.len() + i] = f(xs[i], ys[j])`, which
/// is the layout of a two-dimensional finite-difference solution with `x`
/// as the fastest-varying direction.
#[derive(Debug, Clone)]
pub struct BilinearInterpolation {
    xs: Vec<Real>,
    ys: Vec<Real>,
    z: Vec<Real>,
}

impl BilinearInterpolation {
    /// Interpolate `z` over the grid `xs × ys`.
    pub fn new(xs: &[Real], ys: &[Real], z: &[Real]) -> Result<Self> {
        check_nodes(xs, xs, 2)?;
        check_nodes(ys, ys, 2)?;
        ensure!(
            z.len() == xs.len() * ys.len(),
            "{} values for a {}x{} grid",
            z.len(),
            xs.len(),
            ys.len()
        );
        Ok(Self {
            xs: xs.to_vec(),
            ys: ys.to_vec(),
            z: z.to_vec(),
        })
    }

    fn z(&self, i: usize, j: usize) -> Real {
        self.z[j * self.xs.len() + i]
    }

    fn weights(&self, x: Real, y: Real) -> (usize, usize, Real, Real) {
        let i = locate(&self.xs, x);
        let j = locate(&self.ys, y);
        let t = (x - self.xs[i]) / (self.xs[i + 1] - self.xs[i]);
        let u = (y - self.ys[j]) / (self.ys[j + 1] - self.ys[j]);
        (i, j, t, u)
    }

    /// Value at `(x, y)`.
    pub fn value(&self, x: Real, y: Real) -> Real {
        let (i, j, t, u) = self.weights(x, y);
        (1.0 - t) * (1.0 - u) * self.z(i, j)
            + t * (1.0 - u) * self.z(i + 1, j)
            + (1.0 - t) * u * self.z(i, j + 1)
            + t * u * self.z(i + 1, j + 1)
    }

    /// `∂f/∂x` at `(x, y)`.
    pub fn derivative_x(&self, x: Real, y: Real) -> Real {
        let (i, j, _, u) = self.weights(x, y);
        let h = self.xs[i + 1] - self.xs[i];
        ((1.0 - u) * (self.z(i + 1, j) - self.z(i, j)) + u * (self.z(i + 1, j + 1) - self.z(i, j + 1))) / h
    }

    /// `true` if `(x, y)` lies within the grid.
    pub fn is_in_range(&self, x: Real, y: Real) -> bool {
        let (nx, ny) = (self.xs.len(), self.ys.len());
        x >= self.xs[0] && x <= self.xs[nx - 1] && y >= self.ys[0] && y <= self.ys[ny - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn reproduces_bilinear_functions() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 2.0];
        let f = |x: Real, y: Real| 1.0 + 2.0 * x - y + 0.5 * x * y;
        let z: Vec<Real> = ys.iter().flat_map(|&y| xs.iter().map(move |&x| f(x, y))).collect();
        let interp = BilinearInterpolation::new(&xs, &ys, &z).unwrap();
        assert_abs_diff_eq!(interp.value(2.0, 0.5), f(2.0, 0.5), epsilon = 1e-14);
        assert_abs_diff_eq!(interp.derivative_x(2.0, 0.5), 2.0 + 0.25, epsilon = 1e-14);
        assert!(interp.is_in_range(3.0, 2.0));
        assert!(!interp.is_in_range(3.1, 1.0));
    }

    #[test]
    fn grid_size_is_checked() {
        assert!(BilinearInterpolation::new(&[0.0, 1.0], &[0.0, 1.0], &[1.0; 3]).is_err());
    }
}
