use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real};

use crate::array::Array;
use crate::matrix::Matrix;

/// Thin singular value decomposition `A = U·S·Vᵀ`.
///
/// For an `m×n` matrix with `k = min(m, n)`, `U` is `m×k`, `V` is `n×k` and
/// the singular values are sorted in descending order.
#[derive(Debug, Clone)]
pub struct Svd {
    u: Matrix,
    s: Array,
    v: Matrix,
}

impl Svd {
    /// Decompose `a`.
    pub fn new(a: &Matrix) -> Result<Self> {
        ensure!(a.rows() > 0 && a.cols() > 0, "SVD of an empty matrix");
        let svd = a.inner().clone().svd(true, true);
        let (u, v_t) = match (svd.u, svd.v_t) {
            (Some(u), Some(v_t)) => (u, v_t),
            _ => return Err(Error::Runtime("SVD did not produce singular vectors".into())),
        };
        let k = svd.singular_values.len();
        let mut order: Vec<usize> = (0..k).collect();
        order.sort_by(|&i, &j| svd.singular_values[j].total_cmp(&svd.singular_values[i]));

        let s = order.iter().map(|&i| svd.singular_values[i]).collect();
        let u = Matrix::from_fn(a.rows(), k, |r, c| u[(r, order[c])]);
        let v = Matrix::from_fn(a.cols(), k, |r, c| v_t[(order[c], r)]);
        Ok(Self { u, s, v })
    }

    /// Left singular vectors.
    pub fn u(&self) -> &Matrix {
        &self.u
    }

    /// Right singular vectors (not transposed).
    pub fn v(&self) -> &Matrix {
        &self.v
    }

    /// Singular values, largest first.
    pub fn singular_values(&self) -> &Array {
        &self.s
    }

    /// Singular values as a diagonal matrix.
    pub fn s(&self) -> Matrix {
        Matrix::from_diagonal(self.s.as_slice())
    }

    /// Largest singular value.
    pub fn norm2(&self) -> Real {
        self.s[0]
    }

    /// Ratio of the largest to the smallest singular value.
    pub fn condition_number(&self) -> Real {
        self.s[0] / self.s[self.s.len() - 1]
    }

    /// Number of singular values above the usual rank tolerance.
    pub fn rank(&self) -> usize {
        let dim = self.u.rows().max(self.v.rows()) as Real;
        let tolerance = dim * self.s[0] * Real::EPSILON;
        self.s.iter().filter(|&&s| s > tolerance).count()
    }

    /// Least-squares solution of `A·x = b` through the pseudo-inverse,
    /// discarding singular values below the rank tolerance.
    pub fn solve_for(&self, b: &Array) -> Result<Array> {
        ensure!(
            b.len() == self.u.rows(),
            "right-hand side has {} rows, matrix has {}",
            b.len(),
            self.u.rows()
        );
        let rank = self.rank();
        let mut x = Array::zeros(self.v.rows());
        for k in 0..rank {
            let coefficient = self.u.column(k).dot(b) / self.s[k];
            x.axpy(coefficient, &self.v.column(k));
        }
        Ok(x)
    }
}
