//! `Matrix`: a dense matrix of reals backed by `nalgebra::DMatrix`.

use crate::array::Array;
use nalgebra::DMatrix;
use ql_core::Real;
use std::ops::{Add, Index, IndexMut, Mul, Sub};

/// A dynamically sized matrix of `Real` values, indexed `(row, col)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix(DMatrix<Real>);

impl Matrix {
    /// A zero-filled `rows × cols` matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self(DMatrix::zeros(rows, cols))
    }

    /// The `n × n` identity.
    pub fn identity(n: usize) -> Self {
        Self(DMatrix::identity(n, n))
    }

    /// Build from row-major data.
    pub fn from_row_slice(rows: usize, cols: usize, data: &[Real]) -> Self {
        Self(DMatrix::from_row_slice(rows, cols, data))
    }

    /// Build from a function of `(row, col)`.
    pub fn from_fn(rows: usize, cols: usize, f: impl FnMut(usize, usize) -> Real) -> Self {
        Self(DMatrix::from_fn(rows, cols, f))
    }

    /// A diagonal matrix.
    pub fn from_diagonal(diag: &[Real]) -> Self {
        let n = diag.len();
        Self::from_fn(n, n, |i, j| if i == j { diag[i] } else { 0.0 })
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.0.nrows()
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.0.ncols()
    }

    /// `true` if square.
    pub fn is_square(&self) -> bool {
        self.rows() == self.cols()
    }

    /// Borrow the underlying `DMatrix`.
    pub fn inner(&self) -> &DMatrix<Real> {
        &self.0
    }

    /// Consume into the underlying `DMatrix`.
    pub fn into_inner(self) -> DMatrix<Real> {
        self.0
    }

    /// Transpose.
    pub fn transpose(&self) -> Self {
        Self(self.0.transpose())
    }

    /// Diagonal elements.
    pub fn diagonal(&self) -> Array {
        Array::from(self.0.diagonal())
    }

    /// Column `j`.
    pub fn column(&self, j: usize) -> Array {
        Array::from(self.0.column(j).into_owned())
    }

    /// Row `i`.
    pub fn row(&self, i: usize) -> Array {
        Array::from_fn(self.cols(), |j| self.0[(i, j)])
    }

    /// Swap two columns.
    pub fn swap_columns(&mut self, a: usize, b: usize) {
        self.0.swap_columns(a, b);
    }

    /// Matrix-vector product.
    pub fn mul_array(&self, v: &Array) -> Array {
        Array::from(&self.0 * v.inner())
    }

    /// Frobenius norm.
    pub fn frobenius_norm(&self) -> Real {
        self.0.norm()
    }

    /// Largest absolute element.
    pub fn max_abs(&self) -> Real {
        self.0.amax()
    }

    /// Largest absolute difference between two matrices of equal shape.
    pub fn max_abs_diff(&self, other: &Matrix) -> Real {
        (&self.0 - &other.0).amax()
    }

    /// `true` if `self == selfᵀ` to within `tol`.
    pub fn is_symmetric(&self, tol: Real) -> bool {
        self.is_square() && self.max_abs_diff(&self.transpose()) <= tol
    }
}

impl From<DMatrix<Real>> for Matrix {
    fn from(m: DMatrix<Real>) -> Self {
        Self(m)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = Real;
    fn index(&self, idx: (usize, usize)) -> &Real {
        &self.0[idx]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    fn index_mut(&mut self, idx: (usize, usize)) -> &mut Real {
        &mut self.0[idx]
    }
}

impl Mul<&Matrix> for &Matrix {
    type Output = Matrix;
    fn mul(self, rhs: &Matrix) -> Matrix {
        Matrix(&self.0 * &rhs.0)
    }
}

impl Add<&Matrix> for &Matrix {
    type Output = Matrix;
    fn add(self, rhs: &Matrix) -> Matrix {
        Matrix(&self.0 + &rhs.0)
    }
}

impl Sub<&Matrix> for &Matrix {
    type Output = Matrix;
    fn sub(self, rhs: &Matrix) -> Matrix {
        Matrix(&self.0 - &rhs.0)
    }
}

impl Mul<Real> for &Matrix {
    type Output = Matrix;
    fn mul(self, rhs: Real) -> Matrix {
        Matrix(&self.0 * rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_and_transpose() {
        let a = Matrix::from_row_slice(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let ata = &a.transpose() * &a;
        assert_eq!(ata.rows(), 3);
        assert!(ata.is_symmetric(0.0));
        assert_eq!(ata[(0, 0)], 17.0);
        let v = a.mul_array(&Array::from_slice(&[1.0, 1.0, 1.0]));
        assert_eq!(v.as_slice(), &[6.0, 15.0]);
    }

    #[test]
    fn rows_columns_and_diagonal() {
        let mut m = Matrix::from_diagonal(&[1.0, 2.0]);
        m[(0, 1)] = 3.0;
        assert_eq!(m.row(0).as_slice(), &[1.0, 3.0]);
        assert_eq!(m.column(1).as_slice(), &[3.0, 2.0]);
        m.swap_columns(0, 1);
        assert_eq!(m.diagonal().as_slice(), &[3.0, 0.0]);
    }
}
