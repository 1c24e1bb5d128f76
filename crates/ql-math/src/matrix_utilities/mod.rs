//! Matrix decompositions and linear solvers.
//!
//! Dense decompositions build on nalgebra where it offers what is needed
//! (eigen-decomposition, SVD, LU) and implement the rest directly:
//! column-pivoted Householder QR, a Cholesky factorization that tolerates
//! semi-definite input, and pseudo square roots with salvaging.  Iterative
//! solvers are matrix-free and take the operator as a closure.

mod bicgstab;
mod cholesky;
mod gmres;
mod pseudo_sqrt;
mod qr;
mod svd;
mod symmetric_schur;

use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real};

use crate::array::Array;
use crate::matrix::Matrix;

pub use bicgstab::BiCGStab;
pub use cholesky::cholesky_decomposition;
pub use gmres::Gmres;
pub use pseudo_sqrt::{pseudo_sqrt, SalvagingAlgorithm};
pub use qr::{qr_decomposition, qr_solve, QrDecomposition};
pub use svd::Svd;
pub use symmetric_schur::SymmetricSchurDecomposition;

/// Outcome of an iterative linear solve.
#[derive(Debug, Clone, PartialEq)]
pub struct IterativeSolution {
    /// The approximate solution.
    pub x: Array,
    /// Iterations used.
    pub iterations: usize,
    /// Relative residual `‖b − A·x‖ / ‖b‖` reached.
    pub residual: Real,
}

/// Inverse of a square matrix via LU factorization.
pub fn inverse(m: &Matrix) -> Result<Matrix> {
    ensure!(m.is_square(), "cannot invert a {}x{} matrix", m.rows(), m.cols());
    m.inner()
        .clone()
        .try_inverse()
        .map(Matrix::from)
        .ok_or_else(|| Error::Domain("matrix is singular".into()))
}

/// Determinant of a square matrix via LU factorization.
pub fn determinant(m: &Matrix) -> Result<Real> {
    ensure!(
        m.is_square(),
        "determinant of a {}x{} matrix is undefined",
        m.rows(),
        m.cols()
    );
    Ok(m.inner().clone().lu().determinant())
}

pub(crate) fn ensure_symmetric(m: &Matrix, what: &str) -> Result<()> {
    ensure!(m.is_square(), "{what}: {}x{} matrix is not square", m.rows(), m.cols());
    ensure!(m.rows() > 0, "{what}: empty matrix");
    let tolerance = 1e-12 * m.max_abs().max(1.0);
    ensure!(m.is_symmetric(tolerance), "{what}: matrix is not symmetric");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn inverse_times_matrix_is_identity() {
        let a = Matrix::from_row_slice(3, 3, &[4.0, 1.0, 2.0, 0.5, 3.0, -1.0, 2.0, 0.0, 5.0]);
        let inv = inverse(&a).unwrap();
        let id = &inv * &a;
        assert!(id.max_abs_diff(&Matrix::identity(3)) < 1e-13);
        assert_abs_diff_eq!(determinant(&a).unwrap(), 43.5, epsilon = 1e-12);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let a = Matrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(matches!(inverse(&a), Err(Error::Domain(_))));
        assert_abs_diff_eq!(determinant(&a).unwrap(), 0.0, epsilon = 1e-14);
    }
}
