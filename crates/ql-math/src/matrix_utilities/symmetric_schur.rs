use nalgebra::SymmetricEigen;
use ql_core::errors::Result;
use ql_core::Real;

use super::ensure_symmetric;
use crate::array::Array;
use crate::matrix::Matrix;

/// Eigen-decomposition `M = V·Λ·Vᵀ` of a real symmetric matrix.
///
/// Eigenvalues come out in descending order.  Each eigenvector is signed so
/// that its largest-magnitude component is positive, which makes the
/// decomposition reproducible.
#[derive(Debug, Clone)]
pub struct SymmetricSchurDecomposition {
    eigenvalues: Array,
    eigenvectors: Matrix,
}

impl SymmetricSchurDecomposition {
    /// Decompose `m`, which must be square and symmetric.
    pub fn new(m: &Matrix) -> Result<Self> {
        ensure_symmetric(m, "symmetric Schur decomposition")?;
        let eigen = SymmetricEigen::new(m.inner().clone());
        let n = m.rows();
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&i, &j| eigen.eigenvalues[j].total_cmp(&eigen.eigenvalues[i]));

        let eigenvalues = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
        let mut eigenvectors = Matrix::zeros(n, n);
        for (col, &i) in order.iter().enumerate() {
            let v = eigen.eigenvectors.column(i);
            let pivot = v.iter().copied().fold(0.0 as Real, |acc, x| {
                if x.abs() > acc.abs() {
                    x
                } else {
                    acc
                }
            });
            let sign = if pivot < 0.0 { -1.0 } else { 1.0 };
            for row in 0..n {
                eigenvectors[(row, col)] = sign * v[row];
            }
        }
        Ok(Self {
            eigenvalues,
            eigenvectors,
        })
    }

    /// Eigenvalues, largest first.
    pub fn eigenvalues(&self) -> &Array {
        &self.eigenvalues
    }

    /// Eigenvectors as columns, matching [`eigenvalues`][Self::eigenvalues].
    pub fn eigenvectors(&self) -> &Matrix {
        &self.eigenvectors
    }
}
