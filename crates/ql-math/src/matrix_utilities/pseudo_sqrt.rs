use ql_core::errors::{Error, Result};
use ql_core::Real;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ensure_symmetric, SymmetricSchurDecomposition};
use crate::matrix::Matrix;

/// How to treat a matrix that is not positive semi-definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SalvagingAlgorithm {
    /// Fail on negative eigenvalues.
    #[default]
    None,
    /// Clip negative eigenvalues to zero and restore the diagonal.
    Spectral,
    /// Replace the matrix by the nearest correlation matrix (Higham 2002)
    /// and restore the original scale.
    Higham,
}

const HIGHAM_TOLERANCE: Real = 1e-12;
const HIGHAM_MAX_ITERATIONS: usize = 1000;

/// A matrix `S` with `S·Sᵀ ≈ m` for a symmetric `m`.
pub fn pseudo_sqrt(m: &Matrix, salvaging: SalvagingAlgorithm) -> Result<Matrix> {
    ensure_symmetric(m, "pseudo square root")?;
    let n = m.rows();
    match salvaging {
        SalvagingAlgorithm::None => {
            let schur = SymmetricSchurDecomposition::new(m)?;
            let smallest = schur.eigenvalues()[n - 1];
            let tolerance = -1e-16 * schur.eigenvalues()[0].abs().max(1.0);
            if smallest < tolerance {
                return Err(Error::Domain(format!(
                    "matrix is not positive semi-definite (smallest eigenvalue {smallest:e})"
                )));
            }
            Ok(spectral_root(&schur))
        }
        SalvagingAlgorithm::Spectral => {
            let schur = SymmetricSchurDecomposition::new(m)?;
            let mut root = spectral_root(&schur);
            restore_diagonal(&mut root, m);
            Ok(root)
        }
        SalvagingAlgorithm::Higham => {
            let scale: Vec<Real> = (0..n).map(|i| m[(i, i)].max(0.0).sqrt()).collect();
            if scale.iter().any(|&s| s == 0.0) {
                return Err(Error::Domain(
                    "Higham salvaging needs a strictly positive diagonal".into(),
                ));
            }
            let correlation = Matrix::from_fn(n, n, |i, j| m[(i, j)] / (scale[i] * scale[j]));
            let nearest = nearest_correlation(&correlation)?;
            let mut root = spectral_root(&SymmetricSchurDecomposition::new(&nearest)?);
            restore_diagonal(&mut root, &nearest);
            for i in 0..n {
                for j in 0..n {
                    root[(i, j)] *= scale[i];
                }
            }
            Ok(root)
        }
    }
}

/// `V·sqrt(max(Λ, 0))`.
fn spectral_root(schur: &SymmetricSchurDecomposition) -> Matrix {
    let v = schur.eigenvectors();
    let values = schur.eigenvalues();
    Matrix::from_fn(v.rows(), v.cols(), |i, j| v[(i, j)] * values[j].max(0.0).sqrt())
}

/// Rescale rows of `root` so that `root·rootᵀ` has the diagonal of `target`.
fn restore_diagonal(root: &mut Matrix, target: &Matrix) {
    for i in 0..root.rows() {
        let norm_sq: Real = (0..root.cols()).map(|j| root[(i, j)] * root[(i, j)]).sum();
        if norm_sq > 0.0 {
            let factor = (target[(i, i)] / norm_sq).sqrt();
            for j in 0..root.cols() {
                root[(i, j)] *= factor;
            }
        }
    }
}

/// Alternating projections with Dykstra's correction onto the PSD cone and
/// the unit-diagonal matrices.
fn nearest_correlation(a: &Matrix) -> Result<Matrix> {
    let n = a.rows();
    let mut y = a.clone();
    let mut correction = Matrix::zeros(n, n);
    for iteration in 1..=HIGHAM_MAX_ITERATIONS {
        let r = &y - &correction;
        let schur = SymmetricSchurDecomposition::new(&symmetrize(&r))?;
        let root = spectral_root(&schur);
        let x = &root * &root.transpose();
        correction = &x - &r;
        let mut next = x;
        for i in 0..n {
            next[(i, i)] = 1.0;
        }
        let change = (&next - &y).frobenius_norm() / next.frobenius_norm();
        y = next;
        if change < HIGHAM_TOLERANCE {
            debug!(iteration, "nearest correlation matrix converged");
            return Ok(y);
        }
    }
    Err(Error::Convergence(format!(
        "nearest correlation matrix not found within {HIGHAM_MAX_ITERATIONS} iterations"
    )))
}

fn symmetrize(m: &Matrix) -> Matrix {
    Matrix::from_fn(m.rows(), m.cols(), |i, j| 0.5 * (m[(i, j)] + m[(j, i)]))
}
