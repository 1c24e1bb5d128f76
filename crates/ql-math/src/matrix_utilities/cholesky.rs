use ql_core::errors::{Error, Result};
use ql_core::Real;

use super::ensure_symmetric;
use crate::matrix::Matrix;

/// Lower-triangular `L` with `L·Lᵀ = M` for a symmetric matrix `M`.
///
/// A non-positive pivot fails with [`Error::Domain`], unless `flexible`
/// is set; then the corresponding column of `L` is zeroed, which handles
/// positive semi-definite input.
pub fn cholesky_decomposition(m: &Matrix, flexible: bool) -> Result<Matrix> {
    ensure_symmetric(m, "Cholesky decomposition")?;
    let n = m.rows();
    let mut l = Matrix::zeros(n, n);
    for i in 0..n {
        for j in i..n {
            let sum = m[(i, j)] - (0..i).map(|k| l[(i, k)] * l[(j, k)]).sum::<Real>();
            if i == j {
                if sum <= 0.0 {
                    if !flexible {
                        return Err(Error::Domain(format!(
                            "matrix is not positive definite (pivot {i} is {sum:e})"
                        )));
                    }
                    l[(i, i)] = 0.0;
                } else {
                    l[(i, i)] = sum.sqrt();
                }
            } else {
                l[(j, i)] = if l[(i, i)] == 0.0 { 0.0 } else { sum / l[(i, i)] };
            }
        }
    }
    Ok(l)
}
