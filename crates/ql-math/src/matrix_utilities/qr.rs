use ql_core::errors::Result;
use ql_core::{ensure, Real};

use crate::array::Array;
use crate::matrix::Matrix;

/// Householder QR factorization with optional column pivoting.
///
/// For an `m×n` matrix `A` and `k = min(m, n)`, `Q` is `m×k` with
/// orthonormal columns, `R` is `k×n` upper triangular and
/// `A·P = Q·R`, where column `j` of `A·P` is column `pivots[j]` of `A`.
/// With pivoting the diagonal of `R` is non-increasing in magnitude.
#[derive(Debug, Clone)]
pub struct QrDecomposition {
    /// Orthonormal factor.
    pub q: Matrix,
    /// Upper triangular factor.
    pub r: Matrix,
    /// Column permutation.
    pub pivots: Vec<usize>,
}

impl QrDecomposition {
    /// The permutation as a matrix `P` with `A·P = Q·R`.
    pub fn permutation_matrix(&self) -> Matrix {
        let n = self.pivots.len();
        let mut p = Matrix::zeros(n, n);
        for (j, &i) in self.pivots.iter().enumerate() {
            p[(i, j)] = 1.0;
        }
        p
    }
}

/// Factorize `a`, pivoting on the largest remaining column norm when
/// `pivot` is set.
pub fn qr_decomposition(a: &Matrix, pivot: bool) -> QrDecomposition {
    let (m, n) = (a.rows(), a.cols());
    let k = m.min(n);
    let mut r = a.clone();
    let mut pivots: Vec<usize> = (0..n).collect();
    let mut reflectors: Vec<Vec<Real>> = Vec::with_capacity(k);

    for j in 0..k {
        if pivot {
            let tail_norm = |r: &Matrix, c: usize| (j..m).map(|i| r[(i, c)] * r[(i, c)]).sum::<Real>();
            let best = (j..n).fold(j, |best, c| {
                if tail_norm(&r, c) > tail_norm(&r, best) {
                    c
                } else {
                    best
                }
            });
            if best != j {
                r.swap_columns(j, best);
                pivots.swap(j, best);
            }
        }

        let mut v: Vec<Real> = (j..m).map(|i| r[(i, j)]).collect();
        let norm = v.iter().map(|x| x * x).sum::<Real>().sqrt();
        if norm > 0.0 {
            let alpha = if v[0] > 0.0 { -norm } else { norm };
            v[0] -= alpha;
            let v_norm = v.iter().map(|x| x * x).sum::<Real>().sqrt();
            v.iter_mut().for_each(|x| *x /= v_norm);
            for c in j..n {
                let proj: Real = v.iter().enumerate().map(|(t, vi)| vi * r[(j + t, c)]).sum();
                for (t, vi) in v.iter().enumerate() {
                    r[(j + t, c)] -= 2.0 * vi * proj;
                }
            }
        } else {
            v.iter_mut().for_each(|x| *x = 0.0);
        }
        reflectors.push(v);
    }

    // Q = H_0 H_1 ... H_{k-1} applied to the first k columns of the identity
    let mut q = Matrix::from_fn(m, k, |i, c| if i == c { 1.0 } else { 0.0 });
    for (j, v) in reflectors.iter().enumerate().rev() {
        for c in 0..k {
            let proj: Real = v.iter().enumerate().map(|(t, vi)| vi * q[(j + t, c)]).sum();
            for (t, vi) in v.iter().enumerate() {
                q[(j + t, c)] -= 2.0 * vi * proj;
            }
        }
    }
    let r = Matrix::from_fn(k, n, |i, c| if c >= i { r[(i, c)] } else { 0.0 });
    QrDecomposition { q, r, pivots }
}

/// Least-squares solution of `A·x = b` via pivoted QR.
///
/// With `d` supplied, solves the regularized problem
/// `min ‖A·x − b‖² + ‖diag(d)·x‖²` by stacking `diag(d)` under `A`.
/// Components on numerically zero pivots are set to zero.
pub fn qr_solve(a: &Matrix, b: &Array, d: Option<&Array>) -> Result<Array> {
    let (m, n) = (a.rows(), a.cols());
    ensure!(b.len() == m, "right-hand side has {} rows, matrix has {m}", b.len());
    let (system, rhs) = match d {
        Some(d) => {
            ensure!(d.len() == n, "regularization has {} entries, matrix has {n} columns", d.len());
            let stacked = Matrix::from_fn(m + n, n, |i, j| {
                if i < m {
                    a[(i, j)]
                } else if i - m == j {
                    d[j]
                } else {
                    0.0
                }
            });
            let rhs = Array::from_fn(m + n, |i| if i < m { b[i] } else { 0.0 });
            (stacked, rhs)
        }
        None => (a.clone(), b.clone()),
    };

    let qr = qr_decomposition(&system, true);
    let k = qr.r.rows();
    let qtb: Vec<Real> = (0..k).map(|c| qr.q.column(c).dot(&rhs)).collect();
    let tolerance = qr.r[(0, 0)].abs() * Real::EPSILON * (m.max(n) as Real);

    let mut z = vec![0.0; n];
    for i in (0..k).rev() {
        if qr.r[(i, i)].abs() <= tolerance {
            continue;
        }
        let tail: Real = (i + 1..k).map(|c| qr.r[(i, c)] * z[c]).sum();
        z[i] = (qtb[i] - tail) / qr.r[(i, i)];
    }
    let mut x = Array::zeros(n);
    for (j, &p) in qr.pivots.iter().enumerate() {
        x[p] = z[j];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use proptest::prelude::*;

    fn sample() -> Matrix {
        Matrix::from_row_slice(
            4,
            3,
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0, -1.0, 0.5, 2.0],
        )
    }

    #[test]
    fn pivoted_factors_reconstruct_permuted_matrix() {
        let a = sample();
        let qr = qr_decomposition(&a, true);
        let ap = &a * &qr.permutation_matrix();
        assert!((&qr.q * &qr.r).max_abs_diff(&ap) < 1e-12);
        let qtq = &qr.q.transpose() * &qr.q;
        assert!(qtq.max_abs_diff(&Matrix::identity(3)) < 1e-13);
        assert!(qr.r[(0, 0)].abs() >= qr.r[(1, 1)].abs());
        assert!(qr.r[(1, 1)].abs() >= qr.r[(2, 2)].abs());
    }

    #[test]
    fn wide_matrix_without_pivoting() {
        let a = sample().transpose();
        let qr = qr_decomposition(&a, false);
        assert_eq!(qr.pivots, vec![0, 1, 2, 3]);
        assert!((&qr.q * &qr.r).max_abs_diff(&a) < 1e-12);
    }

    #[test]
    fn least_squares_line_fit() {
        // fit y = 1 + 2x through noiseless points
        let a = Matrix::from_row_slice(4, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0, 1.0, 3.0]);
        let b = Array::from_slice(&[1.0, 3.0, 5.0, 7.0]);
        let x = qr_solve(&a, &b, None).unwrap();
        assert_abs_diff_eq!(x[0], 1.0, epsilon = 1e-13);
        assert_abs_diff_eq!(x[1], 2.0, epsilon = 1e-13);
        let damped = qr_solve(&a, &b, Some(&Array::from_slice(&[1.0, 1.0]))).unwrap();
        assert!(damped.norm() < x.norm());
    }

    proptest! {
        #[test]
        fn random_matrices_reconstruct(values in proptest::collection::vec(-10.0f64..10.0, 20)) {
            let a = Matrix::from_row_slice(5, 4, &values);
            let qr = qr_decomposition(&a, true);
            let ap = &a * &qr.permutation_matrix();
            prop_assert!((&qr.q * &qr.r).max_abs_diff(&ap) < 1e-10);
        }
    }
}
