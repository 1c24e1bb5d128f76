//! Decomposition identities checked on random and structured matrices.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use ql_math::matrix_utilities::{
    cholesky_decomposition, inverse, pseudo_sqrt, qr_decomposition, SalvagingAlgorithm, Svd,
    SymmetricSchurDecomposition,
};
use ql_math::{Array, Matrix};

fn exponential_correlation(n: usize, decay: f64) -> Matrix {
    Matrix::from_fn(n, n, |i, j| (-decay * (i as f64 - j as f64).abs()).exp())
}

#[test]
fn eigenvectors_diagonalize_a_correlation_matrix() {
    let m = exponential_correlation(6, 0.3);
    let schur = SymmetricSchurDecomposition::new(&m).unwrap();
    let v = schur.eigenvectors();
    let lambda = Matrix::from_diagonal(schur.eigenvalues().as_slice());
    let rebuilt = &(v * &lambda) * &v.transpose();
    assert!(rebuilt.max_abs_diff(&m) < 1e-12);
    let values = schur.eigenvalues();
    for i in 1..values.len() {
        assert!(values[i - 1] >= values[i]);
    }
}

#[test]
fn cholesky_and_pseudo_sqrt_agree_on_products() {
    let m = exponential_correlation(8, 0.1);
    let l = cholesky_decomposition(&m, false).unwrap();
    assert!((&l * &l.transpose()).max_abs_diff(&m) < 1e-12);
    let s = pseudo_sqrt(&m, SalvagingAlgorithm::None).unwrap();
    assert!((&s * &s.transpose()).max_abs_diff(&m) < 1e-10);
}

#[test]
fn inverse_of_a_well_conditioned_matrix() {
    let m = exponential_correlation(5, 0.5);
    let inv = inverse(&m).unwrap();
    assert!((&m * &inv).max_abs_diff(&Matrix::identity(5)) < 1e-12);
    let svd = Svd::new(&m).unwrap();
    let b = Array::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]);
    let x = svd.solve_for(&b).unwrap();
    let r = &m.mul_array(&x) - &b;
    assert_abs_diff_eq!(r.norm(), 0.0, epsilon = 1e-10);
}

proptest! {
    #[test]
    fn svd_reconstructs(values in proptest::collection::vec(-5.0f64..5.0, 12)) {
        let a = Matrix::from_row_slice(4, 3, &values);
        let svd = Svd::new(&a).unwrap();
        let rebuilt = &(svd.u() * &svd.s()) * &svd.v().transpose();
        prop_assert!(rebuilt.max_abs_diff(&a) < 1e-9);
    }

    #[test]
    fn qr_factor_is_orthogonal(values in proptest::collection::vec(-5.0f64..5.0, 12)) {
        let a = Matrix::from_row_slice(4, 3, &values);
        let qr = qr_decomposition(&a, true);
        let qtq = &qr.q.transpose() * &qr.q;
        prop_assert!(qtq.max_abs_diff(&Matrix::identity(qtq.rows())) < 1e-10);
    }
}
