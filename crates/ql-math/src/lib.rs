//! # ql-math
//!
//! Numerical building blocks for the pricing framework: array and matrix
//! newtypes over nalgebra, matrix decompositions, quadrature, root finding,
//! optimization, interpolation, random sequences and statistics.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Dense vector newtype.
pub mod array;

/// Floating-point comparison utilities.
pub mod comparison;

/// Probability distributions.
pub mod distributions;

/// Numerical integration.
pub mod integrals;

/// 1D and 2D interpolation schemes.
pub mod interpolations;

/// Dense matrix newtype.
pub mod matrix;

/// Decompositions and iterative linear solvers.
pub mod matrix_utilities;

/// Constrained least-squares and derivative-free optimization.
pub mod optimization;

/// Uniform, Gaussian and low-discrepancy sequence generators.
pub mod random_numbers;

/// 1D root-finding solvers.
pub mod solvers1d;

/// Statistics accumulators.
pub mod statistics;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use array::Array;
pub use comparison::{close, close_enough};
pub use distributions::{bivariate_normal_cdf, normal_cdf, normal_cdf_inverse, normal_pdf};
pub use matrix::Matrix;
