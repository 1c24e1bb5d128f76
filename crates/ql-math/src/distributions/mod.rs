//! Probability distributions.

pub mod normal;

pub use normal::{bivariate_normal_cdf, normal_cdf, normal_cdf_inverse, normal_pdf, NormalDistribution};
