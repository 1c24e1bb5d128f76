//! `StochasticProcess1D`: a scalar diffusion `dX = μ(t,X) dt + σ(t,X) dW`.
//!
//! Processes read their coefficients from market objects, so every
//! coefficient query can fail with the errors of those objects.

use ql_core::errors::Result;
use ql_core::versioning::Versioned;
use ql_core::{Real, Time};

/// A one-dimensional diffusion.
pub trait StochasticProcess1D: Versioned + std::fmt::Debug + Send + Sync {
    /// Initial value.
    fn x0(&self) -> Result<Real>;

    /// Drift `μ(t, x)`.
    fn drift(&self, t: Time, x: Real) -> Result<Real>;

    /// Diffusion `σ(t, x)`.
    fn diffusion(&self, t: Time, x: Real) -> Result<Real>;

    /// `E[X(t+Δt) | X(t) = x]`; Euler approximation by default.
    fn expectation(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        Ok(x + self.drift(t, x)? * dt)
    }

    /// Standard deviation of `X(t+Δt)` given `X(t) = x`.
    fn std_deviation(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        Ok(self.diffusion(t, x)? * dt.sqrt())
    }

    /// Variance of `X(t+Δt)` given `X(t) = x`.
    fn variance(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        let s = self.std_deviation(t, x, dt)?;
        Ok(s * s)
    }

    /// Advance `x` from `t` to `t + Δt` given a standard normal draw `dw`.
    fn evolve(&self, t: Time, x: Real, dt: Time, dw: Real) -> Result<Real> {
        Ok(self.expectation(t, x, dt)? + self.std_deviation(t, x, dt)? * dw)
    }
}
