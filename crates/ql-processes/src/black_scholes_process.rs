//! Generalized Black-Scholes process
//!
//! `dS/S = (r(t) − q(t)) dt + σ(t) dW`
//!
//! with `r` and `q` read from yield curves and `σ` from a Black volatility
//! term structure.  Evolution is exact in log space over each step.

use std::sync::Arc;

use crate::stochastic_process::StochasticProcess1D;
use ql_core::errors::Result;
use ql_core::versioning::{latest_version, Version, Versioned};
use ql_core::{ensure, DiscountFactor, Handle, Real, Time, Volatility};
use ql_quotes::Quote;
use ql_termstructures::{BlackVolTermStructure, YieldTermStructure};
use ql_time::Date;

/// Interval used to read instantaneous rates and volatilities.
const DT: Time = 1.0e-4;

/// A Black-Scholes process with term structures of rates, dividends and
/// volatility.
#[derive(Debug, Clone)]
pub struct GeneralizedBlackScholesProcess {
    x0: Handle<dyn Quote>,
    dividend_yield: Handle<dyn YieldTermStructure>,
    risk_free_rate: Handle<dyn YieldTermStructure>,
    black_vol: Handle<dyn BlackVolTermStructure>,
}

impl GeneralizedBlackScholesProcess {
    /// Process with a continuous dividend yield.
    pub fn black_scholes_merton(
        x0: Handle<dyn Quote>,
        dividend_yield: Handle<dyn YieldTermStructure>,
        risk_free_rate: Handle<dyn YieldTermStructure>,
        black_vol: Handle<dyn BlackVolTermStructure>,
    ) -> Self {
        Self {
            x0,
            dividend_yield,
            risk_free_rate,
            black_vol,
        }
    }

    /// Process without dividends; `dividend_yield` is a zero-rate curve
    /// sharing the risk-free curve's reference date.
    pub fn black_scholes(
        x0: Handle<dyn Quote>,
        risk_free_rate: Handle<dyn YieldTermStructure>,
        black_vol: Handle<dyn BlackVolTermStructure>,
    ) -> Result<Self> {
        let curve = risk_free_rate.current()?;
        let zero: Arc<dyn YieldTermStructure> = Arc::new(ql_termstructures::FlatForward::with_rate(
            curve.reference_date()?,
            0.0,
            Arc::clone(&curve.data().day_counter),
        ));
        Ok(Self::black_scholes_merton(x0, Handle::new(zero), risk_free_rate, black_vol))
    }

    /// Current spot value.
    pub fn x0_value(&self) -> Result<Real> {
        self.x0.current()?.value()
    }

    /// The spot quote.
    pub fn state_variable(&self) -> &Handle<dyn Quote> {
        &self.x0
    }

    /// The risk-free curve.
    pub fn risk_free_rate(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.risk_free_rate.current()
    }

    /// The dividend curve.
    pub fn dividend_yield(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.dividend_yield.current()
    }

    /// The Black volatility surface.
    pub fn black_vol(&self) -> Result<Arc<dyn BlackVolTermStructure>> {
        self.black_vol.current()
    }

    /// Risk-free discount factor to `t`.
    pub fn discount(&self, t: Time) -> Result<DiscountFactor> {
        self.risk_free_rate()?.discount(t)
    }

    /// Dividend discount factor to `t`.
    pub fn dividend_discount(&self, t: Time) -> Result<DiscountFactor> {
        self.dividend_yield()?.discount(t)
    }

    /// Forward price of the underlying for delivery at `t`.
    pub fn forward(&self, t: Time) -> Result<Real> {
        Ok(self.x0_value()? * self.dividend_discount(t)? / self.discount(t)?)
    }

    /// Black volatility for expiry `t` and `strike`.
    pub fn black_volatility(&self, t: Time, strike: Real) -> Result<Volatility> {
        self.black_vol()?.black_vol(t, strike)
    }

    /// Total Black variance for expiry `t` and `strike`.
    pub fn black_variance(&self, t: Time, strike: Real) -> Result<Real> {
        self.black_vol()?.black_variance(t, strike)
    }

    /// Time from the risk-free curve's reference date to `date`.
    pub fn time(&self, date: Date) -> Result<Time> {
        self.risk_free_rate()?.time_from_reference(date)
    }

    /// Mean and standard deviation of `ln S(t1) − ln S(t0)`, read from the
    /// curves and the volatility at `strike`.
    pub fn log_evolution(&self, t0: Time, t1: Time, strike: Real) -> Result<(Real, Real)> {
        ensure!(t1 >= t0, "step from {t0} back to {t1}");
        let r = self.risk_free_rate()?;
        let q = self.dividend_yield()?;
        let carry = (q.discount(t1)? * r.discount(t0)? / (q.discount(t0)? * r.discount(t1)?)).ln();
        let variance = self.black_vol()?.black_forward_variance(t0, t1, strike)?;
        Ok((carry - 0.5 * variance, variance.sqrt()))
    }

    fn local_rates(&self, t: Time) -> Result<(Real, Real, Volatility)> {
        let r = self.risk_free_rate()?.forward_rate(t, t)?;
        let q = self.dividend_yield()?.forward_rate(t, t)?;
        let vol = self.black_vol()?;
        let sigma = vol.black_forward_vol(t, t + DT, 0.0)?;
        Ok((r, q, sigma))
    }
}

impl Versioned for GeneralizedBlackScholesProcess {
    fn version(&self) -> Version {
        latest_version([
            self.x0.version(),
            self.dividend_yield.version(),
            self.risk_free_rate.version(),
            self.black_vol.version(),
        ])
    }
}

impl StochasticProcess1D for GeneralizedBlackScholesProcess {
    fn x0(&self) -> Result<Real> {
        self.x0_value()
    }

    fn drift(&self, t: Time, x: Real) -> Result<Real> {
        let (r, q, _) = self.local_rates(t)?;
        Ok((r - q) * x)
    }

    fn diffusion(&self, t: Time, x: Real) -> Result<Real> {
        let (_, _, sigma) = self.local_rates(t)?;
        Ok(sigma * x)
    }

    fn expectation(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        let (m, s) = self.log_evolution(t, t + dt, x)?;
        Ok(x * (m + 0.5 * s * s).exp())
    }

    fn std_deviation(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        Ok(self.variance(t, x, dt)?.sqrt())
    }

    fn variance(&self, t: Time, x: Real, dt: Time) -> Result<Real> {
        let (m, s) = self.log_evolution(t, t + dt, x)?;
        let mean = x * (m + 0.5 * s * s).exp();
        Ok(mean * mean * ((s * s).exp() - 1.0))
    }

    fn evolve(&self, t: Time, x: Real, dt: Time, dw: Real) -> Result<Real> {
        let (m, s) = self.log_evolution(t, t + dt, x)?;
        Ok(x * (m + s * dw).exp())
    }
}
