//! Heston stochastic volatility process
//!
//! ```text
//! dS = (r − q) S dt + √v S dW₁
//! dv = κ(θ − v) dt + σ √v dW₂
//! dW₁ dW₂ = ρ dt
//! ```
//!
//! Monte Carlo evolution works on `(ln S, v)` with one of several
//! discretizations of the variance.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::versioning::{latest_version, Version, VersionStamp, Versioned};
use ql_core::{ensure, DiscountFactor, Handle, Real, Time};
use ql_math::normal_cdf;
use ql_quotes::Quote;
use ql_termstructures::YieldTermStructure;
use ql_time::Date;

/// Variance discretization used by [`HestonProcess::evolve`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HestonDiscretization {
    /// Euler with `v⁺` in the diffusion only.
    PartialTruncation,
    /// Euler with `v⁺` in drift and diffusion.
    FullTruncation,
    /// Euler on `|v|`.
    Reflection,
    /// Andersen's quadratic-exponential scheme.
    QuadraticExponential,
    /// Quadratic-exponential with the martingale correction on the spot.
    #[default]
    QuadraticExponentialMartingale,
}

/// State of a Heston path: log spot and variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HestonState {
    /// `ln S`.
    pub log_spot: Real,
    /// Variance, possibly negative under the truncation schemes.
    pub variance: Real,
}

/// The Heston process.
#[derive(Debug, Clone)]
pub struct HestonProcess {
    risk_free_rate: Handle<dyn YieldTermStructure>,
    dividend_yield: Handle<dyn YieldTermStructure>,
    s0: Handle<dyn Quote>,
    v0: Real,
    kappa: Real,
    theta: Real,
    sigma: Real,
    rho: Real,
    discretization: HestonDiscretization,
    stamp: Arc<VersionStamp>,
}

/// Switch between the quadratic and exponential branches.
const PSI_CRITICAL: Real = 1.5;

impl HestonProcess {
    /// Build the process, validating the parameters.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        risk_free_rate: Handle<dyn YieldTermStructure>,
        dividend_yield: Handle<dyn YieldTermStructure>,
        s0: Handle<dyn Quote>,
        v0: Real,
        kappa: Real,
        theta: Real,
        sigma: Real,
        rho: Real,
        discretization: HestonDiscretization,
    ) -> Result<Self> {
        ensure!(v0 >= 0.0, "initial variance must be non-negative, got {v0}");
        ensure!(kappa >= 0.0, "mean reversion speed must be non-negative, got {kappa}");
        ensure!(theta >= 0.0, "long-run variance must be non-negative, got {theta}");
        ensure!(sigma > 0.0, "volatility of variance must be positive, got {sigma}");
        ensure!((-1.0..=1.0).contains(&rho), "correlation must be in [-1, 1], got {rho}");
        Ok(Self {
            risk_free_rate,
            dividend_yield,
            s0,
            v0,
            kappa,
            theta,
            sigma,
            rho,
            discretization,
            stamp: Arc::new(VersionStamp::new()),
        })
    }

    /// Same market data, different model parameters.
    pub fn with_parameters(&self, v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real) -> Result<Self> {
        Self::new(
            self.risk_free_rate.clone(),
            self.dividend_yield.clone(),
            self.s0.clone(),
            v0,
            kappa,
            theta,
            sigma,
            rho,
            self.discretization,
        )
    }

    /// Same process, different discretization.
    pub fn with_discretization(&self, discretization: HestonDiscretization) -> Self {
        Self {
            discretization,
            stamp: Arc::new(VersionStamp::new()),
            ..self.clone()
        }
    }

    /// Initial variance.
    pub fn v0(&self) -> Real {
        self.v0
    }

    /// Mean reversion speed.
    pub fn kappa(&self) -> Real {
        self.kappa
    }

    /// Long-run variance.
    pub fn theta(&self) -> Real {
        self.theta
    }

    /// Volatility of variance.
    pub fn sigma(&self) -> Real {
        self.sigma
    }

    /// Spot/variance correlation.
    pub fn rho(&self) -> Real {
        self.rho
    }

    /// Variance discretization.
    pub fn discretization(&self) -> HestonDiscretization {
        self.discretization
    }

    /// Current spot.
    pub fn s0(&self) -> Result<Real> {
        self.s0.current()?.value()
    }

    /// The spot quote.
    pub fn s0_handle(&self) -> &Handle<dyn Quote> {
        &self.s0
    }

    /// The risk-free curve.
    pub fn risk_free_rate(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.risk_free_rate.current()
    }

    /// The dividend curve.
    pub fn dividend_yield(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.dividend_yield.current()
    }

    /// The risk-free curve handle.
    pub fn risk_free_rate_handle(&self) -> &Handle<dyn YieldTermStructure> {
        &self.risk_free_rate
    }

    /// The dividend curve handle.
    pub fn dividend_yield_handle(&self) -> &Handle<dyn YieldTermStructure> {
        &self.dividend_yield
    }

    /// Risk-free discount factor to `t`.
    pub fn discount(&self, t: Time) -> Result<DiscountFactor> {
        self.risk_free_rate()?.discount(t)
    }

    /// Dividend discount factor to `t`.
    pub fn dividend_discount(&self, t: Time) -> Result<DiscountFactor> {
        self.dividend_yield()?.discount(t)
    }

    /// Time from the risk-free curve's reference date to `date`.
    pub fn time(&self, date: Date) -> Result<Time> {
        self.risk_free_rate()?.time_from_reference(date)
    }

    /// Initial state `(ln S0, v0)`.
    pub fn initial_state(&self) -> Result<HestonState> {
        Ok(HestonState {
            log_spot: self.s0()?.ln(),
            variance: self.v0,
        })
    }

    /// `∫(r − q)` over `[t0, t1]` read from the curves.
    pub fn carry(&self, t0: Time, t1: Time) -> Result<Real> {
        let r = self.risk_free_rate()?;
        let q = self.dividend_yield()?;
        Ok((q.discount(t1)? * r.discount(t0)? / (q.discount(t0)? * r.discount(t1)?)).ln())
    }

    /// Advance `state` over `dt` given the integrated carry over the step and
    /// two independent standard normals `dw`.
    pub fn evolve(&self, state: HestonState, dt: Time, carry: Real, dw: [Real; 2]) -> HestonState {
        match self.discretization {
            HestonDiscretization::PartialTruncation
            | HestonDiscretization::FullTruncation
            | HestonDiscretization::Reflection => self.evolve_euler(state, dt, carry, dw),
            HestonDiscretization::QuadraticExponential => self.evolve_qe(state, dt, carry, dw, false),
            HestonDiscretization::QuadraticExponentialMartingale => {
                self.evolve_qe(state, dt, carry, dw, true)
            }
        }
    }

    fn evolve_euler(&self, state: HestonState, dt: Time, carry: Real, dw: [Real; 2]) -> HestonState {
        let (kappa, theta, sigma, rho) = (self.kappa, self.theta, self.sigma, self.rho);
        let sdt = dt.sqrt();
        let z_v = rho * dw[0] + (1.0 - rho * rho).sqrt() * dw[1];
        let v = state.variance;
        // variance seen by the spot, and the next variance
        let (v_spot, next) = match self.discretization {
            HestonDiscretization::PartialTruncation => {
                let vp = v.max(0.0);
                (vp, v + kappa * (theta - v) * dt + sigma * vp.sqrt() * sdt * z_v)
            }
            HestonDiscretization::FullTruncation => {
                let vp = v.max(0.0);
                (vp, v + kappa * (theta - vp) * dt + sigma * vp.sqrt() * sdt * z_v)
            }
            _ => {
                let va = v.abs();
                (va, (va + kappa * (theta - va) * dt + sigma * va.sqrt() * sdt * z_v).abs())
            }
        };
        HestonState {
            log_spot: state.log_spot + carry - 0.5 * v_spot * dt + (v_spot * dt).sqrt() * dw[0],
            variance: next,
        }
    }

    fn evolve_qe(&self, state: HestonState, dt: Time, carry: Real, dw: [Real; 2], martingale: bool) -> HestonState {
        let (kappa, theta, sigma, rho) = (self.kappa, self.theta, self.sigma, self.rho);
        let v = state.variance.max(0.0);
        let ex = (-kappa * dt).exp();
        // for vanishing κ the moments reduce to those of a driftless square root process
        let one_minus_ex_over_k = if kappa.abs() < 1e-8 { dt } else { (1.0 - ex) / kappa };
        let m = theta + (v - theta) * ex;
        let s2 = v * sigma * sigma * ex * one_minus_ex_over_k
            + 0.5 * theta * sigma * sigma * (1.0 - ex) * one_minus_ex_over_k;
        let psi = s2 / (m * m).max(Real::MIN_POSITIVE);

        let (g1, g2) = (0.5, 0.5);
        let k0 = -rho * kappa * theta * dt / sigma;
        let k1 = g1 * dt * (kappa * rho / sigma - 0.5) - rho / sigma;
        let k2 = g2 * dt * (kappa * rho / sigma - 0.5) + rho / sigma;
        let k3 = g1 * dt * (1.0 - rho * rho);
        let k4 = g2 * dt * (1.0 - rho * rho);
        let big_a = k2 + 0.5 * k4;

        let (next, k0_star) = if psi <= PSI_CRITICAL {
            let b2 = 2.0 / psi - 1.0 + (2.0 / psi).sqrt() * (2.0 / psi - 1.0).sqrt();
            let b = b2.sqrt();
            let a = m / (1.0 + b2);
            let next = a * (b + dw[1]) * (b + dw[1]);
            let k0_star = if martingale && big_a < 1.0 / (2.0 * a) {
                -big_a * b2 * a / (1.0 - 2.0 * big_a * a) + 0.5 * (1.0 - 2.0 * big_a * a).ln()
                    - (k1 + 0.5 * k3) * v
            } else {
                k0
            };
            (next, k0_star)
        } else {
            let p = (psi - 1.0) / (psi + 1.0);
            let beta = (1.0 - p) / m;
            let u = normal_cdf(dw[1]);
            let next = if u <= p {
                0.0
            } else {
                ((1.0 - p) / (1.0 - u)).ln() / beta
            };
            let k0_star = if martingale && big_a < beta {
                -(p + beta * (1.0 - p) / (beta - big_a)).ln() - (k1 + 0.5 * k3) * v
            } else {
                k0
            };
            (next, k0_star)
        };

        HestonState {
            log_spot: state.log_spot
                + carry
                + k0_star
                + k1 * v
                + k2 * next
                + (k3 * v + k4 * next).max(0.0).sqrt() * dw[0],
            variance: next,
        }
    }
}

impl Versioned for HestonProcess {
    fn version(&self) -> Version {
        latest_version([
            self.stamp.get(),
            self.s0.version(),
            self.risk_free_rate.version(),
            self.dividend_yield.version(),
        ])
    }
}
