//! Analytic barrier option engine.
//!
//! Prices European single-barrier options on a plain vanilla payoff with the
//! closed-form solution of Reiner & Rubinstein (1991), as tabulated by Haug.
//! Rebates are paid at the hitting time for knock-outs and at expiry for
//! knock-ins that never knock in.
//!
//! The formula assumes constant coefficients; the engine uses the zero
//! rates to expiry and the Black volatility at the strike.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{
    BarrierOptionArguments, BarrierType, ExerciseType, OptionType, PricingEngine, PricingResults,
};
use ql_math::normal_cdf;
use ql_processes::GeneralizedBlackScholesProcess;

/// Analytic barrier option engine (Reiner-Rubinstein).
#[derive(Debug)]
pub struct AnalyticBarrierEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
}

impl AnalyticBarrierEngine {
    /// Engine on `process`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>) -> Self {
        Self { process }
    }
}

/// Market and contract inputs of [`analytic_barrier_price`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarrierInputs {
    /// Call or put.
    pub option_type: OptionType,
    /// Barrier type.
    pub barrier_type: BarrierType,
    /// Spot price.
    pub spot: Real,
    /// Strike.
    pub strike: Real,
    /// Barrier level.
    pub barrier: Real,
    /// Rebate.
    pub rebate: Real,
    /// Continuously compounded risk-free rate.
    pub r: Real,
    /// Continuously compounded dividend yield.
    pub q: Real,
    /// Volatility.
    pub sigma: Real,
    /// Time to expiry.
    pub t: Time,
}

/// Closed-form barrier option price for all eight up/down × in/out ×
/// call/put combinations.
///
/// The spot must not already be beyond the barrier.
pub fn analytic_barrier_price(inputs: &BarrierInputs) -> Real {
    let BarrierInputs {
        option_type,
        barrier_type,
        spot,
        strike,
        barrier,
        rebate,
        r,
        q,
        sigma,
        t,
    } = *inputs;

    if t <= 0.0 {
        return if barrier_type.is_knock_in() {
            rebate
        } else {
            (option_type.sign() * (spot - strike)).max(0.0)
        };
    }

    let sigma2 = sigma * sigma;
    let std_dev = sigma * t.sqrt();
    let mu = (r - q - 0.5 * sigma2) / sigma2;
    let lambda = (mu * mu * sigma2 + 2.0 * r).sqrt() / sigma;
    let z = (barrier / spot).ln() / std_dev + lambda * std_dev;

    let phi = option_type.sign();
    let eta = if barrier_type.is_down() { 1.0 } else { -1.0 };

    let x1 = (spot / strike).ln() / std_dev + (1.0 + mu) * std_dev;
    let x2 = (spot / barrier).ln() / std_dev + (1.0 + mu) * std_dev;
    let y1 = (barrier * barrier / (spot * strike)).ln() / std_dev + (1.0 + mu) * std_dev;
    let y2 = (barrier / spot).ln() / std_dev + (1.0 + mu) * std_dev;

    let df_r = (-r * t).exp();
    let df_q = (-q * t).exp();
    let hs_2mu = (barrier / spot).powf(2.0 * mu);
    let hs_2mu1 = (barrier / spot).powf(2.0 * (mu + 1.0));

    // Reiner-Rubinstein building blocks A to F
    let a = phi * spot * df_q * normal_cdf(phi * x1) - phi * strike * df_r * normal_cdf(phi * (x1 - std_dev));
    let b = phi * spot * df_q * normal_cdf(phi * x2) - phi * strike * df_r * normal_cdf(phi * (x2 - std_dev));
    let c = phi * spot * df_q * hs_2mu1 * normal_cdf(eta * y1)
        - phi * strike * df_r * hs_2mu * normal_cdf(eta * (y1 - std_dev));
    let d = phi * spot * df_q * hs_2mu1 * normal_cdf(eta * y2)
        - phi * strike * df_r * hs_2mu * normal_cdf(eta * (y2 - std_dev));
    let e = rebate * df_r * (normal_cdf(eta * (x2 - std_dev)) - hs_2mu * normal_cdf(eta * (y2 - std_dev)));
    let f = rebate
        * ((barrier / spot).powf(mu + lambda) * normal_cdf(eta * z)
            + (barrier / spot).powf(mu - lambda) * normal_cdf(eta * (z - 2.0 * lambda * std_dev)));

    let above = strike >= barrier;
    match (barrier_type, option_type) {
        (BarrierType::DownIn, OptionType::Call) if above => c + e,
        (BarrierType::DownIn, OptionType::Call) => a - b + d + e,
        (BarrierType::DownIn, OptionType::Put) if above => b - c + d + e,
        (BarrierType::DownIn, OptionType::Put) => a + e,

        (BarrierType::UpIn, OptionType::Call) if above => a + e,
        (BarrierType::UpIn, OptionType::Call) => b - c + d + e,
        (BarrierType::UpIn, OptionType::Put) if above => a - b + d + e,
        (BarrierType::UpIn, OptionType::Put) => c + e,

        (BarrierType::DownOut, OptionType::Call) if above => a - c + f,
        (BarrierType::DownOut, OptionType::Call) => b - d + f,
        (BarrierType::DownOut, OptionType::Put) if above => a - b + c - d + f,
        (BarrierType::DownOut, OptionType::Put) => f,

        (BarrierType::UpOut, OptionType::Call) if above => f,
        (BarrierType::UpOut, OptionType::Call) => a - b + c - d + f,
        (BarrierType::UpOut, OptionType::Put) if above => b - d + f,
        (BarrierType::UpOut, OptionType::Put) => a - c + f,
    }
}

impl PricingEngine<BarrierOptionArguments> for AnalyticBarrierEngine {
    fn calculate(&self, args: &BarrierOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::European {
            return Err(Error::Domain(format!(
                "analytic barrier engine cannot price {} exercise",
                args.exercise
            )));
        }
        if !args.payoff.is_plain_vanilla() {
            return Err(Error::Domain(format!(
                "analytic barrier engine needs a plain vanilla payoff, got {}",
                args.payoff.name()
            )));
        }
        let spot = self.process.x0_value()?;
        if args.barrier_type.is_triggered(spot, args.barrier) {
            return Err(Error::Domain(format!(
                "barrier {} already touched by spot {spot}",
                args.barrier
            )));
        }
        let expiry = args.exercise.last_date();
        let t = self.process.time(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");

        let strike = args.payoff.strike();
        let (r, q) = if t > 0.0 {
            (
                -self.process.discount(t)?.ln() / t,
                -self.process.dividend_discount(t)?.ln() / t,
            )
        } else {
            (0.0, 0.0)
        };
        let sigma = self.process.black_volatility(t, strike)?;
        ensure!(sigma > 0.0, "barrier engine needs a positive volatility");

        let value = analytic_barrier_price(&BarrierInputs {
            option_type: args.payoff.option_type(),
            barrier_type: args.barrier_type,
            spot,
            strike,
            barrier: args.barrier,
            rebate: args.rebate,
            r,
            q,
            sigma,
            t,
        });
        debug!(barrier_type = ?args.barrier_type, barrier = args.barrier, t, value, "analytic barrier");
        Ok(PricingResults::from_value(value))
    }
}

impl Versioned for AnalyticBarrierEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}
