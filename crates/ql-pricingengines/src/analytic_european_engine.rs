//! Analytic European option engine (Black-Scholes-Merton).
//!
//! Prices European options with any of the four payoffs in closed form.
//! Discrete cash dividends paid before expiry are handled by the escrowed
//! dividend model: their present value is taken off the spot before the
//! forward is built.
//!
//! Greeks are analytic; theta follows from the pricing PDE with the
//! average rates and volatility over the life of the option.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real};
use ql_instruments::{
    DividendSchedule, ExerciseType, Greeks, PricingEngine, PricingResults, VanillaOptionArguments,
};
use ql_processes::GeneralizedBlackScholesProcess;
use ql_termstructures::TermStructure;
use ql_time::Date;

use crate::black_formula::BlackCalculator;

/// Analytic pricing engine for European options.
///
/// With `D` and `D_q` the risk-free and dividend discount factors to
/// expiry and `s` the total Black standard deviation at the strike,
///
/// ```text
/// F = (S − Σ D(tᵢ)·divᵢ)·D_q / D
/// V = D·(α·F·N(φd₁) + β·N(φd₂))
/// ```
///
/// where `(α, β)` depend on the payoff.
#[derive(Debug)]
pub struct AnalyticEuropeanEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
}

impl AnalyticEuropeanEngine {
    /// Engine on `process`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>) -> Self {
        Self { process }
    }

    /// The underlying process.
    pub fn process(&self) -> &Arc<GeneralizedBlackScholesProcess> {
        &self.process
    }
}

/// Spot less the present value of the dividends paid after the process's
/// reference date and up to `expiry`.
pub(crate) fn escrowed_spot(
    process: &GeneralizedBlackScholesProcess,
    dividends: &DividendSchedule,
    expiry: Date,
) -> Result<Real> {
    let spot = process.x0_value()?;
    if dividends.is_empty() {
        return Ok(spot);
    }
    let today = process.risk_free_rate()?.reference_date()?;
    let mut escrowed = spot;
    for d in dividends.between(today, expiry) {
        escrowed -= d.amount * process.discount(process.time(d.date)?)?;
    }
    ensure!(
        escrowed > 0.0,
        "dividends worth more than the spot {spot} before {expiry}"
    );
    Ok(escrowed)
}

impl PricingEngine<VanillaOptionArguments> for AnalyticEuropeanEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::European {
            return Err(Error::Domain(format!(
                "analytic European engine cannot price {} exercise",
                args.exercise
            )));
        }
        let expiry = args.exercise.last_date();
        let t = self.process.time(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");

        let strike = args.payoff.strike();
        let spot = escrowed_spot(&self.process, &args.dividends, expiry)?;
        let discount = self.process.discount(t)?;
        let dividend_discount = self.process.dividend_discount(t)?;
        let variance = self.process.black_variance(t, strike)?;
        let forward = spot * dividend_discount / discount;
        let black = BlackCalculator::new(&args.payoff, forward, variance.sqrt(), discount)?;

        let value = black.value();
        let theta = if t > 0.0 { Some(black.theta(spot, t)?) } else { None };
        debug!(payoff = %args.payoff, t, forward, variance, value, "analytic European");

        Ok(PricingResults::from_value(value)
            .with_greeks(Greeks {
                delta: Some(black.delta(spot)),
                gamma: Some(black.gamma(spot)),
                vega: Some(black.vega(t)),
                theta,
                rho: Some(black.rho(t)),
                dividend_rho: Some(black.dividend_rho(t)),
            })
            .with_result("forward", forward)
            .with_result("std_dev", variance.sqrt())
            .with_result("itm_cash_probability", black.itm_cash_probability()))
    }
}

impl Versioned for AnalyticEuropeanEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}
