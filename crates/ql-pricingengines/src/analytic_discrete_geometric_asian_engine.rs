//! Closed-form engine for discretely monitored geometric-average options.
//!
//! Under Black-Scholes the geometric average of `N` fixings is lognormal.
//! With `n` fixings still to come at times `t₁ < … < tₙ`, and `L` the
//! sum of the logarithms of the fixings already observed,
//!
//! ```text
//! μ  = (L + Σᵢ ln(S·D_q(tᵢ)/D(tᵢ)) − ½ Σᵢ σ²tᵢ) / N
//! s² = σ² / N² · Σᵢ (2(n − i) − 1)·tᵢ          (i = 1 … n)
//! ```
//!
//! and the option is a Black option on the forward `exp(μ + s²/2)`.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{
    AsianOptionArguments, AverageType, FixingSplit, Greeks, PricingEngine, PricingResults,
};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::black_formula::BlackCalculator;

/// Observed fixings and times of the fixings still to come.
pub(crate) fn fixing_schedule(
    process: &GeneralizedBlackScholesProcess,
    args: &AsianOptionArguments,
) -> Result<(FixingSplit, Vec<Time>)> {
    let today = process.risk_free_rate()?.reference_date()?;
    let split = args.split_fixings(today)?;
    let times = split
        .future
        .iter()
        .map(|&d| process.time(d))
        .collect::<Result<Vec<_>>>()?;
    Ok((split, times))
}

/// Lognormal law of the geometric average.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GeometricAverage {
    pub(crate) forward: Real,
    pub(crate) std_dev: Real,
    /// Power of the spot in the forward, `n/N`.
    pub(crate) exponent: Real,
}

pub(crate) fn geometric_average(
    process: &GeneralizedBlackScholesProcess,
    split: &FixingSplit,
    times: &[Time],
    strike: Real,
) -> Result<GeometricAverage> {
    let total = split.total() as Real;
    let spot = process.x0_value()?;
    let mut log_sum = split.running_log_sum();
    for &t in times {
        let carry = (spot * process.dividend_discount(t)? / process.discount(t)?).ln();
        log_sum += carry - 0.5 * process.black_variance(t, strike)?;
    }
    let mu = log_sum / total;
    let variance = match times.last() {
        Some(&last) if last > 0.0 => {
            let n = times.len();
            let vol = process.black_volatility(last, strike)?;
            let weighted: Real = times
                .iter()
                .enumerate()
                .map(|(i, &t)| (2 * (n - i) - 1) as Real * t)
                .sum();
            vol * vol * weighted / (total * total)
        }
        _ => 0.0,
    };
    Ok(GeometricAverage {
        forward: (mu + 0.5 * variance).exp(),
        std_dev: variance.sqrt(),
        exponent: times.len() as Real / total,
    })
}

/// Analytic engine for geometric-average Asian options.
#[derive(Debug)]
pub struct AnalyticDiscreteGeometricAsianEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
}

impl AnalyticDiscreteGeometricAsianEngine {
    /// Engine on `process`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>) -> Self {
        Self { process }
    }
}

impl PricingEngine<AsianOptionArguments> for AnalyticDiscreteGeometricAsianEngine {
    fn calculate(&self, args: &AsianOptionArguments) -> Result<PricingResults> {
        if args.average_type != AverageType::Geometric {
            return Err(Error::Domain(
                "analytic discrete Asian engine prices geometric averages only".into(),
            ));
        }
        let expiry = args.exercise.last_date();
        let t = self.process.time(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");

        let strike = args.payoff.strike();
        let (split, times) = fixing_schedule(&self.process, args)?;
        let average = geometric_average(&self.process, &split, &times, strike)?;
        let black = BlackCalculator::new(&args.payoff, average.forward, average.std_dev, self.process.discount(t)?)?;

        let spot = self.process.x0_value()?;
        let a = average.exponent;
        let dfds = average.forward * a / spot;
        let d2fds2 = average.forward * a * (a - 1.0) / (spot * spot);
        let value = black.value();
        debug!(
            past = split.past.len(),
            future = times.len(),
            forward = average.forward,
            std_dev = average.std_dev,
            value,
            "analytic geometric Asian"
        );
        Ok(PricingResults::from_value(value)
            .with_greeks(Greeks {
                delta: Some(black.delta_forward() * dfds),
                gamma: Some(black.gamma_forward() * dfds * dfds + black.delta_forward() * d2fds2),
                ..Greeks::default()
            })
            .with_result("forward", average.forward)
            .with_result("std_dev", average.std_dev))
    }
}

impl Versioned for AnalyticDiscreteGeometricAsianEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}
