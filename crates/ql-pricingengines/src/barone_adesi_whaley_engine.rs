//! Barone-Adesi-Whaley approximation for American options.
//!
//! The early-exercise premium is approximated by the solution of a
//! quadratic in the spot; the critical price at which exercise becomes
//! optimal is found by a Newton iteration started from the Barone-Adesi
//! and Whaley seed.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, DiscountFactor, Real};
use ql_instruments::{ExerciseType, OptionType, PricingEngine, PricingResults, VanillaOptionArguments};
use ql_math::{normal_cdf, normal_pdf};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::black_formula::black_formula;

/// Relative accuracy of the critical price.
const CRITICAL_PRICE_TOLERANCE: Real = 1e-6;

/// Newton iterations allowed for the critical price.
const MAX_ITERATIONS: usize = 100;

/// Barone-Adesi-Whaley American option engine.
#[derive(Debug)]
pub struct BaroneAdesiWhaleyEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
}

impl BaroneAdesiWhaleyEngine {
    /// Engine on `process`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>) -> Self {
        Self { process }
    }
}

/// Coefficients shared by the critical-price search and the premium.
struct Quadratic {
    n: Real,
    k: Real,
    sqrt_variance: Real,
}

impl Quadratic {
    fn new(risk_free_discount: DiscountFactor, dividend_discount: DiscountFactor, variance: Real) -> Self {
        let n = 2.0 * (dividend_discount / risk_free_discount).ln() / variance;
        let k = if (risk_free_discount - 1.0).abs() > 1e-12 {
            -2.0 * risk_free_discount.ln() / (variance * (1.0 - risk_free_discount))
        } else {
            2.0 / variance
        };
        Self {
            n,
            k,
            sqrt_variance: variance.sqrt(),
        }
    }

    /// Exponent of the premium, `q₂` for calls and `q₁` for puts.
    fn exponent(&self, option_type: OptionType) -> Real {
        let root = ((self.n - 1.0) * (self.n - 1.0) + 4.0 * self.k).sqrt();
        0.5 * (-(self.n - 1.0) + option_type.sign() * root)
    }
}

/// Spot above (calls) or below (puts) which immediate exercise is optimal.
pub fn critical_price(
    option_type: OptionType,
    strike: Real,
    risk_free_discount: DiscountFactor,
    dividend_discount: DiscountFactor,
    variance: Real,
) -> Result<Real> {
    let phi = option_type.sign();
    let n = 2.0 * (dividend_discount / risk_free_discount).ln() / variance;
    let m = -2.0 * risk_free_discount.ln() / variance;
    let carry = (dividend_discount / risk_free_discount).ln();
    let std_dev = variance.sqrt();

    // seed from the perpetual option
    let qu = 0.5 * (-(n - 1.0) + phi * ((n - 1.0) * (n - 1.0) + 4.0 * m).sqrt());
    let su = strike / (1.0 - 1.0 / qu);
    let mut si = match option_type {
        OptionType::Call => {
            let h = -(carry + 2.0 * std_dev) * strike / (su - strike);
            strike + (su - strike) * (1.0 - h.exp())
        }
        OptionType::Put => {
            let h = (carry - 2.0 * std_dev) * strike / (strike - su);
            su + (strike - su) * h.exp()
        }
    };

    let q = Quadratic::new(risk_free_discount, dividend_discount, variance).exponent(option_type);
    let evaluate = |si: Real| -> Result<(Real, Real, Real)> {
        let forward = si * dividend_discount / risk_free_discount;
        let d1 = ((forward / strike).ln() + 0.5 * variance) / std_dev;
        let european = black_formula(option_type, strike, forward, std_dev, risk_free_discount)?;
        let cum = normal_cdf(phi * d1);
        let lhs = phi * (si - strike);
        let rhs = european + phi * (1.0 - dividend_discount * cum) * si / q;
        let slope = phi * dividend_discount * cum * (1.0 - 1.0 / q)
            + phi * (1.0 - phi * dividend_discount * normal_pdf(d1) / std_dev) / q;
        Ok((lhs, rhs, slope))
    };

    let (mut lhs, mut rhs, mut bi) = evaluate(si)?;
    let mut iterations = 0;
    while (lhs - rhs).abs() / strike > CRITICAL_PRICE_TOLERANCE {
        if iterations == MAX_ITERATIONS {
            return Err(Error::Convergence(format!(
                "critical price not found after {MAX_ITERATIONS} iterations (last {si})"
            )));
        }
        si = match option_type {
            OptionType::Call => (strike + rhs - bi * si) / (1.0 - bi),
            OptionType::Put => (strike - rhs + bi * si) / (1.0 + bi),
        };
        ensure!(si.is_finite() && si > 0.0, "critical price iteration diverged");
        (lhs, rhs, bi) = evaluate(si)?;
        iterations += 1;
    }
    Ok(si)
}

/// Barone-Adesi-Whaley value of an American plain vanilla option.
pub fn barone_adesi_whaley(
    option_type: OptionType,
    spot: Real,
    strike: Real,
    risk_free_discount: DiscountFactor,
    dividend_discount: DiscountFactor,
    variance: Real,
) -> Result<Real> {
    ensure!(spot > 0.0, "spot must be positive, got {spot}");
    ensure!(strike > 0.0, "strike must be positive, got {strike}");
    let phi = option_type.sign();
    let intrinsic = (phi * (spot - strike)).max(0.0);
    if variance <= 0.0 {
        let forward = spot * dividend_discount / risk_free_discount;
        return Ok(intrinsic.max(black_formula(option_type, strike, forward, 0.0, risk_free_discount)?));
    }

    let forward = spot * dividend_discount / risk_free_discount;
    let std_dev = variance.sqrt();
    let european = black_formula(option_type, strike, forward, std_dev, risk_free_discount)?;
    if option_type == OptionType::Call && dividend_discount >= 1.0 {
        // early exercise is never optimal
        return Ok(european);
    }

    let sk = critical_price(option_type, strike, risk_free_discount, dividend_discount, variance)?;
    let forward_sk = sk * dividend_discount / risk_free_discount;
    let d1 = ((forward_sk / strike).ln() + 0.5 * variance) / std_dev;
    let q = Quadratic::new(risk_free_discount, dividend_discount, variance).exponent(option_type);
    let a = phi * (sk / q) * (1.0 - dividend_discount * normal_cdf(phi * d1));
    let exercise_now = match option_type {
        OptionType::Call => spot >= sk,
        OptionType::Put => spot <= sk,
    };
    Ok(if exercise_now {
        intrinsic
    } else {
        european + a * (spot / sk).powf(q)
    })
}

impl PricingEngine<VanillaOptionArguments> for BaroneAdesiWhaleyEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::American {
            return Err(Error::Domain(format!(
                "Barone-Adesi-Whaley engine needs American exercise, got {}",
                args.exercise
            )));
        }
        if !args.payoff.is_plain_vanilla() {
            return Err(Error::Domain(format!(
                "Barone-Adesi-Whaley engine needs a plain vanilla payoff, got {}",
                args.payoff.name()
            )));
        }
        if !args.dividends.is_empty() {
            return Err(Error::Domain(
                "Barone-Adesi-Whaley engine does not handle discrete dividends".into(),
            ));
        }
        let expiry = args.exercise.last_date();
        let t = self.process.time(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");
        let strike = args.payoff.strike();
        let value = barone_adesi_whaley(
            args.payoff.option_type(),
            self.process.x0_value()?,
            strike,
            self.process.discount(t)?,
            self.process.dividend_discount(t)?,
            self.process.black_variance(t, strike)?,
        )?;
        debug!(t, strike, value, "Barone-Adesi-Whaley");
        Ok(PricingResults::from_value(value))
    }
}

impl Versioned for BaroneAdesiWhaleyEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    /// Short-dated options with `q = r = 10%`, `σ = 15%`, `T = 0.1`.
    fn short_dated(option_type: OptionType, spot: Real) -> Real {
        let (r, q, vol, t): (Real, Real, Real, Real) = (0.10, 0.10, 0.15, 0.1);
        barone_adesi_whaley(option_type, spot, 100.0, (-r * t).exp(), (-q * t).exp(), vol * vol * t).unwrap()
    }

    #[test]
    fn reference_values() {
        assert_abs_diff_eq!(short_dated(OptionType::Call, 90.0), 0.0206, epsilon = 3e-3);
        assert_abs_diff_eq!(short_dated(OptionType::Call, 100.0), 1.8771, epsilon = 3e-3);
        assert_abs_diff_eq!(short_dated(OptionType::Call, 110.0), 10.0089, epsilon = 3e-3);
        assert_abs_diff_eq!(short_dated(OptionType::Put, 90.0), 10.0000, epsilon = 3e-3);
        assert_abs_diff_eq!(short_dated(OptionType::Put, 100.0), 1.8770, epsilon = 3e-3);
        assert_abs_diff_eq!(short_dated(OptionType::Put, 110.0), 0.0410, epsilon = 3e-3);
    }

    #[test]
    fn call_without_dividends_is_european() {
        let (d, v) = ((-0.05_f64).exp(), 0.04);
        let american = barone_adesi_whaley(OptionType::Call, 100.0, 100.0, d, 1.0, v).unwrap();
        let european = black_formula(OptionType::Call, 100.0, 100.0 / d, v.sqrt(), d).unwrap();
        assert_abs_diff_eq!(american, european, epsilon = 1e-14);
    }

    #[test]
    fn put_premium_and_deep_exercise() {
        let (d, v) = ((-0.1_f64).exp(), 0.0625);
        let american = barone_adesi_whaley(OptionType::Put, 100.0, 100.0, d, 1.0, v).unwrap();
        let european = black_formula(OptionType::Put, 100.0, 100.0 / d, v.sqrt(), d).unwrap();
        assert!(american > european);
        let deep = barone_adesi_whaley(OptionType::Put, 50.0, 100.0, d, 1.0, v).unwrap();
        assert_abs_diff_eq!(deep, 50.0, epsilon = 1e-12);
        let sk = critical_price(OptionType::Put, 100.0, d, 1.0, v).unwrap();
        assert!(sk > 50.0 && sk < 100.0);
    }
}
