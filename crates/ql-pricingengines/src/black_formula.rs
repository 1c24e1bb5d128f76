//! Black formula on the forward and its inverse.
//!
//! [`BlackCalculator`] values a European payoff of the form
//!
//! ```text
//! V = D·(α·F·N(φd₁) + β·N(φd₂))
//! ```
//!
//! and differentiates it analytically in the forward and in the standard
//! deviation.  Spot Greeks follow from `F = S·D_q/D`.

use ql_core::errors::Result;
use ql_core::{ensure, Real, Time};
use ql_instruments::{OptionType, Payoff};
use ql_math::solvers1d::{Brent, Solver1D};
use ql_math::{normal_cdf, normal_pdf};

/// Standard deviations below this are treated as zero.
const MIN_STD_DEV: Real = 1e-14;

/// Value and sensitivities of a European payoff on a lognormal forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlackCalculator {
    phi: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
    alpha: Real,
    beta: Real,
    d1: Real,
    d2: Real,
    cum_d1: Real,
    cum_d2: Real,
    n_d1: Real,
    n_d2: Real,
    degenerate: bool,
}

impl BlackCalculator {
    /// Calculator for `payoff` on `forward` with total standard deviation
    /// `std_dev` and discount factor `discount`.
    pub fn new(payoff: &Payoff, forward: Real, std_dev: Real, discount: Real) -> Result<Self> {
        let strike = payoff.strike();
        ensure!(forward > 0.0, "forward must be positive, got {forward}");
        ensure!(strike >= 0.0, "strike must be non-negative, got {strike}");
        ensure!(std_dev >= 0.0, "standard deviation must be non-negative, got {std_dev}");
        ensure!(discount > 0.0, "discount must be positive, got {discount}");

        let phi = payoff.option_type().sign();
        let (alpha, beta) = match *payoff {
            Payoff::PlainVanilla { .. } => (phi, -phi * strike),
            Payoff::CashOrNothing { cash, .. } => (0.0, cash),
            Payoff::AssetOrNothing { .. } => (1.0, 0.0),
            Payoff::Gap { second_strike, .. } => (phi, -phi * second_strike),
        };

        let degenerate = std_dev < MIN_STD_DEV || strike == 0.0;
        let (d1, d2, cum_d1, cum_d2, n_d1, n_d2) = if degenerate {
            let itm = if phi * (forward - strike) > 0.0 { 1.0 } else { 0.0 };
            (0.0, 0.0, itm, itm, 0.0, 0.0)
        } else {
            let d1 = (forward / strike).ln() / std_dev + 0.5 * std_dev;
            let d2 = d1 - std_dev;
            (
                d1,
                d2,
                normal_cdf(phi * d1),
                normal_cdf(phi * d2),
                normal_pdf(d1),
                normal_pdf(d2),
            )
        };
        Ok(Self {
            phi,
            forward,
            std_dev,
            discount,
            alpha,
            beta,
            d1,
            d2,
            cum_d1,
            cum_d2,
            n_d1,
            n_d2,
            degenerate,
        })
    }

    /// Present value.
    pub fn value(&self) -> Real {
        self.discount * (self.alpha * self.forward * self.cum_d1 + self.beta * self.cum_d2)
    }

    /// `∂V/∂F`.
    pub fn delta_forward(&self) -> Real {
        if self.degenerate {
            return self.discount * self.alpha * self.cum_d1;
        }
        let (f, s, phi) = (self.forward, self.std_dev, self.phi);
        self.discount * (self.alpha * (self.cum_d1 + phi * self.n_d1 / s) + self.beta * phi * self.n_d2 / (f * s))
    }

    /// `∂²V/∂F²`.
    pub fn gamma_forward(&self) -> Real {
        if self.degenerate {
            return 0.0;
        }
        let (f, s, phi) = (self.forward, self.std_dev, self.phi);
        self.discount
            * (self.alpha * phi * self.n_d1 / (f * s) * (1.0 - self.d1 / s)
                - self.beta * phi * self.n_d2 * (self.d2 / s + 1.0) / (f * f * s))
    }

    /// `∂V/∂S` for an underlying at `spot`.
    pub fn delta(&self, spot: Real) -> Real {
        self.delta_forward() * self.forward / spot
    }

    /// `∂²V/∂S²` for an underlying at `spot`.
    pub fn gamma(&self, spot: Real) -> Real {
        let ratio = self.forward / spot;
        self.gamma_forward() * ratio * ratio
    }

    /// `∂V/∂s` with `s` the total standard deviation.
    pub fn std_dev_derivative(&self) -> Real {
        if self.degenerate {
            return 0.0;
        }
        let (f, s, phi) = (self.forward, self.std_dev, self.phi);
        self.discount
            * (self.alpha * f * phi * self.n_d1 * (1.0 - self.d1 / s) - self.beta * phi * self.n_d2 * self.d1 / s)
    }

    /// `∂V/∂σ` for time to expiry `maturity`.
    pub fn vega(&self, maturity: Time) -> Real {
        self.std_dev_derivative() * maturity.sqrt()
    }

    /// `∂V/∂r` for time to expiry `maturity`.
    pub fn rho(&self, maturity: Time) -> Real {
        maturity * (self.forward * self.delta_forward() - self.value())
    }

    /// `∂V/∂q` for time to expiry `maturity`.
    pub fn dividend_rho(&self, maturity: Time) -> Real {
        -maturity * self.forward * self.delta_forward()
    }

    /// `∂V/∂t` for an underlying at `spot` and time to expiry `maturity`,
    /// from the pricing PDE with the average rates over `[0, maturity]`.
    pub fn theta(&self, spot: Real, maturity: Time) -> Result<Real> {
        ensure!(maturity > 0.0, "theta needs a positive time to expiry, got {maturity}");
        let r = -self.discount.ln() / maturity;
        let carry = (self.forward / spot).ln() / maturity;
        let variance = self.std_dev * self.std_dev / maturity;
        Ok(r * self.value() - carry * spot * self.delta(spot) - 0.5 * variance * spot * spot * self.gamma(spot))
    }

    /// Probability under the forward measure of ending in the money,
    /// `N(φd₂)`.
    pub fn itm_cash_probability(&self) -> Real {
        self.cum_d2
    }
}

/// Undiscounted-forward Black price of a plain vanilla option.
pub fn black_formula(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    std_dev: Real,
    discount: Real,
) -> Result<Real> {
    Ok(BlackCalculator::new(&Payoff::plain_vanilla(option_type, strike), forward, std_dev, discount)?.value())
}

/// Total standard deviation at which [`black_formula`] returns `price`.
///
/// Fails with a precondition error if `price` lies outside the no-arbitrage
/// bounds and with a convergence error if the root is not found within
/// `max_evaluations`.
#[allow(clippy::too_many_arguments)]
pub fn black_formula_implied_std_dev(
    option_type: OptionType,
    strike: Real,
    forward: Real,
    price: Real,
    discount: Real,
    guess: Option<Real>,
    accuracy: Real,
    max_evaluations: usize,
) -> Result<Real> {
    ensure!(discount > 0.0, "discount must be positive, got {discount}");
    let phi = option_type.sign();
    let intrinsic = discount * (phi * (forward - strike)).max(0.0);
    let upper = match option_type {
        OptionType::Call => discount * forward,
        OptionType::Put => discount * strike,
    };
    ensure!(
        price >= intrinsic,
        "option price {price} below intrinsic value {intrinsic}"
    );
    ensure!(price < upper, "option price {price} not below its upper bound {upper}");
    if price == intrinsic {
        return Ok(0.0);
    }
    let guess = guess.unwrap_or_else(|| {
        // Brenner-Subrahmanyam at the money, moved off zero
        (price / (0.4 * discount * forward)).clamp(0.01, 2.0)
    });
    let target = |s: Real| black_formula(option_type, strike, forward, s, discount).map_or(Real::NAN, |v| v - price);
    Brent::new(max_evaluations)
        .with_lower_bound(0.0)
        .solve(target, accuracy, guess, 0.1 * guess)
}
