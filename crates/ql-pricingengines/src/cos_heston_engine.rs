//! Fourier-cosine (COS) engine for European options under Heston.
//!
//! The density of `y = ln(S_T/K)` is expanded in a cosine series on a
//! truncation range `[a, b]` built from its first two cumulants.  Puts are
//! priced from the series and calls by parity, which keeps the expansion
//! insensitive to the size of the truncation range.

use std::f64::consts::PI;
use std::sync::Arc;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{ExerciseType, OptionType, PricingEngine, PricingResults, VanillaOptionArguments};
use ql_models::{HestonCharacteristic, HestonModel};

/// Truncation width and number of terms of the cosine expansion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CosConfig {
    /// Half-width of the truncation range in standard deviations.
    pub l: Real,
    /// Number of cosine terms.
    pub n: usize,
}

impl Default for CosConfig {
    fn default() -> Self {
        Self { l: 16.0, n: 200 }
    }
}

impl CosConfig {
    /// Set the truncation width.
    pub fn with_l(mut self, l: Real) -> Self {
        self.l = l;
        self
    }

    /// Set the number of terms.
    pub fn with_n(mut self, n: usize) -> Self {
        self.n = n;
        self
    }

    /// Check the settings.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.l > 0.0, "truncation width must be positive, got {}", self.l);
        ensure!(self.n >= 2, "at least two cosine terms needed, got {}", self.n);
        Ok(())
    }
}

/// COS engine for European plain vanilla options.
#[derive(Debug)]
pub struct CosHestonEngine {
    model: Arc<HestonModel>,
    config: CosConfig,
}

impl CosHestonEngine {
    /// Engine on `model` with expansion settings `config`.
    pub fn new(model: Arc<HestonModel>, config: CosConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// First cumulant of `ln(S_t/F_t)`.
    pub fn c1(&self, t: Time) -> Real {
        let m = &self.model;
        let (kappa, theta, v0) = (m.kappa(), m.theta(), m.v0());
        (1.0 - (-kappa * t).exp()) * (theta - v0) / (2.0 * kappa) - 0.5 * theta * t
    }

    /// Second cumulant of `ln(S_t/F_t)`.
    ///
    /// With `I = ∫v ds` the variance is `E[I] − σρ·J1 + σ²/4·J2`, where
    /// `J1`, `J2` integrate `B(t−u)` and `B(t−u)²` against `E[v_u]` and
    /// `B(τ) = (1 − e^{−κτ})/κ`.
    pub fn c2(&self, t: Time) -> Real {
        let m = &self.model;
        let (kappa, theta, sigma, rho, v0) = (m.kappa(), m.theta(), m.sigma(), m.rho(), m.v0());
        let kappa2 = kappa * kappa;
        let e = (-kappa * t).exp();
        let delta = v0 - theta;
        let mean_integrated = theta * t + delta * (1.0 - e) / kappa;
        let j1 = theta * (t - (1.0 - e) / kappa) / kappa + delta * ((1.0 - e) / kappa - t * e) / kappa;
        let j2 = theta * (t - 2.0 * (1.0 - e) / kappa + (1.0 - e * e) / (2.0 * kappa)) / kappa2
            + delta * ((1.0 - e * e) / kappa - 2.0 * t * e) / kappa2;
        mean_integrated - sigma * rho * j1 + 0.25 * sigma * sigma * j2
    }

    /// Undiscounted put value divided by the strike, for log-moneyness
    /// `x0 = ln(F/K)`.
    fn put_series(&self, x0: Real, t: Time) -> Real {
        let width = self.config.l * self.c2(t).abs().sqrt();
        let centre = x0 + self.c1(t);
        let (a, b) = (centre - width, centre + width);
        let d = b.min(0.0);
        if d <= a {
            return 0.0;
        }
        let span = b - a;
        let i = Complex64::i();
        (0..self.config.n)
            .map(|k| {
                let w = k as Real * PI / span;
                let chi = {
                    let (cd, sd) = ((w * (d - a)).cos(), (w * (d - a)).sin());
                    (cd * d.exp() - a.exp() + w * sd * d.exp()) / (1.0 + w * w)
                };
                let psi = if k == 0 { d - a } else { (w * (d - a)).sin() / w };
                let u_k = 2.0 / span * (psi - chi);
                let phi = self.model.characteristic_function(Complex64::new(w, 0.0), t) * (i * w * (x0 - a)).exp();
                let term = phi.re * u_k;
                if k == 0 {
                    0.5 * term
                } else {
                    term
                }
            })
            .sum()
    }
}

impl PricingEngine<VanillaOptionArguments> for CosHestonEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::European {
            return Err(Error::Domain(format!(
                "COS Heston engine cannot price {} exercise",
                args.exercise
            )));
        }
        if !args.payoff.is_plain_vanilla() {
            return Err(Error::Domain(format!(
                "COS Heston engine needs a plain vanilla payoff, got {}",
                args.payoff.name()
            )));
        }
        if !args.dividends.is_empty() {
            return Err(Error::Domain("COS Heston engine does not handle discrete dividends".into()));
        }
        let r = self.model.risk_free_rate()?;
        let expiry = args.exercise.last_date();
        let t = r.time_from_reference(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");

        let strike = args.payoff.strike();
        let discount = r.discount(t)?;
        let forward = self.model.spot()? * self.model.dividend_yield()?.discount(t)? / discount;
        let put = if t > 0.0 {
            discount * strike * self.put_series((forward / strike).ln(), t)
        } else {
            discount * (strike - forward).max(0.0)
        };
        let value = match args.payoff.option_type() {
            OptionType::Put => put,
            OptionType::Call => put + discount * (forward - strike),
        };
        debug!(l = self.config.l, n = self.config.n, t, value, "COS Heston");
        Ok(PricingResults::from_value(value))
    }
}

impl Versioned for CosHestonEngine {
    fn version(&self) -> Version {
        self.model.version()
    }
}
