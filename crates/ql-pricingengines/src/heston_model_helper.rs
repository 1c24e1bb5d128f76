//! Calibration helper quoting a European option by its Black volatility.
//!
//! The helper prices the out-of-the-money option at its strike: a call
//! when the strike is above the forward, a put otherwise.

use tracing::trace;

use ql_core::errors::Result;
use ql_core::{ensure, Handle, Real, Time, Volatility};
use ql_instruments::OptionType;
use ql_models::{CalibrationErrorType, CalibrationHelper, HestonCharacteristic};
use ql_quotes::Quote;
use ql_termstructures::YieldTermStructure;
use ql_time::Date;

use crate::analytic_heston_engine::{heston_price, HestonIntegration, HestonIntegrator};
use crate::black_formula::{black_formula, black_formula_implied_std_dev};

/// Volatilities the implied-volatility error is clamped to.
const MIN_IMPLIED_VOL: Volatility = 1e-3;
const MAX_IMPLIED_VOL: Volatility = 10.0;

/// A European option quoted by its Black volatility, used to fit Heston
/// models.
#[derive(Debug, Clone)]
pub struct HestonModelHelper {
    expiry: Date,
    strike: Real,
    volatility: Handle<dyn Quote>,
    spot: Handle<dyn Quote>,
    risk_free_rate: Handle<dyn YieldTermStructure>,
    dividend_yield: Handle<dyn YieldTermStructure>,
    error_type: CalibrationErrorType,
    integrator: HestonIntegrator,
}

impl HestonModelHelper {
    /// Helper for the option expiring on `expiry` at `strike`, quoted at
    /// `volatility`.
    pub fn new(
        expiry: Date,
        strike: Real,
        volatility: Handle<dyn Quote>,
        spot: Handle<dyn Quote>,
        risk_free_rate: Handle<dyn YieldTermStructure>,
        dividend_yield: Handle<dyn YieldTermStructure>,
        error_type: CalibrationErrorType,
    ) -> Result<Self> {
        ensure!(strike > 0.0, "strike must be positive, got {strike}");
        Ok(Self {
            expiry,
            strike,
            volatility,
            spot,
            risk_free_rate,
            dividend_yield,
            error_type,
            integrator: HestonIntegration::default().prepare()?,
        })
    }

    /// Price model values with `integration` instead of the default rule.
    pub fn with_integration(mut self, integration: HestonIntegration) -> Result<Self> {
        self.integrator = integration.prepare()?;
        Ok(self)
    }

    /// Expiry date.
    pub fn expiry(&self) -> Date {
        self.expiry
    }

    /// Strike.
    pub fn strike(&self) -> Real {
        self.strike
    }

    /// How the residual is measured.
    pub fn error_type(&self) -> CalibrationErrorType {
        self.error_type
    }

    /// Time to expiry on the risk-free curve.
    pub fn maturity(&self) -> Result<Time> {
        let t = self.risk_free_rate.current()?.time_from_reference(self.expiry)?;
        ensure!(t > 0.0, "helper expired on {}", self.expiry);
        Ok(t)
    }

    /// `(option type, forward, discount)` at expiry.
    fn terms(&self, t: Time) -> Result<(OptionType, Real, Real)> {
        let discount = self.risk_free_rate.current()?.discount(t)?;
        let forward = self.spot.current()?.value()? * self.dividend_yield.current()?.discount(t)? / discount;
        let option_type = if self.strike >= forward {
            OptionType::Call
        } else {
            OptionType::Put
        };
        Ok((option_type, forward, discount))
    }

    /// Black price at volatility `vol`.
    pub fn black_price(&self, vol: Volatility) -> Result<Real> {
        let t = self.maturity()?;
        let (option_type, forward, discount) = self.terms(t)?;
        black_formula(option_type, self.strike, forward, vol * t.sqrt(), discount)
    }

    /// Black price at the quoted volatility.
    pub fn quoted_price(&self) -> Result<Real> {
        self.black_price(self.volatility.current()?.value()?)
    }
}

impl<M: HestonCharacteristic> CalibrationHelper<M> for HestonModelHelper {
    fn market_value(&self) -> Result<Real> {
        self.quoted_price()
    }

    fn model_value(&self, model: &M) -> Result<Real> {
        let t = self.maturity()?;
        let (option_type, _, _) = self.terms(t)?;
        Ok(heston_price(model, option_type, self.strike, t, &self.integrator)?.0)
    }

    fn calibration_error(&self, model: &M) -> Result<Real> {
        let model_value = self.model_value(model)?;
        let error = match self.error_type {
            CalibrationErrorType::PriceError => model_value - self.quoted_price()?,
            CalibrationErrorType::RelativePriceError => {
                let market = self.quoted_price()?;
                (model_value - market) / market
            }
            CalibrationErrorType::ImpliedVolError => {
                let quoted = self.volatility.current()?.value()?;
                if model_value <= self.black_price(MIN_IMPLIED_VOL)? {
                    MIN_IMPLIED_VOL - quoted
                } else if model_value >= self.black_price(MAX_IMPLIED_VOL)? {
                    MAX_IMPLIED_VOL - quoted
                } else {
                    let t = self.maturity()?;
                    let (option_type, forward, discount) = self.terms(t)?;
                    let std_dev = black_formula_implied_std_dev(
                        option_type,
                        self.strike,
                        forward,
                        model_value,
                        discount,
                        Some(quoted * t.sqrt()),
                        1e-12,
                        200,
                    )?;
                    std_dev / t.sqrt() - quoted
                }
            }
        };
        trace!(expiry = %self.expiry, strike = self.strike, error, "Heston helper");
        Ok(error)
    }
}
