//! Heston stochastic volatility model.
//!
//! ```text
//! dS = (r − q)·S dt + √v·S dW₁
//! dv = κ(θ − v) dt + σ √v dW₂
//! dW₁·dW₂ = ρ dt
//! ```
//!
//! The model wraps a [`HestonProcess`] and exposes its parameters for
//! calibration together with the characteristic function of the
//! log-forward-moneyness `ln(S_T / F_T)`, which Fourier pricers integrate.

use std::sync::Arc;

use num_complex::Complex64;

use ql_core::errors::Result;
use ql_core::versioning::{Version, Versioned};
use ql_core::{Real, Time};
use ql_math::optimization::Constraint;
use ql_processes::HestonProcess;
use ql_termstructures::YieldTermStructure;

use crate::calibrated_model::{distribute, CalibratedModel, Parameter};

/// A model with Heston dynamics whose characteristic function is known in
/// closed form.
pub trait HestonCharacteristic: CalibratedModel + Versioned {
    /// Current spot.
    fn spot(&self) -> Result<Real>;

    /// Risk-free curve.
    fn risk_free_rate(&self) -> Result<Arc<dyn YieldTermStructure>>;

    /// Dividend curve.
    fn dividend_yield(&self) -> Result<Arc<dyn YieldTermStructure>>;

    /// `E[exp(i·u·ln(S_t / F_t))]` for complex `u`.
    fn characteristic_function(&self, u: Complex64, t: Time) -> Complex64;

    /// Initial variance.
    fn v0(&self) -> Real;

    /// Rough speed of decay of `|φ(u)|` for large real `u` up to time `t`:
    /// `|φ(u)| ≈ exp(−c·u)`.
    fn decay_rate(&self, t: Time) -> Real;
}

/// Propagate the Heston Riccati coefficients `(C, D)` over an interval of
/// length `tau` with constant parameters, starting from `(c0, d0)` at the
/// end of the interval.
///
/// Uses the form with `g = (b − d − σ²D₀)/(b + d − σ²D₀)` and `exp(−d·τ)`,
/// which keeps the complex logarithm on its principal branch.
#[allow(clippy::too_many_arguments)]
pub(crate) fn riccati_step(
    u: Complex64,
    tau: Time,
    kappa: Real,
    theta: Real,
    sigma: Real,
    rho: Real,
    c0: Complex64,
    d0: Complex64,
) -> (Complex64, Complex64) {
    let i = Complex64::i();
    let sigma2 = sigma * sigma;
    let b = kappa - rho * sigma * i * u;
    let d = (b * b + sigma2 * (u * u + i * u)).sqrt();
    let g = (b - d - sigma2 * d0) / (b + d - sigma2 * d0);
    let e = (-d * tau).exp();
    let one_minus_ge = 1.0 - g * e;
    let dd = ((b - d) - (b + d) * g * e) / (sigma2 * one_minus_ge);
    let cc = c0 + kappa * theta / sigma2 * ((b - d) * tau - 2.0 * (one_minus_ge / (1.0 - g)).ln());
    (cc, dd)
}

/// Decay rate of the Heston characteristic function in the Andersen-Piterbarg
/// bound, `√(1−ρ²)/σ · (v₀ + κθt)`.
pub(crate) fn heston_decay_rate(v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real, t: Time) -> Real {
    ((1.0 - rho * rho).sqrt() / sigma).clamp(1e-4, 0.2) * (v0 + kappa * theta * t)
}

/// Heston model with constant parameters.
///
/// The parameter vector is `[κ, θ, σ, ρ, v₀]`.
#[derive(Debug, Clone)]
pub struct HestonModel {
    process: HestonProcess,
    params: Vec<Parameter>,
}

impl HestonModel {
    /// Model on the parameters and market data of `process`.
    pub fn new(process: HestonProcess) -> Self {
        let params = vec![
            Parameter::constant(process.kappa(), Constraint::Positive),
            Parameter::constant(process.theta(), Constraint::Positive),
            Parameter::constant(process.sigma(), Constraint::Positive),
            Parameter::constant(process.rho(), Constraint::Boundary { low: -1.0, high: 1.0 }),
            Parameter::constant(process.v0(), Constraint::Positive),
        ];
        Self { process, params }
    }

    /// The process with the current parameters.
    pub fn process(&self) -> &HestonProcess {
        &self.process
    }

    /// Mean-reversion speed.
    pub fn kappa(&self) -> Real {
        self.process.kappa()
    }

    /// Long-run variance.
    pub fn theta(&self) -> Real {
        self.process.theta()
    }

    /// Volatility of variance.
    pub fn sigma(&self) -> Real {
        self.process.sigma()
    }

    /// Spot-variance correlation.
    pub fn rho(&self) -> Real {
        self.process.rho()
    }

    /// Feller condition: `2κθ > σ²`.
    pub fn feller_satisfied(&self) -> bool {
        2.0 * self.kappa() * self.theta() > self.sigma() * self.sigma()
    }
}

impl CalibratedModel for HestonModel {
    fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn set_params(&mut self, values: &[Real]) -> Result<()> {
        let mut params = self.params.clone();
        distribute(&mut params, values)?;
        let at = |i: usize| params[i].value(0.0);
        self.process = self.process.with_parameters(at(4), at(0), at(1), at(2), at(3))?;
        self.params = params;
        Ok(())
    }
}

impl HestonCharacteristic for HestonModel {
    fn spot(&self) -> Result<Real> {
        self.process.s0()
    }

    fn risk_free_rate(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.process.risk_free_rate()
    }

    fn dividend_yield(&self) -> Result<Arc<dyn YieldTermStructure>> {
        self.process.dividend_yield()
    }

    fn characteristic_function(&self, u: Complex64, t: Time) -> Complex64 {
        let zero = Complex64::new(0.0, 0.0);
        let (c, d) = riccati_step(u, t, self.kappa(), self.theta(), self.sigma(), self.rho(), zero, zero);
        (c + d * self.v0()).exp()
    }

    fn v0(&self) -> Real {
        self.process.v0()
    }

    fn decay_rate(&self, t: Time) -> Real {
        heston_decay_rate(self.v0(), self.kappa(), self.theta(), self.sigma(), self.rho(), t)
    }
}

impl Versioned for HestonModel {
    fn version(&self) -> Version {
        self.process.version()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_processes::HestonDiscretization;
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::FlatForward;
    use ql_time::{Actual365Fixed, Date};

    pub(crate) fn heston_process(v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real) -> HestonProcess {
        let today = Date::from_ymd(2025, 1, 2).unwrap();
        let dc = Arc::new(Actual365Fixed);
        let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.05, dc.clone()));
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.02, dc));
        let s: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        HestonProcess::new(
            Handle::new(r),
            Handle::new(q),
            Handle::new(s),
            v0,
            kappa,
            theta,
            sigma,
            rho,
            HestonDiscretization::default(),
        )
        .unwrap()
    }

    fn model() -> HestonModel {
        HestonModel::new(heston_process(0.04, 1.5, 0.04, 0.3, -0.7))
    }

    #[test]
    fn parameters_follow_the_process() {
        let m = model();
        assert_eq!(m.parameter_count(), 5);
        assert_eq!(m.params_array().to_vec(), vec![1.5, 0.04, 0.3, -0.7, 0.04]);
        assert!(m.feller_satisfied());
        assert!(m.constraint().test(&m.params_array()));
    }

    #[test]
    fn set_params_rebuilds_the_process() {
        let mut m = model();
        let before = m.version();
        m.set_params(&[2.0, 0.05, 0.4, -0.8, 0.06]).unwrap();
        assert_eq!(m.kappa(), 2.0);
        assert_eq!(m.theta(), 0.05);
        assert_eq!(m.sigma(), 0.4);
        assert_eq!(m.rho(), -0.8);
        assert_eq!(m.v0(), 0.06);
        assert!(m.version() > before);
        assert!(m.set_params(&[2.0, 0.05, 0.4, -1.5, 0.06]).is_err());
        assert_eq!(m.rho(), -0.8);
    }

    #[test]
    fn characteristic_function_is_normalized() {
        let m = model();
        let one = m.characteristic_function(Complex64::new(0.0, 0.0), 1.0);
        assert_abs_diff_eq!(one.re, 1.0, epsilon = 1e-14);
        // ln(S/F) is a martingale exponent: E[S/F] = 1
        let mart = m.characteristic_function(Complex64::new(0.0, -1.0), 1.0);
        assert_abs_diff_eq!(mart.re, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(mart.im, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn characteristic_function_matches_expected_variance() {
        // d²/du² of φ at zero gives −E[x²]; compare E[x] = −½∫E[v]
        let m = model();
        let t = 2.0;
        let h = 1e-4;
        let phi = |u: Real| m.characteristic_function(Complex64::new(u, 0.0), t);
        let mean = (phi(h) - phi(-h)).im / (2.0 * h);
        let expected_var_integral = m.theta() * t + (m.v0() - m.theta()) * (1.0 - (-m.kappa() * t).exp()) / m.kappa();
        assert_abs_diff_eq!(mean, -0.5 * expected_var_integral, epsilon = 1e-6);
    }

    #[test]
    fn decays_for_large_arguments() {
        let m = model();
        let far = m.characteristic_function(Complex64::new(200.0, 0.0), 1.0);
        assert!(far.norm() < 1e-6);
        assert!(m.decay_rate(1.0) > 0.0);
    }
}
