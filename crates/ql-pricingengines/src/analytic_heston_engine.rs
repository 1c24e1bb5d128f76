//! Semi-analytic Heston engine.
//!
//! With `k = ln(K/F)` and `φ` the characteristic function of
//! `ln(S_T/F_T)`, the call price is
//!
//! ```text
//! C = D·[(F − K)/2 + 1/π ∫₀^∞ Re(e^{−iuk}·(F·φ(u − i) − K·φ(u)) / (iu)) du]
//! ```
//!
//! and puts follow by parity.  Gauss-Laguerre integrates over `[0, ∞)`
//! directly; every other rule works on `(0, 1]` after the substitution
//! `u = −ln(x)/c`, where `c` is the decay rate of `|φ|`.

use std::f64::consts::PI;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{ExerciseType, OptionType, PricingEngine, PricingResults, VanillaOptionArguments};
use ql_math::integrals::{
    DiscreteSimpsonIntegral, DiscreteTrapezoidIntegral, GaussKronrodAdaptive, GaussLobattoIntegral,
    GaussianQuadrature, Integrator,
};
use ql_models::{HestonCharacteristic, HestonModel};
use ql_termstructures::TermStructure;

/// Smallest abscissa at which the integrand is evaluated.
const MIN_ABSCISSA: Real = 1e-8;

/// Integration rule of the Heston pricing integral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum HestonIntegration {
    /// Gauss-Laguerre on `[0, ∞)`.
    GaussLaguerre {
        /// Number of nodes.
        order: usize,
    },
    /// Gauss-Legendre.
    GaussLegendre {
        /// Number of nodes.
        order: usize,
    },
    /// Gauss-Chebyshev of the first kind.
    GaussChebyshev {
        /// Number of nodes.
        order: usize,
    },
    /// Gauss-Chebyshev of the second kind.
    GaussChebyshev2nd {
        /// Number of nodes.
        order: usize,
    },
    /// Simpson's rule on equally spaced points.
    DiscreteSimpson {
        /// Number of points.
        evaluations: usize,
    },
    /// Trapezoid rule on equally spaced points.
    DiscreteTrapezoid {
        /// Number of points.
        evaluations: usize,
    },
    /// Adaptive Gauss-Lobatto.
    GaussLobatto {
        /// Absolute accuracy.
        absolute_accuracy: Real,
        /// Relative accuracy, if any.
        relative_accuracy: Option<Real>,
        /// Evaluation budget.
        max_evaluations: usize,
    },
    /// Adaptive Gauss-Kronrod (G7/K15).
    GaussKronrod {
        /// Absolute tolerance.
        tolerance: Real,
        /// Evaluation budget.
        max_evaluations: usize,
    },
}

impl Default for HestonIntegration {
    fn default() -> Self {
        Self::GaussLaguerre { order: 128 }
    }
}

impl HestonIntegration {
    /// Build the integrator, computing Gaussian nodes once.
    pub fn prepare(&self) -> Result<HestonIntegrator> {
        let kind = match *self {
            Self::GaussLaguerre { order } => Prepared::Laguerre(GaussianQuadrature::laguerre(order, 0.0)?),
            Self::GaussLegendre { order } => Prepared::Gaussian(GaussianQuadrature::legendre(order)?),
            Self::GaussChebyshev { order } => Prepared::Gaussian(GaussianQuadrature::chebyshev(order)?),
            Self::GaussChebyshev2nd { order } => Prepared::Gaussian(GaussianQuadrature::chebyshev_2nd(order)?),
            Self::DiscreteSimpson { evaluations } => Prepared::Simpson(DiscreteSimpsonIntegral::new(evaluations)?),
            Self::DiscreteTrapezoid { evaluations } => {
                Prepared::Trapezoid(DiscreteTrapezoidIntegral::new(evaluations)?)
            }
            Self::GaussLobatto {
                absolute_accuracy,
                relative_accuracy,
                max_evaluations,
            } => Prepared::Lobatto(GaussLobattoIntegral::new(max_evaluations, absolute_accuracy, relative_accuracy)),
            Self::GaussKronrod {
                tolerance,
                max_evaluations,
            } => Prepared::Kronrod(GaussKronrodAdaptive::new(tolerance, max_evaluations)),
        };
        Ok(HestonIntegrator { kind })
    }
}

#[derive(Debug, Clone)]
enum Prepared {
    Laguerre(GaussianQuadrature),
    Gaussian(GaussianQuadrature),
    Simpson(DiscreteSimpsonIntegral),
    Trapezoid(DiscreteTrapezoidIntegral),
    Lobatto(GaussLobattoIntegral),
    Kronrod(GaussKronrodAdaptive),
}

/// A prepared [`HestonIntegration`] rule.
#[derive(Debug, Clone)]
pub struct HestonIntegrator {
    kind: Prepared,
}

impl HestonIntegrator {
    /// `∫₀^∞ f(u) du` for an integrand decaying like `exp(−c·u)`.
    ///
    /// Returns the integral and the number of integrand evaluations.
    pub fn integrate(&self, f: impl Fn(Real) -> Real, c: Real) -> Result<(Real, usize)> {
        ensure!(c > 0.0, "decay rate must be positive, got {c}");
        // u = −ln(x)/c maps (0, 1] onto [0, ∞)
        let mapped = |x: Real| {
            if x <= 0.0 {
                0.0
            } else {
                f((-x.ln() / c).max(MIN_ABSCISSA)) / (c * x)
            }
        };
        Ok(match &self.kind {
            Prepared::Laguerre(q) => (q.integrate(|u| f(u.max(MIN_ABSCISSA))), q.order()),
            Prepared::Gaussian(q) => (q.integrate_on(mapped, 0.0, 1.0), q.order()),
            Prepared::Simpson(i) => (i.integrate(mapped, 0.0, 1.0)?, i.number_of_evaluations()),
            Prepared::Trapezoid(i) => (i.integrate(mapped, 0.0, 1.0)?, i.number_of_evaluations()),
            Prepared::Lobatto(i) => (i.integrate(mapped, 0.0, 1.0)?, i.number_of_evaluations()),
            Prepared::Kronrod(i) => (i.integrate(mapped, 0.0, 1.0)?, i.number_of_evaluations()),
        })
    }
}

/// Present value of a European plain vanilla option under `model`, with
/// time to expiry `t`.
///
/// Returns the value and the number of integrand evaluations.
pub fn heston_price<M: HestonCharacteristic + ?Sized>(
    model: &M,
    option_type: OptionType,
    strike: Real,
    t: Time,
    integrator: &HestonIntegrator,
) -> Result<(Real, usize)> {
    ensure!(strike > 0.0, "strike must be positive, got {strike}");
    ensure!(t >= 0.0, "time to expiry must be non-negative, got {t}");
    let discount = model.risk_free_rate()?.discount(t)?;
    let forward = model.spot()? * model.dividend_yield()?.discount(t)? / discount;
    let phi = option_type.sign();
    if t == 0.0 {
        return Ok((discount * (phi * (forward - strike)).max(0.0), 0));
    }

    let k = (strike / forward).ln();
    let i = Complex64::i();
    let integrand = |u: Real| {
        let z = Complex64::new(u, 0.0);
        let numerator = forward * model.characteristic_function(z - i, t) - strike * model.characteristic_function(z, t);
        ((-i * u * k).exp() * numerator / (i * u)).re
    };
    let (integral, evaluations) = integrator.integrate(integrand, model.decay_rate(t))?;
    let call = discount * (0.5 * (forward - strike) + integral / PI);
    let value = match option_type {
        OptionType::Call => call,
        OptionType::Put => call - discount * (forward - strike),
    };
    ensure!(value.is_finite(), "Heston integral did not produce a finite value");
    Ok((value, evaluations))
}

/// Semi-analytic engine for European plain vanilla options under any
/// model with a Heston characteristic function.
#[derive(Debug)]
pub struct AnalyticHestonEngine<M: HestonCharacteristic + ?Sized = HestonModel> {
    model: Arc<M>,
    integration: HestonIntegration,
    integrator: HestonIntegrator,
    evaluations: AtomicUsize,
}

impl<M: HestonCharacteristic + ?Sized> AnalyticHestonEngine<M> {
    /// Engine with 128-point Gauss-Laguerre integration.
    pub fn new(model: Arc<M>) -> Result<Self> {
        Self::with_integration(model, HestonIntegration::default())
    }

    /// Engine with the given integration rule.
    pub fn with_integration(model: Arc<M>, integration: HestonIntegration) -> Result<Self> {
        Ok(Self {
            model,
            integrator: integration.prepare()?,
            integration,
            evaluations: AtomicUsize::new(0),
        })
    }

    /// Integration rule.
    pub fn integration(&self) -> HestonIntegration {
        self.integration
    }

    /// Integrand evaluations used by the last calculation.
    pub fn number_of_evaluations(&self) -> usize {
        self.evaluations.load(Ordering::Relaxed)
    }
}

impl<M: HestonCharacteristic + ?Sized> PricingEngine<VanillaOptionArguments> for AnalyticHestonEngine<M> {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::European {
            return Err(Error::Domain(format!(
                "analytic Heston engine cannot price {} exercise",
                args.exercise
            )));
        }
        if !args.payoff.is_plain_vanilla() {
            return Err(Error::Domain(format!(
                "analytic Heston engine needs a plain vanilla payoff, got {}",
                args.payoff.name()
            )));
        }
        if !args.dividends.is_empty() {
            return Err(Error::Domain("analytic Heston engine does not handle discrete dividends".into()));
        }
        let expiry = args.exercise.last_date();
        let t = self.model.risk_free_rate()?.time_from_reference(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");
        let (value, evaluations) = heston_price(
            self.model.as_ref(),
            args.payoff.option_type(),
            args.payoff.strike(),
            t,
            &self.integrator,
        )?;
        self.evaluations.store(evaluations, Ordering::Relaxed);
        debug!(integration = ?self.integration, t, evaluations, value, "analytic Heston");
        Ok(PricingResults::from_value(value).with_result("evaluations", evaluations as Real))
    }
}

impl<M: HestonCharacteristic + ?Sized> Versioned for AnalyticHestonEngine<M> {
    fn version(&self) -> Version {
        self.model.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_instruments::{DividendSchedule, Exercise, Payoff};
    use ql_processes::{HestonDiscretization, HestonProcess};
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::{FlatForward, YieldTermStructure};
    use ql_time::{Actual365Fixed, Date};

    use crate::black_formula::black_formula;

    fn today() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    fn model(v0: Real, kappa: Real, theta: Real, sigma: Real, rho: Real) -> Arc<HestonModel> {
        let dc = Arc::new(Actual365Fixed);
        let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.05, dc.clone()));
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.02, dc));
        let s: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        let process = HestonProcess::new(
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
        .unwrap();
        Arc::new(HestonModel::new(process))
    }

    fn args(option_type: OptionType, strike: Real) -> VanillaOptionArguments {
        VanillaOptionArguments {
            payoff: Payoff::plain_vanilla(option_type, strike),
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::new(),
        }
    }

    #[test]
    fn small_vol_of_vol_reduces_to_black() {
        let engine = AnalyticHestonEngine::new(model(0.04, 1.0, 0.04, 1e-3, 0.0)).unwrap();
        let (d, dq) = ((-0.05_f64).exp(), (-0.02_f64).exp());
        for strike in [80.0, 100.0, 120.0] {
            let heston = engine.calculate(&args(OptionType::Call, strike)).unwrap().value;
            let black = black_formula(OptionType::Call, strike, 100.0 * dq / d, 0.2, d).unwrap();
            assert_abs_diff_eq!(heston, black, epsilon = 1e-3);
        }
        assert_eq!(engine.number_of_evaluations(), 128);
    }

    #[test]
    fn put_call_parity() {
        let engine = AnalyticHestonEngine::new(model(0.04, 1.5, 0.06, 0.5, -0.6)).unwrap();
        let call = engine.calculate(&args(OptionType::Call, 95.0)).unwrap().value;
        let put = engine.calculate(&args(OptionType::Put, 95.0)).unwrap().value;
        let (d, dq) = ((-0.05_f64).exp(), (-0.02_f64).exp());
        assert_abs_diff_eq!(call - put, 100.0 * dq - 95.0 * d, epsilon = 1e-10);
    }

    #[test]
    fn integration_descriptors_round_trip_through_json() {
        let rule = HestonIntegration::GaussLobatto {
            absolute_accuracy: 1e-8,
            relative_accuracy: None,
            max_evaluations: 10_000,
        };
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains("\"rule\":\"gauss_lobatto\""));
        assert_eq!(serde_json::from_str::<HestonIntegration>(&json).unwrap(), rule);
    }

    #[test]
    fn rejects_american_exercise() {
        let engine = AnalyticHestonEngine::new(model(0.04, 1.0, 0.04, 0.3, -0.5)).unwrap();
        let american = VanillaOptionArguments {
            exercise: Exercise::american(today(), today() + 365, false).unwrap(),
            ..args(OptionType::Put, 100.0)
        };
        assert!(matches!(engine.calculate(&american), Err(Error::Domain(_))));
    }
}
