//! Monte Carlo engine for European options under Black-Scholes.
//!
//! Paths are exact lognormal draws on a uniform grid.  With
//! `control_variate` set, each sample is hedged with the discounted
//! terminal spot, whose mean is known, using the Black forward delta as
//! hedge ratio.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{ExerciseType, Payoff, PricingEngine, PricingResults, VanillaOptionArguments};
use ql_methods::monte_carlo::BlackScholesPathGenerator;
use ql_methods::{simulate_paths, McConfig, McOutcome, Path, PathPricer, TimeGrid};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::black_formula::BlackCalculator;

/// Discounted payoff of the terminal value, optionally hedged with the
/// discounted terminal value itself.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EuropeanPathPricer {
    payoff: Payoff,
    discount: Real,
    /// `(hedge ratio, forward)`.
    hedge: Option<(Real, Real)>,
}

impl EuropeanPathPricer {
    pub(crate) fn new(payoff: Payoff, discount: Real) -> Self {
        Self {
            payoff,
            discount,
            hedge: None,
        }
    }

    /// Hedge with `D·S_T − D·F` using the Black delta at total standard
    /// deviation `std_dev`.
    pub(crate) fn hedged(self, forward: Real, std_dev: Real) -> Result<Self> {
        let black = BlackCalculator::new(&self.payoff, forward, std_dev, self.discount)?;
        Ok(Self {
            hedge: Some((black.delta_forward() / self.discount, forward)),
            ..self
        })
    }
}

impl PathPricer for EuropeanPathPricer {
    fn price(&self, path: &Path) -> Result<Real> {
        let s = path.last();
        let value = self.discount * self.payoff.value(s);
        Ok(match self.hedge {
            Some((beta, forward)) => value - beta * self.discount * (s - forward),
            None => value,
        })
    }
}

/// European exercise without discrete dividends.
pub(crate) fn check_european(args: &VanillaOptionArguments, engine: &str) -> Result<()> {
    if args.exercise.exercise_type() != ExerciseType::European {
        return Err(Error::Domain(format!("{engine} cannot price {} exercise", args.exercise)));
    }
    if !args.dividends.is_empty() {
        return Err(Error::Domain(format!("{engine} does not handle discrete dividends")));
    }
    Ok(())
}

/// Results carrying the simulation statistics.
pub(crate) fn outcome_results(outcome: McOutcome) -> PricingResults {
    let results = PricingResults::from_value(outcome.value).with_result("samples", outcome.samples as Real);
    match outcome.error_estimate {
        Some(error) => results.with_error_estimate(error),
        None => results,
    }
}

/// Monte Carlo engine for European options with any payoff.
#[derive(Debug)]
pub struct McEuropeanEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    config: McConfig,
}

impl McEuropeanEngine {
    /// Engine with simulation settings `config`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, config: McConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { process, config })
    }

    /// Simulation settings.
    pub fn config(&self) -> &McConfig {
        &self.config
    }
}

impl PricingEngine<VanillaOptionArguments> for McEuropeanEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        check_european(args, "Monte Carlo European engine")?;
        let expiry = args.exercise.last_date();
        let t: Time = self.process.time(expiry)?;
        ensure!(t > 0.0, "Monte Carlo engine needs an expiry after today, got {expiry}");

        let strike = args.payoff.strike();
        let grid = TimeGrid::uniform(t, self.config.steps_for(t))?;
        let generator = BlackScholesPathGenerator::new(&self.process, grid, strike, self.config.brownian_bridge)?;
        let mut pricer = EuropeanPathPricer::new(args.payoff, self.process.discount(t)?);
        if self.config.control_variate {
            let std_dev = self.process.black_variance(t, strike)?.sqrt();
            pricer = pricer.hedged(self.process.forward(t)?, std_dev)?;
        }
        let outcome = simulate_paths(&self.config, &generator, &pricer)?;
        debug!(payoff = %args.payoff, t, control_variate = self.config.control_variate, "Monte Carlo European");
        Ok(outcome_results(outcome))
    }
}

impl Versioned for McEuropeanEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_instruments::{DividendSchedule, Exercise, OptionType};
    use ql_math::random_numbers::RngKind;
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, YieldTermStructure};
    use ql_time::{Actual365Fixed, Date};

    use crate::analytic_european_engine::AnalyticEuropeanEngine;

    fn today() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    fn process() -> Arc<GeneralizedBlackScholesProcess> {
        let dc = Arc::new(Actual365Fixed);
        let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.05, dc.clone()));
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.02, dc.clone()));
        let vol: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::with_vol(today(), 0.3, dc));
        let spot: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
            Handle::new(spot),
            Handle::new(q),
            Handle::new(r),
            Handle::new(vol),
        ))
    }

    fn args(payoff: Payoff) -> VanillaOptionArguments {
        VanillaOptionArguments {
            payoff,
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::new(),
        }
    }

    #[test]
    fn call_lies_within_the_error_estimate() {
        let a = args(Payoff::plain_vanilla(OptionType::Call, 105.0));
        let exact = AnalyticEuropeanEngine::new(process()).calculate(&a).unwrap().value;
        let config = McConfig::default().with_samples(50_000).with_antithetic(true);
        let mc = McEuropeanEngine::new(process(), config).unwrap().calculate(&a).unwrap();
        let error = mc.error_estimate.unwrap();
        assert!((mc.value - exact).abs() < 4.0 * error, "{} vs {exact} ± {error}", mc.value);
        assert_eq!(mc.additional_results["samples"], 50_000.0);
    }

    #[test]
    fn control_variate_shrinks_the_error() {
        let a = args(Payoff::plain_vanilla(OptionType::Call, 100.0));
        let base = McConfig::default().with_samples(20_000);
        let plain = McEuropeanEngine::new(process(), base.clone()).unwrap().calculate(&a).unwrap();
        let hedged = McEuropeanEngine::new(process(), base.with_control_variate(true))
            .unwrap()
            .calculate(&a)
            .unwrap();
        assert!(hedged.error_estimate.unwrap() < 0.7 * plain.error_estimate.unwrap());
        let exact = AnalyticEuropeanEngine::new(process()).calculate(&a).unwrap().value;
        assert!((hedged.value - exact).abs() < 4.0 * hedged.error_estimate.unwrap());
    }

    #[test]
    fn sobol_converges_without_error_estimate() {
        let a = args(Payoff::cash_or_nothing(OptionType::Call, 100.0, 10.0));
        let exact = AnalyticEuropeanEngine::new(process()).calculate(&a).unwrap().value;
        let config = McConfig::default().with_samples(8191).with_rng(RngKind::LowDiscrepancy);
        let mc = McEuropeanEngine::new(process(), config).unwrap().calculate(&a).unwrap();
        assert!(mc.error_estimate.is_none());
        assert_abs_diff_eq!(mc.value, exact, epsilon = 2e-2);
    }

    #[test]
    fn tolerance_mode_meets_the_target() {
        let a = args(Payoff::plain_vanilla(OptionType::Call, 100.0));
        let config = McConfig::default().with_tolerance(0.05).with_antithetic(true);
        let mc = McEuropeanEngine::new(process(), config).unwrap().calculate(&a).unwrap();
        assert!(mc.error_estimate.unwrap() <= 0.05);
    }

    #[test]
    fn unsupported_terms_are_domain_errors() {
        let engine = McEuropeanEngine::new(process(), McConfig::default().with_samples(100)).unwrap();
        let american = VanillaOptionArguments {
            exercise: Exercise::american(today(), today() + 365, false).unwrap(),
            ..args(Payoff::plain_vanilla(OptionType::Put, 100.0))
        };
        assert!(matches!(engine.calculate(&american), Err(Error::Domain(_))));
        let with_dividends = VanillaOptionArguments {
            dividends: DividendSchedule::from_dates(&[today() + 100], &[1.0]).unwrap(),
            ..args(Payoff::plain_vanilla(OptionType::Put, 100.0))
        };
        assert!(matches!(engine.calculate(&with_dividends), Err(Error::Domain(_))));
    }

    #[test]
    fn configuration_is_validated() {
        assert!(McEuropeanEngine::new(process(), McConfig::default()).is_err());
    }
}
