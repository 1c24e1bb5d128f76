//! Finite-difference engine for vanilla options under Black-Scholes.
//!
//! The pricing PDE is solved backwards in log-spot on a mesh concentrated
//! at the strike.  Early exercise enters as a step condition, cash
//! dividends as a jump condition at each payment time.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{
    DividendSchedule, Exercise, ExerciseType, Greeks, Payoff, PricingEngine, PricingResults,
    VanillaOptionArguments,
};
use ql_math::Array;
use ql_methods::finite_differences::{
    AmericanStepCondition, BermudanStepCondition, CompositeStepCondition, DividendStepCondition, Fdm1dMesher,
    Fdm1dSolution, FdmBackwardSolver, FdmBlackScholesMesher, FdmBlackScholesMesherParams, FdmBlackScholesOp,
    FdmBoundaryConditionSet, FdmMesherComposite,
};
use ql_methods::FdConfig;
use ql_processes::GeneralizedBlackScholesProcess;
use ql_termstructures::TermStructure;
use ql_time::Date;

/// Relative density of the mesh around the strike.
pub(crate) const STRIKE_DENSITY: Real = 0.1;

/// Finite-difference Black-Scholes engine for vanilla options.
#[derive(Debug)]
pub struct FdBlackScholesVanillaEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    config: FdConfig,
}

impl FdBlackScholesVanillaEngine {
    /// Engine with grid sizes and scheme from `config`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, config: FdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { process, config })
    }

    /// Grid settings.
    pub fn config(&self) -> &FdConfig {
        &self.config
    }
}

/// Dividends after `today` and up to `expiry`, as `(time, amount)`.
pub(crate) fn dividend_times(
    dividends: &DividendSchedule,
    today: Date,
    expiry: Date,
    time: impl Fn(Date) -> Result<Time>,
) -> Result<Vec<(Time, Real)>> {
    dividends
        .between(today, expiry)
        .map(|d| -> Result<(Time, Real)> { Ok((time(d.date)?, d.amount)) })
        .collect()
}

/// Early-exercise condition for `exercise` with intrinsic values
/// `exercise_values` on the grid, if any.
pub(crate) fn exercise_condition(
    exercise: &Exercise,
    exercise_values: Array,
    time: impl Fn(Date) -> Result<Time>,
) -> Result<Option<AmericanOrBermudan>> {
    Ok(match exercise.exercise_type() {
        ExerciseType::European => None,
        ExerciseType::American => Some(AmericanOrBermudan::American(AmericanStepCondition::new(exercise_values))),
        ExerciseType::Bermudan => {
            let times = exercise
                .dates()
                .iter()
                .map(|&d| time(d))
                .collect::<Result<Vec<_>>>()?;
            Some(AmericanOrBermudan::Bermudan(BermudanStepCondition::new(times, exercise_values)))
        }
    })
}

/// One of the two early-exercise conditions.
#[derive(Debug)]
pub(crate) enum AmericanOrBermudan {
    American(AmericanStepCondition),
    Bermudan(BermudanStepCondition),
}

impl AmericanOrBermudan {
    pub(crate) fn push_into(self, conditions: &mut CompositeStepCondition) {
        match self {
            Self::American(c) => conditions.push(Arc::new(c)),
            Self::Bermudan(c) => conditions.push(Arc::new(c)),
        }
    }
}

/// Value and Greeks at `spot` read off a one-dimensional solution.
pub(crate) fn results_at(solution: &Fdm1dSolution, spot: Real) -> Result<PricingResults> {
    let value = solution.value_at(spot)?;
    Ok(PricingResults::from_value(value).with_greeks(Greeks {
        delta: Some(solution.delta_at(spot)?),
        gamma: Some(solution.gamma_at(spot)?),
        theta: solution.theta_at(spot).ok(),
        ..Greeks::default()
    }))
}

impl PricingEngine<VanillaOptionArguments> for FdBlackScholesVanillaEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        let expiry = args.exercise.last_date();
        let maturity = self.process.time(expiry)?;
        ensure!(maturity > 0.0, "finite-difference engine needs an expiry after today, got {expiry}");
        let strike = args.payoff.strike();
        if matches!(args.payoff, Payoff::AssetOrNothing { .. } | Payoff::CashOrNothing { .. })
            && args.exercise.exercise_type() != ExerciseType::European
        {
            return Err(Error::Domain(format!(
                "early exercise of a {} payoff is not supported",
                args.payoff.name()
            )));
        }

        let today = self.process.risk_free_rate()?.reference_date()?;
        let time = |d: Date| self.process.time(d);
        let dividends = dividend_times(&args.dividends, today, expiry, time)?;
        let params = FdmBlackScholesMesherParams {
            concentration: (strike > 0.0).then_some((strike, STRIKE_DENSITY)),
            dividends: dividends.clone(),
            ..FdmBlackScholesMesherParams::default()
        };
        let x_mesher = FdmBlackScholesMesher::new(self.config.x_grid, &self.process, maturity, strike, &params)?;
        let x: Vec<Real> = x_mesher.locations().to_vec();
        let mesh = FdmMesherComposite::new(vec![Arc::new(x_mesher) as Arc<dyn Fdm1dMesher>])?;

        let payoff = args.payoff;
        let intrinsic = mesh.locations(0).map(|x| payoff.value(x.exp()));
        let mut conditions = CompositeStepCondition::new();
        if !dividends.is_empty() {
            conditions.push(Arc::new(DividendStepCondition::new(mesh.clone(), 0, dividends)));
        }
        if let Some(condition) = exercise_condition(&args.exercise, intrinsic.clone(), time)? {
            condition.push_into(&mut conditions);
        }

        let op = FdmBlackScholesOp::new(&mesh, Arc::clone(&self.process), strike);
        let mut solver = FdmBackwardSolver::new(
            Box::new(op),
            FdmBoundaryConditionSet::new(),
            conditions,
            self.config.scheme,
        );
        let mut values = intrinsic;
        let snapshot = solver.rollback_with_snapshot(
            &mut values,
            maturity,
            self.config.t_grid,
            self.config.damping_steps,
        )?;
        let solution = Fdm1dSolution::new(&x, &values, snapshot)?;
        let results = results_at(&solution, self.process.x0_value()?)?;
        debug!(
            x_grid = self.config.x_grid,
            t_grid = self.config.t_grid,
            value = results.value,
            "finite-difference Black-Scholes"
        );
        Ok(results)
    }
}

impl Versioned for FdBlackScholesVanillaEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_instruments::OptionType;
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
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.01, dc.clone()));
        let vol: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::with_vol(today(), 0.25, dc));
        let spot: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
            Handle::new(spot),
            Handle::new(q),
            Handle::new(r),
            Handle::new(vol),
        ))
    }

    fn engine() -> FdBlackScholesVanillaEngine {
        let config = FdConfig::default().with_t_grid(200).with_x_grid(200).with_damping_steps(2);
        FdBlackScholesVanillaEngine::new(process(), config).unwrap()
    }

    #[test]
    fn european_matches_the_analytic_engine() {
        let args = VanillaOptionArguments {
            payoff: Payoff::plain_vanilla(OptionType::Put, 105.0),
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::new(),
        };
        let fd = engine().calculate(&args).unwrap();
        let exact = AnalyticEuropeanEngine::new(process()).calculate(&args).unwrap();
        assert_abs_diff_eq!(fd.value, exact.value, epsilon = 1e-2);
        assert_abs_diff_eq!(fd.greeks.delta.unwrap(), exact.greeks.delta.unwrap(), epsilon = 1e-3);
        assert_abs_diff_eq!(fd.greeks.gamma.unwrap(), exact.greeks.gamma.unwrap(), epsilon = 1e-3);
        assert_abs_diff_eq!(fd.greeks.theta.unwrap(), exact.greeks.theta.unwrap(), epsilon = 5e-2);
    }

    #[test]
    fn american_put_carries_an_exercise_premium() {
        let payoff = Payoff::plain_vanilla(OptionType::Put, 105.0);
        let european = engine()
            .calculate(&VanillaOptionArguments {
                payoff,
                exercise: Exercise::european(today() + 365),
                dividends: DividendSchedule::new(),
            })
            .unwrap()
            .value;
        let american = engine()
            .calculate(&VanillaOptionArguments {
                payoff,
                exercise: Exercise::american(today(), today() + 365, false).unwrap(),
                dividends: DividendSchedule::new(),
            })
            .unwrap()
            .value;
        assert!(american > european + 0.1);
        assert!(american >= 5.0);
    }

    #[test]
    fn dividends_lower_the_call() {
        let payoff = Payoff::plain_vanilla(OptionType::Call, 100.0);
        let with = VanillaOptionArguments {
            payoff,
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::from_dates(&[today() + 180], &[3.0]).unwrap(),
        };
        let without = VanillaOptionArguments {
            dividends: DividendSchedule::new(),
            ..with.clone()
        };
        let fd = engine().calculate(&with).unwrap().value;
        assert!(fd < engine().calculate(&without).unwrap().value - 1.0);
        let escrowed = AnalyticEuropeanEngine::new(process()).calculate(&with).unwrap().value;
        assert_abs_diff_eq!(fd, escrowed, epsilon = 0.5);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(FdBlackScholesVanillaEngine::new(process(), FdConfig::default().with_t_grid(1)).is_err());
    }
}
