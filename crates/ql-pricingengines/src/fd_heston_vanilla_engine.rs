//! Finite-difference engine for vanilla options under Heston.
//!
//! Solves the two-factor pricing PDE on a log-spot × variance mesh with
//! one of the ADI schemes.  The spot mesh is sized with the volatility of
//! the expected average variance.

use std::sync::Arc;

use tracing::debug;

use ql_core::ensure;
use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_instruments::{ExerciseType, Greeks, Payoff, PricingEngine, PricingResults, VanillaOptionArguments};
use ql_methods::finite_differences::{
    CompositeStepCondition, DividendStepCondition, Fdm1dMesher, Fdm2dSolution, FdmBackwardSolver,
    FdmBlackScholesMesher, FdmBlackScholesMesherParams, FdmBoundaryConditionSet, FdmHestonOp,
    FdmHestonVarianceMesher, FdmMesherComposite,
};
use ql_methods::FdConfig;
use ql_models::{HestonCharacteristic, HestonModel};
use ql_time::Date;

use crate::fd_black_scholes_vanilla_engine::{dividend_times, exercise_condition, STRIKE_DENSITY};

/// Finite-difference Heston engine for European, American and Bermudan
/// vanilla options.
#[derive(Debug)]
pub struct FdHestonVanillaEngine {
    model: Arc<HestonModel>,
    config: FdConfig,
}

impl FdHestonVanillaEngine {
    /// Engine on `model` with grid sizes and scheme from `config`.
    pub fn new(model: Arc<HestonModel>, config: FdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { model, config })
    }

    /// Grid settings.
    pub fn config(&self) -> &FdConfig {
        &self.config
    }
}

impl PricingEngine<VanillaOptionArguments> for FdHestonVanillaEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        let process = self.model.process();
        let expiry = args.exercise.last_date();
        let maturity = process.time(expiry)?;
        ensure!(maturity > 0.0, "finite-difference engine needs an expiry after today, got {expiry}");
        if matches!(args.payoff, Payoff::AssetOrNothing { .. } | Payoff::CashOrNothing { .. })
            && args.exercise.exercise_type() != ExerciseType::European
        {
            return Err(Error::Domain(format!(
                "early exercise of a {} payoff is not supported",
                args.payoff.name()
            )));
        }

        let strike = args.payoff.strike();
        let spot = process.s0()?;
        let r = process.risk_free_rate()?;
        let q = process.dividend_yield()?;
        let today = r.reference_date()?;
        let time = |d: Date| process.time(d);
        let dividends = dividend_times(&args.dividends, today, expiry, time)?;

        let v_mesher = FdmHestonVarianceMesher::new(self.config.v_grid, process, maturity)?;
        let params = FdmBlackScholesMesherParams {
            concentration: (strike > 0.0).then_some((strike, STRIKE_DENSITY)),
            dividends: dividends.clone(),
            ..FdmBlackScholesMesherParams::default()
        };
        let x_mesher = FdmBlackScholesMesher::with_volatility(
            self.config.x_grid,
            spot,
            r.as_ref(),
            q.as_ref(),
            maturity,
            v_mesher.vol_estimate(),
            &params,
        )?;
        let x = x_mesher.locations().to_vec();
        let v = v_mesher.locations().to_vec();
        let mesh = FdmMesherComposite::new(vec![
            Arc::new(x_mesher) as Arc<dyn Fdm1dMesher>,
            Arc::new(v_mesher) as Arc<dyn Fdm1dMesher>,
        ])?;

        let payoff = args.payoff;
        let intrinsic = mesh.locations(0).map(|x| payoff.value(x.exp()));
        let mut conditions = CompositeStepCondition::new();
        if !dividends.is_empty() {
            conditions.push(Arc::new(DividendStepCondition::new(mesh.clone(), 0, dividends)));
        }
        if let Some(condition) = exercise_condition(&args.exercise, intrinsic.clone(), time)? {
            condition.push_into(&mut conditions);
        }

        let op = FdmHestonOp::new(&mesh, Arc::new(process.clone()))?;
        let mut solver = FdmBackwardSolver::new(
            Box::new(op),
            FdmBoundaryConditionSet::new(),
            conditions,
            self.config.scheme,
        );
        let mut values = intrinsic;
        let snapshot =
            solver.rollback_with_snapshot(&mut values, maturity, self.config.t_grid, self.config.damping_steps)?;
        let solution = Fdm2dSolution::new(&x, &v, &values, snapshot)?;

        let v0 = self.model.v0();
        let value = solution.value_at(spot, v0)?;
        debug!(
            x_grid = self.config.x_grid,
            v_grid = self.config.v_grid,
            t_grid = self.config.t_grid,
            scheme = ?self.config.scheme,
            value,
            "finite-difference Heston"
        );
        Ok(PricingResults::from_value(value).with_greeks(Greeks {
            delta: Some(solution.delta_at(spot, v0)?),
            gamma: Some(solution.gamma_at(spot, v0)?),
            theta: solution.theta_at(spot, v0).ok(),
            ..Greeks::default()
        }))
    }
}

impl Versioned for FdHestonVanillaEngine {
    fn version(&self) -> Version {
        self.model.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_instruments::{DividendSchedule, Exercise, OptionType};
    use ql_methods::FdmSchemeDesc;
    use ql_processes::{HestonDiscretization, HestonProcess};
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::{FlatForward, YieldTermStructure};
    use ql_time::Actual365Fixed;

    use crate::analytic_heston_engine::AnalyticHestonEngine;

    fn today() -> Date {
        Date::from_ymd(2025, 1, 2).unwrap()
    }

    fn model() -> Arc<HestonModel> {
        let dc = Arc::new(Actual365Fixed);
        let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.05, dc.clone()));
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today(), 0.02, dc));
        let s: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        let process = HestonProcess::new(
            Handle::new(r),
            Handle::new(q),
            Handle::new(s),
            0.04,
            1.5,
            0.04,
            0.3,
            -0.7,
            HestonDiscretization::default(),
        )
        .unwrap();
        Arc::new(HestonModel::new(process))
    }

    fn config() -> FdConfig {
        FdConfig::default()
            .with_t_grid(100)
            .with_x_grid(100)
            .with_v_grid(40)
            .with_damping_steps(2)
            .with_scheme(FdmSchemeDesc::hundsdorfer())
    }

    #[test]
    fn european_put_matches_the_semi_analytic_price() {
        let args = VanillaOptionArguments {
            payoff: Payoff::plain_vanilla(OptionType::Put, 100.0),
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::new(),
        };
        let fd = FdHestonVanillaEngine::new(model(), config()).unwrap().calculate(&args).unwrap();
        let exact = AnalyticHestonEngine::new(model()).unwrap().calculate(&args).unwrap();
        assert_abs_diff_eq!(fd.value, exact.value, epsilon = 5e-2);
        assert!(fd.greeks.delta.unwrap() < 0.0);
    }

    #[test]
    fn american_put_is_worth_more() {
        let payoff = Payoff::plain_vanilla(OptionType::Put, 100.0);
        let engine = FdHestonVanillaEngine::new(model(), config()).unwrap();
        let european = engine
            .calculate(&VanillaOptionArguments {
                payoff,
                exercise: Exercise::european(today() + 365),
                dividends: DividendSchedule::new(),
            })
            .unwrap()
            .value;
        let american = engine
            .calculate(&VanillaOptionArguments {
                payoff,
                exercise: Exercise::american(today(), today() + 365, false).unwrap(),
                dividends: DividendSchedule::new(),
            })
            .unwrap()
            .value;
        assert!(american > european);
    }
}
