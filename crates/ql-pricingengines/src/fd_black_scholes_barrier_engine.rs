//! Finite-difference engine for single-barrier options.
//!
//! Knock-outs are solved on a mesh ending at the barrier, with the rebate
//! imposed there.  Knock-ins follow from in-out parity: the vanilla value
//! less the knock-out without rebate, plus the rebate paid at expiry on
//! the paths that never touch the barrier.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{
    BarrierOptionArguments, DividendSchedule, ExerciseType, PricingEngine, PricingResults, VanillaOptionArguments,
};
use ql_math::Array;
use ql_methods::finite_differences::{
    BoundarySide, CompositeStepCondition, Fdm1dMesher, Fdm1dSolution, FdmBackwardSolver, FdmBlackScholesMesher,
    FdmBlackScholesMesherParams, FdmBlackScholesOp, FdmBoundaryConditionSet, FdmDirichletBoundary,
    FdmMesherComposite,
};
use ql_methods::FdConfig;
use ql_processes::GeneralizedBlackScholesProcess;

use crate::fd_black_scholes_vanilla_engine::{results_at, FdBlackScholesVanillaEngine, STRIKE_DENSITY};

/// Finite-difference Black-Scholes engine for European barrier options.
#[derive(Debug)]
pub struct FdBlackScholesBarrierEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    config: FdConfig,
}

impl FdBlackScholesBarrierEngine {
    /// Engine with grid sizes and scheme from `config`.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, config: FdConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { process, config })
    }

    /// Knock-out value of `terminal` with `rebate` on the barrier.
    fn knock_out(
        &self,
        args: &BarrierOptionArguments,
        maturity: Time,
        terminal: impl Fn(Real) -> Real,
        rebate: Real,
    ) -> Result<PricingResults> {
        let strike = args.payoff.strike();
        let log_barrier = args.barrier.ln();
        let mut params = FdmBlackScholesMesherParams {
            concentration: (strike > 0.0).then_some((strike, STRIKE_DENSITY)),
            ..FdmBlackScholesMesherParams::default()
        };
        let side = if args.barrier_type.is_down() {
            params.x_min = Some(log_barrier);
            BoundarySide::Lower
        } else {
            params.x_max = Some(log_barrier);
            BoundarySide::Upper
        };
        let x_mesher = FdmBlackScholesMesher::new(self.config.x_grid, &self.process, maturity, strike, &params)?;
        let x: Vec<Real> = x_mesher.locations().to_vec();
        let mesh = FdmMesherComposite::new(vec![Arc::new(x_mesher) as Arc<dyn Fdm1dMesher>])?;

        let mut bc = FdmBoundaryConditionSet::new();
        bc.push(FdmDirichletBoundary::new(mesh.layout(), 0, side, rebate));
        let mut values: Array = mesh.locations(0).map(|x| terminal(x.exp()));
        let edge = match side {
            BoundarySide::Lower => 0,
            BoundarySide::Upper => values.len() - 1,
        };
        values[edge] = rebate;

        let op = FdmBlackScholesOp::new(&mesh, Arc::clone(&self.process), strike);
        let mut solver = FdmBackwardSolver::new(Box::new(op), bc, CompositeStepCondition::new(), self.config.scheme);
        let snapshot =
            solver.rollback_with_snapshot(&mut values, maturity, self.config.t_grid, self.config.damping_steps)?;
        results_at(&Fdm1dSolution::new(&x, &values, snapshot)?, self.process.x0_value()?)
    }
}

fn combine(vanilla: &PricingResults, knock_out: &PricingResults, digital: &PricingResults, rebate: Real) -> PricingResults {
    let mix = |v: Option<Real>, k: Option<Real>, d: Option<Real>| match (v, k) {
        (Some(v), Some(k)) => Some(v - k + rebate * d.unwrap_or(0.0)),
        _ => None,
    };
    let mut results = PricingResults::from_value(vanilla.value - knock_out.value + rebate * digital.value);
    results.greeks.delta = mix(vanilla.greeks.delta, knock_out.greeks.delta, digital.greeks.delta);
    results.greeks.gamma = mix(vanilla.greeks.gamma, knock_out.greeks.gamma, digital.greeks.gamma);
    results.greeks.theta = mix(vanilla.greeks.theta, knock_out.greeks.theta, digital.greeks.theta);
    results
}

impl PricingEngine<BarrierOptionArguments> for FdBlackScholesBarrierEngine {
    fn calculate(&self, args: &BarrierOptionArguments) -> Result<PricingResults> {
        if args.exercise.exercise_type() != ExerciseType::European {
            return Err(Error::Domain(format!(
                "finite-difference barrier engine cannot price {} exercise",
                args.exercise
            )));
        }
        let spot = self.process.x0_value()?;
        if args.barrier_type.is_triggered(spot, args.barrier) {
            return Err(Error::Domain(format!(
                "barrier {} already touched by spot {spot}",
                args.barrier
            )));
        }
        ensure!(args.barrier > 0.0, "barrier must be positive, got {}", args.barrier);
        let expiry = args.exercise.last_date();
        let maturity = self.process.time(expiry)?;
        ensure!(maturity > 0.0, "finite-difference engine needs an expiry after today, got {expiry}");

        let payoff = args.payoff;
        let results = if args.barrier_type.is_knock_in() {
            let vanilla = FdBlackScholesVanillaEngine::new(Arc::clone(&self.process), self.config.clone())?
                .calculate(&VanillaOptionArguments {
                    payoff,
                    exercise: args.exercise.clone(),
                    dividends: DividendSchedule::new(),
                })?;
            let knock_out = self.knock_out(args, maturity, |s| payoff.value(s), 0.0)?;
            let digital = if args.rebate != 0.0 {
                self.knock_out(args, maturity, |_| 1.0, 0.0)?
            } else {
                PricingResults::default()
            };
            combine(&vanilla, &knock_out, &digital, args.rebate)
        } else {
            self.knock_out(args, maturity, |s| payoff.value(s), args.rebate)?
        };
        debug!(barrier_type = ?args.barrier_type, barrier = args.barrier, value = results.value, "finite-difference barrier");
        Ok(results)
    }
}

impl Versioned for FdBlackScholesBarrierEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}
