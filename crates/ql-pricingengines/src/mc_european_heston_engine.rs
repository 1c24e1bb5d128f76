//! Monte Carlo engine for European options under Heston.
//!
//! Paths follow the discretization of the model's process unless the
//! engine overrides it.  The control variate hedges with the discounted
//! terminal spot at the Black delta of the expected average variance.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::Result;
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{PricingEngine, PricingResults, VanillaOptionArguments};
use ql_methods::monte_carlo::HestonPathGenerator;
use ql_methods::{simulate_paths, McConfig, TimeGrid};
use ql_models::HestonModel;
use ql_processes::HestonDiscretization;

use crate::mc_european_engine::{check_european, outcome_results, EuropeanPathPricer};

/// Monte Carlo Heston engine for European options with any payoff.
#[derive(Debug)]
pub struct McEuropeanHestonEngine {
    model: Arc<HestonModel>,
    config: McConfig,
    discretization: Option<HestonDiscretization>,
}

impl McEuropeanHestonEngine {
    /// Engine with simulation settings `config`, which must fix the time
    /// steps.
    pub fn new(model: Arc<HestonModel>, config: McConfig) -> Result<Self> {
        config.validate()?;
        ensure!(
            config.time_steps.is_some() || config.time_steps_per_year.is_some(),
            "Heston paths need time steps or time steps per year"
        );
        Ok(Self {
            model,
            config,
            discretization: None,
        })
    }

    /// Simulate with `discretization` instead of the process's own.
    pub fn with_discretization(mut self, discretization: HestonDiscretization) -> Self {
        self.discretization = Some(discretization);
        self
    }

    /// Simulation settings.
    pub fn config(&self) -> &McConfig {
        &self.config
    }
}

/// `(1/t)·∫₀ᵗ E[v_s] ds`.
fn expected_average_variance(v0: Real, kappa: Real, theta: Real, t: Time) -> Real {
    let kt = kappa * t;
    if kt < 1e-8 {
        v0
    } else {
        theta + (v0 - theta) * (1.0 - (-kt).exp()) / kt
    }
}

impl PricingEngine<VanillaOptionArguments> for McEuropeanHestonEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        check_european(args, "Monte Carlo Heston engine")?;
        let process = match self.discretization {
            Some(d) => self.model.process().with_discretization(d),
            None => self.model.process().clone(),
        };
        let expiry = args.exercise.last_date();
        let t = process.time(expiry)?;
        ensure!(t > 0.0, "Monte Carlo engine needs an expiry after today, got {expiry}");

        let discount = process.discount(t)?;
        let forward = process.s0()? * process.dividend_discount(t)? / discount;
        let mut pricer = EuropeanPathPricer::new(args.payoff, discount);
        if self.config.control_variate {
            let variance = expected_average_variance(process.v0(), process.kappa(), process.theta(), t);
            pricer = pricer.hedged(forward, (variance * t).sqrt())?;
        }
        let discretization = process.discretization();
        let grid = TimeGrid::uniform(t, self.config.steps_for(t))?;
        let generator = HestonPathGenerator::new(process, grid, self.config.brownian_bridge)?;
        let outcome = simulate_paths(&self.config, &generator, &pricer)?;
        debug!(payoff = %args.payoff, t, ?discretization, "Monte Carlo Heston");
        Ok(outcome_results(outcome))
    }
}

impl Versioned for McEuropeanHestonEngine {
    fn version(&self) -> Version {
        self.model.version()
    }
}
