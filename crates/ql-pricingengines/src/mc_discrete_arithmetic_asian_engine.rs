//! Monte Carlo engine for discretely monitored arithmetic-average options.
//!
//! Paths run on a grid through every future fixing time.  The geometric
//! average of the same fixings serves as control variate: each sample
//! becomes `P(A) − P(G) + E[P(G)]`, with the last term in closed form.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{AsianOptionArguments, AverageType, Payoff, PricingEngine, PricingResults};
use ql_methods::monte_carlo::BlackScholesPathGenerator;
use ql_methods::{simulate_paths, McConfig, Path, PathPricer, TimeGrid};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::analytic_discrete_geometric_asian_engine::{fixing_schedule, geometric_average};
use crate::black_formula::BlackCalculator;
use crate::mc_european_engine::outcome_results;

/// Discounted payoff of the arithmetic average of a path.
#[derive(Debug, Clone)]
struct ArithmeticAsianPathPricer {
    payoff: Payoff,
    discount: Real,
    /// Path nodes of the future fixings.
    indices: Vec<usize>,
    running_sum: Real,
    running_log_sum: Real,
    total: Real,
    /// Closed-form value of the geometric-average option.
    control: Option<Real>,
}

impl PathPricer for ArithmeticAsianPathPricer {
    fn price(&self, path: &Path) -> Result<Real> {
        let (sum, log_sum) = self.indices.iter().fold((self.running_sum, self.running_log_sum), |(s, l), &i| {
            (s + path[i], l + path[i].ln())
        });
        let value = self.discount * self.payoff.value(sum / self.total);
        Ok(match self.control {
            Some(geometric) => value - self.discount * self.payoff.value((log_sum / self.total).exp()) + geometric,
            None => value,
        })
    }
}

/// Monte Carlo engine for arithmetic-average Asian options.
#[derive(Debug)]
pub struct McDiscreteArithmeticAsianEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    config: McConfig,
}

impl McDiscreteArithmeticAsianEngine {
    /// Engine with simulation settings `config`; `control_variate` turns on
    /// the geometric control.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, config: McConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { process, config })
    }

    /// Simulation settings.
    pub fn config(&self) -> &McConfig {
        &self.config
    }
}

impl PricingEngine<AsianOptionArguments> for McDiscreteArithmeticAsianEngine {
    fn calculate(&self, args: &AsianOptionArguments) -> Result<PricingResults> {
        if args.average_type != AverageType::Arithmetic {
            return Err(Error::Domain(
                "Monte Carlo discrete Asian engine prices arithmetic averages only".into(),
            ));
        }
        let expiry = args.exercise.last_date();
        let t = self.process.time(expiry)?;
        ensure!(t >= 0.0, "option expired on {expiry}");
        let discount = self.process.discount(t)?;
        let (split, times) = fixing_schedule(&self.process, args)?;
        let total = split.total() as Real;

        let positive: Vec<Time> = times.iter().copied().filter(|&s| s > 0.0).collect();
        if positive.is_empty() {
            // the average is known once today's fixing is the spot
            let spot = self.process.x0_value()?;
            let average = (split.running_sum() + times.len() as Real * spot) / total;
            return Ok(PricingResults::from_value(discount * args.payoff.value(average)).with_error_estimate(0.0));
        }

        let last = positive[positive.len() - 1];
        let grid = TimeGrid::with_mandatory_times(&positive, self.config.steps_for(last).max(positive.len()))?;
        let indices = times
            .iter()
            .map(|&s| if s > 0.0 { grid.index(s) } else { Ok(0) })
            .collect::<Result<Vec<_>>>()?;
        let strike = args.payoff.strike();
        let control = if self.config.control_variate {
            let average = geometric_average(&self.process, &split, &times, strike)?;
            Some(BlackCalculator::new(&args.payoff, average.forward, average.std_dev, discount)?.value())
        } else {
            None
        };
        let pricer = ArithmeticAsianPathPricer {
            payoff: args.payoff,
            discount,
            indices,
            running_sum: split.running_sum(),
            running_log_sum: split.running_log_sum(),
            total,
            control,
        };
        let generator = BlackScholesPathGenerator::new(&self.process, grid, strike, self.config.brownian_bridge)?;
        let outcome = simulate_paths(&self.config, &generator, &pricer)?;
        debug!(
            past = split.past.len(),
            future = times.len(),
            control_variate = control.is_some(),
            "Monte Carlo arithmetic Asian"
        );
        Ok(outcome_results(outcome))
    }
}

impl Versioned for McDiscreteArithmeticAsianEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}
