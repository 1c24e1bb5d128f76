//! Binomial tree engine for vanilla options.
//!
//! The tree is built on the zero rates and Black volatility to expiry, so
//! it prices the option under constant coefficients matching the process
//! at the strike.  Delta and gamma are read off the first layers of the
//! tree; theta follows from the Black-Scholes equation.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Real, Time};
use ql_instruments::{
    ExerciseType, Greeks, Payoff, PricingEngine, PricingResults, VanillaOptionArguments,
};
use ql_methods::lattice::{backward_induction, BinomialTree, LogNormalDynamics, RecombiningTree, TreeKind};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::analytic_european_engine::escrowed_spot;

/// Binomial engine for European, American and Bermudan plain vanilla
/// options.
#[derive(Debug)]
pub struct BinomialVanillaEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    kind: TreeKind,
    steps: usize,
}

impl BinomialVanillaEngine {
    /// Engine building `kind` trees of `steps` steps.
    ///
    /// Leisen-Reimer and Joshi trees use the next odd number of steps.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, kind: TreeKind, steps: usize) -> Result<Self> {
        ensure!(steps >= 2, "binomial engine needs at least two steps, got {steps}");
        Ok(Self { process, kind, steps })
    }

    /// Tree construction.
    pub fn kind(&self) -> TreeKind {
        self.kind
    }
}

impl PricingEngine<VanillaOptionArguments> for BinomialVanillaEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        let inputs = LatticeInputs::new(&self.process, args, "binomial")?;
        let tree = BinomialTree::new(self.kind, &inputs.dynamics()?, inputs.t, self.steps, inputs.strike)?;
        let results = inputs.roll_back(&tree, args)?;
        debug!(kind = ?self.kind, steps = tree.steps(), value = results.value, "binomial tree");
        Ok(results)
    }
}

impl Versioned for BinomialVanillaEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}

// ─── Shared with the trinomial engine ─────────────────────────────────────────

/// Constant-coefficient inputs of a tree, validated against the
/// contract.
#[derive(Debug, Clone)]
pub(crate) struct LatticeInputs {
    pub(crate) spot: Real,
    pub(crate) strike: Real,
    pub(crate) t: Time,
    pub(crate) r: Real,
    pub(crate) q: Real,
    pub(crate) sigma: Real,
    exercise_times: Vec<Time>,
}

impl LatticeInputs {
    pub(crate) fn new(
        process: &GeneralizedBlackScholesProcess,
        args: &VanillaOptionArguments,
        engine: &str,
    ) -> Result<Self> {
        if !matches!(args.payoff, Payoff::PlainVanilla { .. }) {
            return Err(Error::Domain(format!(
                "{engine} engine needs a plain vanilla payoff, got {}",
                args.payoff.name()
            )));
        }
        let exercise_type = args.exercise.exercise_type();
        if exercise_type != ExerciseType::European && !args.dividends.is_empty() {
            return Err(Error::Domain(format!(
                "{engine} engine cannot combine early exercise with discrete dividends"
            )));
        }
        let expiry = args.exercise.last_date();
        let t = process.time(expiry)?;
        ensure!(t > 0.0, "{engine} engine needs an expiry after today, got {expiry}");

        let strike = args.payoff.strike();
        let exercise_times = match exercise_type {
            ExerciseType::European => Vec::new(),
            ExerciseType::American => vec![process.time(args.exercise.first_date())?.max(0.0)],
            ExerciseType::Bermudan => args
                .exercise
                .dates()
                .iter()
                .map(|&d| process.time(d))
                .collect::<Result<Vec<_>>>()?,
        };
        Ok(Self {
            spot: escrowed_spot(process, &args.dividends, expiry)?,
            strike,
            t,
            r: -process.discount(t)?.ln() / t,
            q: -process.dividend_discount(t)?.ln() / t,
            sigma: process.black_volatility(t, strike)?,
            exercise_times,
        })
    }

    pub(crate) fn dynamics(&self) -> Result<LogNormalDynamics> {
        LogNormalDynamics::new(self.spot, self.r, self.q, self.sigma)
    }

    /// Steps of a tree with `steps` steps at which exercise is allowed.
    fn exercisable_steps(&self, exercise_type: ExerciseType, steps: usize, dt: Time) -> Vec<bool> {
        let mut flags = vec![false; steps + 1];
        match exercise_type {
            ExerciseType::European => {}
            ExerciseType::American => {
                let earliest = self.exercise_times.first().copied().unwrap_or(0.0);
                for (i, flag) in flags.iter_mut().enumerate() {
                    *flag = i as Real * dt >= earliest - 1e-10;
                }
            }
            ExerciseType::Bermudan => {
                for &t in &self.exercise_times {
                    if t >= 0.0 {
                        let i = (t / dt).round() as usize;
                        if i <= steps {
                            flags[i] = true;
                        }
                    }
                }
            }
        }
        flags
    }

    /// Backward induction of the payoff through `tree`, with Greeks.
    pub(crate) fn roll_back<T: RecombiningTree>(&self, tree: &T, args: &VanillaOptionArguments) -> Result<PricingResults> {
        let dt = tree.dt();
        let flags = self.exercisable_steps(args.exercise.exercise_type(), tree.steps(), dt);
        let payoff = args.payoff;
        let solution = backward_induction(tree, (-self.r * dt).exp(), |s| payoff.value(s), |i| flags[i])?;
        let value = solution.value();
        let (delta, gamma) = solution.delta_gamma(tree);
        let s = self.spot;
        let theta = self.r * value - (self.r - self.q) * s * delta - 0.5 * self.sigma * self.sigma * s * s * gamma;
        Ok(PricingResults::from_value(value).with_greeks(Greeks {
            delta: Some(delta),
            gamma: Some(gamma),
            theta: Some(theta),
            ..Greeks::default()
        }))
    }
}
