//! Trinomial tree engine for vanilla options.

use std::sync::Arc;

use tracing::debug;

use ql_core::errors::Result;
use ql_core::versioning::{Version, Versioned};
use ql_core::ensure;
use ql_instruments::{PricingEngine, PricingResults, VanillaOptionArguments};
use ql_methods::lattice::{RecombiningTree, TrinomialTree};
use ql_processes::GeneralizedBlackScholesProcess;

use crate::binomial_engine::LatticeInputs;

/// Log-space trinomial engine for European, American and Bermudan plain
/// vanilla options.
#[derive(Debug)]
pub struct TrinomialVanillaEngine {
    process: Arc<GeneralizedBlackScholesProcess>,
    steps: usize,
}

impl TrinomialVanillaEngine {
    /// Engine building trees of `steps` steps.
    pub fn new(process: Arc<GeneralizedBlackScholesProcess>, steps: usize) -> Result<Self> {
        ensure!(steps >= 2, "trinomial engine needs at least two steps, got {steps}");
        Ok(Self { process, steps })
    }
}

impl PricingEngine<VanillaOptionArguments> for TrinomialVanillaEngine {
    fn calculate(&self, args: &VanillaOptionArguments) -> Result<PricingResults> {
        let inputs = LatticeInputs::new(&self.process, args, "trinomial")?;
        let tree = TrinomialTree::new(&inputs.dynamics()?, inputs.t, self.steps)?;
        let results = inputs.roll_back(&tree, args)?;
        debug!(steps = tree.steps(), dx = tree.dx(), value = results.value, "trinomial tree");
        Ok(results)
    }
}

impl Versioned for TrinomialVanillaEngine {
    fn version(&self) -> Version {
        self.process.version()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::Handle;
    use ql_instruments::{DividendSchedule, Exercise, OptionType, Payoff};
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, YieldTermStructure};
    use ql_time::{Actual365Fixed, Date};

    use crate::barone_adesi_whaley_engine::BaroneAdesiWhaleyEngine;
    use crate::black_formula::black_formula;

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

    #[test]
    fn european_call_converges() {
        let engine = TrinomialVanillaEngine::new(process(), 400).unwrap();
        let args = VanillaOptionArguments {
            payoff: Payoff::plain_vanilla(OptionType::Call, 110.0),
            exercise: Exercise::european(today() + 365),
            dividends: DividendSchedule::new(),
        };
        let results = engine.calculate(&args).unwrap();
        let (d, dq) = ((-0.05_f64).exp(), (-0.02_f64).exp());
        let exact = black_formula(OptionType::Call, 110.0, 100.0 * dq / d, 0.3, d).unwrap();
        assert_abs_diff_eq!(results.value, exact, epsilon = 0.03);
        let delta = results.greeks.delta.unwrap();
        assert!(delta > 0.4 && delta < 0.6);
        assert!(results.greeks.gamma.unwrap() > 0.0);
    }

    #[test]
    fn american_put_is_close_to_the_quadratic_approximation() {
        let args = VanillaOptionArguments {
            payoff: Payoff::plain_vanilla(OptionType::Put, 100.0),
            exercise: Exercise::american(today(), today() + 365, false).unwrap(),
            dividends: DividendSchedule::new(),
        };
        let tree = TrinomialVanillaEngine::new(process(), 400).unwrap().calculate(&args).unwrap().value;
        let baw = BaroneAdesiWhaleyEngine::new(process()).calculate(&args).unwrap().value;
        assert_abs_diff_eq!(tree, baw, epsilon = 0.1);
    }
}
