//! Monte Carlo simulation.
//!
//! An engine combines a [`PathGenerator`], which turns a Gaussian vector
//! into a [`Path`] of the underlying, with a [`PathPricer`], which values
//! the path, and hands the composition to [`simulate`].

pub mod config;
pub mod path;
pub mod simulation;

pub use config::McConfig;
pub use path::{BlackScholesPathGenerator, HestonPathGenerator, Path, PathGenerator};
pub use simulation::{simulate, McOutcome};

use std::fmt::Debug;

use ql_core::errors::Result;
use ql_core::Real;

/// Discounted payoff of a path.
pub trait PathPricer: Debug + Send + Sync {
    /// Value of `path` at time zero.
    fn price(&self, path: &Path) -> Result<Real>;
}

/// Price `pricer` over paths from `generator`.
pub fn simulate_paths(
    config: &McConfig,
    generator: &dyn PathGenerator,
    pricer: &dyn PathPricer,
) -> Result<McOutcome> {
    simulate(config, generator.dimension(), |z| pricer.price(&generator.generate(z)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_grid::TimeGrid;
    use ql_core::Handle;
    use ql_processes::GeneralizedBlackScholesProcess;
    use ql_quotes::{Quote, SimpleQuote};
    use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, YieldTermStructure};
    use ql_time::{Actual365Fixed, Date};
    use std::sync::Arc;

    #[derive(Debug)]
    struct DiscountedTerminal(Real);

    impl PathPricer for DiscountedTerminal {
        fn price(&self, path: &Path) -> Result<Real> {
            Ok(self.0 * path.last())
        }
    }

    fn process() -> GeneralizedBlackScholesProcess {
        let today = Date::from_ymd(2025, 1, 2).unwrap();
        let dc = Arc::new(Actual365Fixed);
        let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.05, dc.clone()));
        let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.02, dc.clone()));
        let vol: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::with_vol(today, 0.3, dc));
        let spot: Arc<dyn Quote> = SimpleQuote::shared(100.0);
        GeneralizedBlackScholesProcess::black_scholes_merton(
            Handle::new(spot),
            Handle::new(q),
            Handle::new(r),
            Handle::new(vol),
        )
    }

    #[test]
    fn discounted_spot_is_a_martingale() {
        let p = process();
        let grid = TimeGrid::uniform(1.0, 8).unwrap();
        let pricer = DiscountedTerminal(p.discount(1.0).unwrap());
        let expected = 100.0 * p.dividend_discount(1.0).unwrap();
        for bridge in [false, true] {
            let generator = BlackScholesPathGenerator::new(&p, grid.clone(), 100.0, bridge).unwrap();
            let config = McConfig::default().with_samples(20_000).with_antithetic(true);
            let outcome = simulate_paths(&config, &generator, &pricer).unwrap();
            let error = outcome.error_estimate.unwrap();
            assert!((outcome.value - expected).abs() < 4.0 * error, "bridge {bridge}");
        }
    }

    #[test]
    fn wrong_dimension_is_rejected() {
        let p = process();
        let generator = BlackScholesPathGenerator::new(&p, TimeGrid::uniform(1.0, 4).unwrap(), 100.0, false).unwrap();
        assert_eq!(generator.dimension(), 4);
        assert!(generator.generate(&[0.0; 3]).is_err());
        let path = generator.generate(&[0.0; 4]).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], 100.0);
    }
}
