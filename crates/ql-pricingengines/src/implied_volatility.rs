//! Implied Black volatility of vanilla options.
//!
//! The option is repriced on a copy of the process whose volatility is a
//! flat surface driven by a private quote, and Brent's method moves the
//! quote until the price matches the target.  European options reprice
//! analytically, the others on a finite-difference grid.

use std::cell::Cell;
use std::sync::Arc;

use tracing::debug;

use ql_core::errors::{Error, Result};
use ql_core::{ensure, Handle, Real, Volatility};
use ql_instruments::{ExerciseType, PricingEngine, VanillaOption, VanillaOptionArguments};
use ql_math::solvers1d::{Brent, Solver1D};
use ql_methods::FdConfig;
use ql_processes::GeneralizedBlackScholesProcess;
use ql_quotes::{Quote, SimpleQuote};
use ql_termstructures::{BlackConstantVol, BlackVolTermStructure, TermStructure};

use crate::analytic_european_engine::AnalyticEuropeanEngine;
use crate::fd_black_scholes_vanilla_engine::FdBlackScholesVanillaEngine;

/// Volatility in `[min_vol, max_vol]` at which `args` is worth `target`
/// under `process`.
///
/// Fails with [`Error::Convergence`] if the target lies outside the prices
/// spanned by the bracket or Brent's method exhausts `max_evaluations`.
pub fn implied_volatility(
    args: &VanillaOptionArguments,
    target: Real,
    process: &GeneralizedBlackScholesProcess,
    accuracy: Real,
    max_evaluations: usize,
    min_vol: Volatility,
    max_vol: Volatility,
) -> Result<Volatility> {
    ensure!(target >= 0.0, "target price must be non-negative, got {target}");
    ensure!(
        0.0 <= min_vol && min_vol < max_vol,
        "invalid volatility range [{min_vol}, {max_vol}]"
    );

    let surface = process.black_vol()?;
    let quote = SimpleQuote::shared(min_vol);
    let flat: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::new(
        surface.data().reference.clone(),
        Handle::new(Arc::clone(&quote) as Arc<dyn Quote>),
        Arc::clone(&surface.data().day_counter),
    ));
    let repriced = Arc::new(GeneralizedBlackScholesProcess::black_scholes_merton(
        process.state_variable().clone(),
        Handle::new(process.dividend_yield()?),
        Handle::new(process.risk_free_rate()?),
        Handle::new(flat),
    ));
    let engine: Box<dyn PricingEngine<VanillaOptionArguments>> = match args.exercise.exercise_type() {
        ExerciseType::European => Box::new(AnalyticEuropeanEngine::new(repriced)),
        ExerciseType::American | ExerciseType::Bermudan => {
            Box::new(FdBlackScholesVanillaEngine::new(repriced, FdConfig::default())?)
        }
    };

    let vol = invert(
        |vol| {
            quote.set_value(vol);
            Ok(engine.calculate(args)?.value - target)
        },
        target,
        accuracy,
        max_evaluations,
        min_vol,
        max_vol,
    )?;
    debug!(target, vol, exercise = %args.exercise, "implied volatility");
    Ok(vol)
}

/// Root of `price_error` in `[min_vol, max_vol]`.  The first pricing error
/// met during the search is returned as is.
fn invert<F: Fn(Volatility) -> Result<Real>>(
    price_error: F,
    target: Real,
    accuracy: Real,
    max_evaluations: usize,
    min_vol: Volatility,
    max_vol: Volatility,
) -> Result<Volatility> {
    let (low, high) = (price_error(min_vol)?, price_error(max_vol)?);
    if low * high > 0.0 {
        return Err(Error::Convergence(format!(
            "target price {target} outside [{}, {}] spanned by volatilities [{min_vol}, {max_vol}]",
            low + target,
            high + target
        )));
    }
    let failure: Cell<Option<Error>> = Cell::new(None);
    let solved = Brent::new(max_evaluations).solve_bracketed(
        |vol| match price_error(vol) {
            Ok(value) => value,
            Err(e) => {
                let first = failure.take().unwrap_or(e);
                failure.set(Some(first));
                Real::NAN
            }
        },
        accuracy,
        min_vol,
        max_vol,
    );
    match failure.into_inner() {
        Some(e) => Err(e),
        None => solved,
    }
}

/// Implied volatility of an option instrument.
pub trait ImpliedVolatility {
    /// See [`implied_volatility`].
    fn implied_volatility(
        &self,
        target: Real,
        process: &GeneralizedBlackScholesProcess,
        accuracy: Real,
        max_evaluations: usize,
        min_vol: Volatility,
        max_vol: Volatility,
    ) -> Result<Volatility>;
}

impl ImpliedVolatility for VanillaOption {
    fn implied_volatility(
        &self,
        target: Real,
        process: &GeneralizedBlackScholesProcess,
        accuracy: Real,
        max_evaluations: usize,
        min_vol: Volatility,
        max_vol: Volatility,
    ) -> Result<Volatility> {
        implied_volatility(
            self.arguments(),
            target,
            process,
            accuracy,
            max_evaluations,
            min_vol,
            max_vol,
        )
    }
}
