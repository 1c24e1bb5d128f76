//! # qlengine
//!
//! Option pricing under Black-Scholes and Heston dynamics with
//! interchangeable numerical methods: closed forms, trees, finite
//! differences, Monte Carlo and Fourier expansions.
//!
//! This crate re-exports the workspace crates under short module names.
//! Application code should depend on it rather than on the individual
//! `ql-*` crates.
//!
//! ## Quick start
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use qlengine::core::Handle;
//! use qlengine::instruments::{OptionType, VanillaOption};
//! use qlengine::pricingengines::AnalyticEuropeanEngine;
//! use qlengine::processes::GeneralizedBlackScholesProcess;
//! use qlengine::quotes::{Quote, SimpleQuote};
//! use qlengine::termstructures::{BlackConstantVol, BlackVolTermStructure, FlatForward, YieldTermStructure};
//! use qlengine::time::{Actual365Fixed, Date};
//!
//! let today = Date::from_ymd(2025, 1, 2)?;
//! let dc = Arc::new(Actual365Fixed);
//! let spot = SimpleQuote::shared(100.0);
//! let r: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.05, dc.clone()));
//! let q: Arc<dyn YieldTermStructure> = Arc::new(FlatForward::with_rate(today, 0.0, dc.clone()));
//! let vol: Arc<dyn BlackVolTermStructure> = Arc::new(BlackConstantVol::with_vol(today, 0.2, dc));
//! let process = GeneralizedBlackScholesProcess::black_scholes_merton(
//!     Handle::new(spot.clone() as Arc<dyn Quote>),
//!     Handle::new(q),
//!     Handle::new(r),
//!     Handle::new(vol),
//! );
//!
//! let mut option = VanillaOption::european(OptionType::Call, 100.0, today + 365);
//! option.set_pricing_engine(Arc::new(AnalyticEuropeanEngine::new(Arc::new(process))));
//! let before = option.npv()?;
//!
//! spot.set_value(105.0);
//! assert!(option.npv()? > before);
//! # Ok::<(), qlengine::core::Error>(())
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Numeric aliases, errors, handles, versioning and time series.
pub use ql_core as core;

/// Dates, periods, day counters, calendars and the evaluation context.
pub use ql_time as time;

/// Linear algebra, integration, interpolation, solvers, optimization,
/// random numbers and statistics.
pub use ql_math as math;

/// Market quotes.
pub use ql_quotes as quotes;

/// Yield curves and Black volatility surfaces.
pub use ql_termstructures as termstructures;

/// Black-Scholes and Heston processes.
pub use ql_processes as processes;

/// Calibrated models and the calibration driver.
pub use ql_models as models;

/// Time grids, trees, finite differences and Monte Carlo.
pub use ql_methods as methods;

/// Payoffs, exercise schedules and option instruments.
pub use ql_instruments as instruments;

/// Pricing engines, implied volatility and calibration helpers.
pub use ql_pricingengines as pricingengines;

pub use ql_core::{Error, Result};
