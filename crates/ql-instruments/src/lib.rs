//! # ql-instruments
//!
//! Contract terms (payoffs, exercise, dividends), the generic
//! [`Instrument`] with result caching, the [`PricingEngine`] interface and
//! the vanilla, barrier and Asian option arguments.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Discrete-average Asian options.
pub mod asian_option;
/// Single-barrier options.
pub mod barrier_option;
/// Cash dividend schedules.
pub mod dividends;
/// Exercise schedules.
pub mod exercise;
/// `Instrument`, `PricingEngine` and `PricingResults`.
pub mod instrument;
/// Payoffs.
pub mod payoff;
/// Vanilla options.
pub mod vanilla_option;

pub use asian_option::{AsianOption, AsianOptionArguments, AverageType, FixingSplit};
pub use barrier_option::{BarrierOption, BarrierOptionArguments, BarrierType};
pub use dividends::{Dividend, DividendSchedule};
pub use exercise::{Exercise, ExerciseType};
pub use instrument::{Greeks, Instrument, InstrumentArguments, PricingEngine, PricingResults};
pub use payoff::{OptionType, Payoff};
pub use vanilla_option::{VanillaOption, VanillaOptionArguments};
