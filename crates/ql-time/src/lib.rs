//! # ql-time
//!
//! Dates, periods, day counters, calendars and the [`EvaluationContext`]
//! that carries the evaluation date market objects are measured from.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Business-day adjustment conventions.
pub mod business_day_convention;

/// Calendar trait and built-in implementations.
pub mod calendar;

/// `Date` type.
pub mod date;

/// `DayCounter` trait and built-in day-count conventions.
pub mod day_counter;

/// Shared evaluation date with scoped save/restore guards.
pub mod evaluation_context;

/// `Period`: a number of `TimeUnit`s.
pub mod period;

/// `TimeUnit`: the unit of a `Period`.
pub mod time_unit;

/// `Weekday`.
pub mod weekday;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use business_day_convention::BusinessDayConvention;
pub use calendar::{Calendar, NullCalendar, Target, WeekendsOnly};
pub use date::Date;
pub use day_counter::{Actual360, Actual365Fixed, ActualActualIsda, DayCounter, Thirty360};
pub use evaluation_context::{EvaluationContext, SavedContext};
pub use period::Period;
pub use time_unit::TimeUnit;
pub use weekday::Weekday;
