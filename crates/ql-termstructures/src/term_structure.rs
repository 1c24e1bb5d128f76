//! `TermStructure`: the base trait of every curve and surface.
//!
//! A term structure measures time from a reference date, either fixed at
//! construction or following the evaluation date of an
//! [`EvaluationContext`].  Queries outside the covered range fail with
//! `StaleMarketData` unless extrapolation was enabled.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ql_core::errors::{Error, Result};
use ql_core::versioning::{latest_version, Version, VersionStamp, Versioned};
use ql_core::Time;
use ql_time::{BusinessDayConvention, Calendar, Date, DayCounter, EvaluationContext, Period};

/// How a term structure determines its reference date.
#[derive(Clone)]
pub enum ReferenceDate {
    /// A date fixed at construction.
    Fixed(Date),
    /// `settlement_days` business days after the evaluation date.
    Floating {
        /// Source of the evaluation date.
        context: Arc<EvaluationContext>,
        /// Business days between evaluation and reference date.
        settlement_days: u32,
        /// Calendar used to count the settlement days.
        calendar: Arc<dyn Calendar>,
    },
}

impl ReferenceDate {
    /// Reference date equal to the evaluation date of `context`.
    pub fn floating(context: Arc<EvaluationContext>, calendar: Arc<dyn Calendar>) -> Self {
        ReferenceDate::Floating {
            context,
            settlement_days: 0,
            calendar,
        }
    }

    /// The current reference date.
    pub fn date(&self) -> Result<Date> {
        match self {
            ReferenceDate::Fixed(d) => Ok(*d),
            ReferenceDate::Floating {
                context,
                settlement_days,
                calendar,
            } => {
                let today = context.evaluation_date();
                if *settlement_days == 0 {
                    Ok(today)
                } else {
                    calendar.advance(
                        today,
                        Period::days(*settlement_days as i32),
                        BusinessDayConvention::Following,
                    )
                }
            }
        }
    }
}

impl Versioned for ReferenceDate {
    fn version(&self) -> Version {
        match self {
            ReferenceDate::Fixed(_) => 0,
            ReferenceDate::Floating { context, .. } => context.version(),
        }
    }
}

impl fmt::Debug for ReferenceDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceDate::Fixed(d) => write!(f, "Fixed({d})"),
            ReferenceDate::Floating {
                context,
                settlement_days,
                calendar,
            } => write!(
                f,
                "Floating({}, +{settlement_days} {})",
                context.evaluation_date(),
                calendar.name()
            ),
        }
    }
}

/// State shared by every concrete term structure.
#[derive(Debug)]
pub struct TermStructureData {
    /// Reference date policy.
    pub reference: ReferenceDate,
    /// Convention turning dates into times.
    pub day_counter: Arc<dyn DayCounter>,
    extrapolate: AtomicBool,
    stamp: VersionStamp,
}

impl TermStructureData {
    /// Bundle a reference date policy and a day counter.
    pub fn new(reference: ReferenceDate, day_counter: Arc<dyn DayCounter>) -> Self {
        Self {
            reference,
            day_counter,
            extrapolate: AtomicBool::new(false),
            stamp: VersionStamp::new(),
        }
    }

    /// Version of the reference date and of the structure's own settings.
    pub fn version(&self) -> Version {
        latest_version([self.stamp.get(), self.reference.version()])
    }
}

/// Base trait for all term structures.
pub trait TermStructure: Versioned + fmt::Debug + Send + Sync {
    /// Shared state.
    fn data(&self) -> &TermStructureData;

    /// The latest date covered without extrapolation.
    fn max_date(&self) -> Result<Date>;

    /// The date at which time is zero.
    fn reference_date(&self) -> Result<Date> {
        self.data().reference.date()
    }

    /// The convention used for date to time conversions.
    fn day_counter(&self) -> &dyn DayCounter {
        &*self.data().day_counter
    }

    /// Time from the reference date to `date`.
    fn time_from_reference(&self, date: Date) -> Result<Time> {
        Ok(self.day_counter().year_fraction(self.reference_date()?, date))
    }

    /// Time from the reference date to [`max_date`][Self::max_date].
    fn max_time(&self) -> Result<Time> {
        self.time_from_reference(self.max_date()?)
    }

    /// Allow queries past [`max_time`][Self::max_time].
    fn enable_extrapolation(&self) {
        self.data().extrapolate.store(true, Ordering::Release);
        self.data().stamp.touch();
    }

    /// Forbid queries past [`max_time`][Self::max_time].
    fn disable_extrapolation(&self) {
        self.data().extrapolate.store(false, Ordering::Release);
        self.data().stamp.touch();
    }

    /// `true` if queries past the last covered time are allowed.
    fn allows_extrapolation(&self) -> bool {
        self.data().extrapolate.load(Ordering::Acquire)
    }

    /// Fail with `StaleMarketData` if `t` is negative or, without
    /// extrapolation, past the covered range.
    fn check_range(&self, t: Time) -> Result<()> {
        if t < 0.0 {
            return Err(Error::StaleMarketData(format!(
                "negative time ({t}) given"
            )));
        }
        if !self.allows_extrapolation() {
            let max = self.max_time()?;
            if t > max + 1e-12 * max.max(1.0) {
                return Err(Error::StaleMarketData(format!(
                    "time ({t}) is past max curve time ({max})"
                )));
            }
        }
        Ok(())
    }
}
