//! Discretely monitored average-price options.
//!
//! Fixings dated before the evaluation date must be found in the option's
//! fixing history; a fixing dated on the evaluation date is taken from the
//! history when present and treated as still to come otherwise.

use serde::{Deserialize, Serialize};

use ql_core::errors::{Error, Result};
use ql_core::{ensure, Real, TimeSeries};
use ql_time::Date;

use crate::exercise::{Exercise, ExerciseType};
use crate::instrument::{Instrument, InstrumentArguments};
use crate::payoff::Payoff;
use crate::vanilla_option::validate_payoff;

/// How fixings are averaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AverageType {
    /// Arithmetic mean.
    Arithmetic,
    /// Geometric mean.
    Geometric,
}

/// Terms of a discrete-average Asian option.
#[derive(Debug, Clone, PartialEq)]
pub struct AsianOptionArguments {
    /// Averaging rule.
    pub average_type: AverageType,
    /// Payoff applied to the average.
    pub payoff: Payoff,
    /// Exercise (European).
    pub exercise: Exercise,
    /// Averaging dates, sorted.
    pub fixing_dates: Vec<Date>,
    /// Historical fixings of the underlying.
    pub past_fixings: TimeSeries<Date, Real>,
}

/// Fixing schedule split at an evaluation date.
#[derive(Debug, Clone, PartialEq)]
pub struct FixingSplit {
    /// Values of fixings already observed.
    pub past: Vec<Real>,
    /// Dates of fixings still to come.
    pub future: Vec<Date>,
}

impl FixingSplit {
    /// Number of fixings in the schedule.
    pub fn total(&self) -> usize {
        self.past.len() + self.future.len()
    }

    /// Sum of observed fixings.
    pub fn running_sum(&self) -> Real {
        self.past.iter().sum()
    }

    /// Sum of the logarithms of observed fixings.
    pub fn running_log_sum(&self) -> Real {
        self.past.iter().map(|x| x.ln()).sum()
    }
}

impl AsianOptionArguments {
    /// Split the fixing schedule at `today`.
    ///
    /// Fails with [`Error::MissingData`] if a fixing before `today` is not in
    /// the history.
    pub fn split_fixings(&self, today: Date) -> Result<FixingSplit> {
        let mut past = Vec::new();
        let mut future = Vec::new();
        for &d in &self.fixing_dates {
            if d < today {
                let value = self
                    .past_fixings
                    .get(&d)
                    .copied()
                    .ok_or_else(|| Error::MissingData(format!("missing fixing for {d}")))?;
                past.push(value);
            } else if d == today {
                match self.past_fixings.get(&d) {
                    Some(&value) => past.push(value),
                    None => future.push(d),
                }
            } else {
                future.push(d);
            }
        }
        Ok(FixingSplit { past, future })
    }
}

impl InstrumentArguments for AsianOptionArguments {
    fn validate(&self) -> Result<()> {
        validate_payoff(&self.payoff)?;
        ensure!(
            self.exercise.exercise_type() == ExerciseType::European,
            "Asian options must have European exercise"
        );
        ensure!(!self.fixing_dates.is_empty(), "no fixing dates given");
        ensure!(
            self.fixing_dates.windows(2).all(|w| w[0] < w[1]),
            "fixing dates must be strictly increasing"
        );
        if let Some(&last) = self.fixing_dates.last() {
            ensure!(
                last <= self.exercise.last_date(),
                "fixing date {last} after exercise date {}",
                self.exercise.last_date()
            );
        }
        for (d, v) in self.past_fixings.iter() {
            ensure!(*v > 0.0, "non-positive fixing {v} on {d}");
        }
        Ok(())
    }
}

/// A discrete-average Asian option.
pub type AsianOption = Instrument<AsianOptionArguments>;

impl Instrument<AsianOptionArguments> {
    /// Asian option with no fixing history.
    pub fn asian(
        average_type: AverageType,
        payoff: Payoff,
        exercise: Exercise,
        fixing_dates: Vec<Date>,
    ) -> Self {
        Self::new(AsianOptionArguments {
            average_type,
            payoff,
            exercise,
            fixing_dates,
            past_fixings: TimeSeries::new(),
        })
    }

    /// Record a historical fixing.
    pub fn add_fixing(&mut self, date: Date, value: Real) {
        self.arguments_mut().past_fixings.insert(date, value);
    }
}
