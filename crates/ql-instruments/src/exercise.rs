//! Exercise schedules: when an option can be exercised.

use std::fmt;

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::ensure;
use ql_time::Date;

/// Type of exercise right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExerciseType {
    /// Only at expiry.
    European,
    /// At any time within a date range.
    American,
    /// On a set of dates.
    Bermudan,
}

/// Exercise rights of an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exercise {
    exercise_type: ExerciseType,
    dates: Vec<Date>,
    payoff_at_expiry: bool,
}

impl Exercise {
    /// Exercise at `expiry` only.
    pub fn european(expiry: Date) -> Self {
        Self {
            exercise_type: ExerciseType::European,
            dates: vec![expiry],
            payoff_at_expiry: false,
        }
    }

    /// Exercise at any time in `[earliest, latest]`.
    ///
    /// With `payoff_at_expiry` the exercise value is paid at `latest`.
    pub fn american(earliest: Date, latest: Date, payoff_at_expiry: bool) -> Result<Self> {
        ensure!(
            earliest <= latest,
            "earliest exercise date ({earliest}) after latest ({latest})"
        );
        Ok(Self {
            exercise_type: ExerciseType::American,
            dates: vec![earliest, latest],
            payoff_at_expiry,
        })
    }

    /// Exercise on each of `dates`, which must be non-decreasing.
    pub fn bermudan(dates: Vec<Date>) -> Result<Self> {
        ensure!(!dates.is_empty(), "no exercise date given");
        ensure!(
            dates.windows(2).all(|w| w[0] <= w[1]),
            "exercise dates must be non-decreasing"
        );
        let mut dates = dates;
        dates.dedup();
        Ok(Self {
            exercise_type: ExerciseType::Bermudan,
            dates,
            payoff_at_expiry: false,
        })
    }

    /// The type of exercise.
    pub fn exercise_type(&self) -> ExerciseType {
        self.exercise_type
    }

    /// Exercise dates: the expiry, the `[earliest, latest]` range, or the
    /// Bermudan dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// First exercise date.
    pub fn first_date(&self) -> Date {
        self.dates[0]
    }

    /// Last exercise date.
    pub fn last_date(&self) -> Date {
        self.dates[self.dates.len() - 1]
    }

    /// `true` for American exercise paying at expiry.
    pub fn payoff_at_expiry(&self) -> bool {
        self.payoff_at_expiry
    }

    /// Fail unless every exercise date is on or before `maturity`.
    pub fn validate_within(&self, maturity: Date) -> Result<()> {
        ensure!(
            self.last_date() <= maturity,
            "exercise date {} after maturity {maturity}",
            self.last_date()
        );
        Ok(())
    }
}

impl fmt::Display for Exercise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exercise_type {
            ExerciseType::European => write!(f, "European({})", self.first_date()),
            ExerciseType::American => {
                write!(f, "American({} to {})", self.first_date(), self.last_date())
            }
            ExerciseType::Bermudan => write!(f, "Bermudan({} dates)", self.dates.len()),
        }
    }
}
