//! Discrete cash dividend schedules.

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{ensure, Real};
use ql_time::Date;

/// A cash dividend paid on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    /// Payment (ex-dividend) date.
    pub date: Date,
    /// Cash amount.
    pub amount: Real,
}

/// Cash dividends sorted by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DividendSchedule {
    dividends: Vec<Dividend>,
}

impl DividendSchedule {
    /// An empty schedule.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a schedule from parallel date and amount vectors.
    pub fn from_dates(dates: &[Date], amounts: &[Real]) -> Result<Self> {
        ensure!(
            dates.len() == amounts.len(),
            "{} dividend dates but {} amounts",
            dates.len(),
            amounts.len()
        );
        let mut schedule = Self::new();
        for (&date, &amount) in dates.iter().zip(amounts) {
            schedule.push(date, amount)?;
        }
        Ok(schedule)
    }

    /// Add a dividend, keeping the schedule sorted.
    pub fn push(&mut self, date: Date, amount: Real) -> Result<()> {
        ensure!(amount.is_finite(), "non-finite dividend amount on {date}");
        let pos = self.dividends.partition_point(|d| d.date <= date);
        self.dividends.insert(pos, Dividend { date, amount });
        Ok(())
    }

    /// `true` if there are no dividends.
    pub fn is_empty(&self) -> bool {
        self.dividends.is_empty()
    }

    /// Number of dividends.
    pub fn len(&self) -> usize {
        self.dividends.len()
    }

    /// Iterate in date order.
    pub fn iter(&self) -> impl Iterator<Item = &Dividend> {
        self.dividends.iter()
    }

    /// Dividends paid strictly after `from` and on or before `to`.
    pub fn between(&self, from: Date, to: Date) -> impl Iterator<Item = &Dividend> {
        self.dividends
            .iter()
            .filter(move |d| d.date > from && d.date <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn schedule_is_kept_sorted() {
        let mut s = DividendSchedule::new();
        s.push(date(2025, 9, 1), 1.0).unwrap();
        s.push(date(2025, 3, 1), 0.5).unwrap();
        s.push(date(2025, 6, 1), 0.75).unwrap();
        let dates: Vec<Date> = s.iter().map(|d| d.date).collect();
        assert_eq!(dates, vec![date(2025, 3, 1), date(2025, 6, 1), date(2025, 9, 1)]);
    }

    #[test]
    fn between_excludes_start() {
        let s = DividendSchedule::from_dates(
            &[date(2025, 3, 1), date(2025, 6, 1)],
            &[0.5, 0.75],
        )
        .unwrap();
        assert_eq!(s.between(date(2025, 3, 1), date(2025, 12, 31)).count(), 1);
        assert_eq!(s.between(date(2025, 1, 1), date(2025, 12, 31)).count(), 2);
    }

    #[test]
    fn mismatched_lengths_fail() {
        assert!(DividendSchedule::from_dates(&[date(2025, 3, 1)], &[]).is_err());
    }
}
