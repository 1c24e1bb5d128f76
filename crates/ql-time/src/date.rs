//! Calendar dates stored as day serial numbers.
//!
//! Serial 1 is January 1st, 1900; dates are proleptic Gregorian and valid
//! through December 31st, 2199.  Serial 0 is reserved as the null date.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::period::Period;
use crate::time_unit::TimeUnit;
use crate::weekday::Weekday;
use ql_core::errors::{Error, Result};

/// A calendar date.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Date(i32);

// Days from 1899-12-31 to 1970-01-01.
const UNIX_OFFSET: i32 = 25_568;

impl Date {
    /// The null date.
    pub const NULL: Date = Date(0);

    /// January 1st, 1900.
    pub const MIN: Date = Date(serial_from_civil(1900, 1, 1));

    /// December 31st, 2199.
    pub const MAX: Date = Date(serial_from_civil(2199, 12, 31));

    /// Create a date from its serial number.
    pub fn from_serial(serial: i32) -> Result<Self> {
        if !(Self::MIN.0..=Self::MAX.0).contains(&serial) {
            return Err(Error::Date(format!(
                "serial {serial} outside [{}, {}]",
                Self::MIN.0,
                Self::MAX.0
            )));
        }
        Ok(Date(serial))
    }

    /// Create a date from year, month (1–12) and day of month.
    pub fn from_ymd(year: u16, month: u8, day: u8) -> Result<Self> {
        if !(1900..=2199).contains(&year) {
            return Err(Error::Date(format!("year {year} out of range [1900, 2199]")));
        }
        if !(1..=12).contains(&month) {
            return Err(Error::Date(format!("month {month} out of range [1, 12]")));
        }
        let last = days_in_month(year, month);
        if day == 0 || day > last {
            return Err(Error::Date(format!(
                "day {day} out of range [1, {last}] for {year}-{month:02}"
            )));
        }
        Ok(Date(serial_from_civil(
            i32::from(year),
            i32::from(month),
            i32::from(day),
        )))
    }

    /// Serial number.
    pub fn serial(self) -> i32 {
        self.0
    }

    /// `true` for the null date.
    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    fn civil(self) -> (u16, u8, u8) {
        let (y, m, d) = civil_from_serial(self.0);
        (y as u16, m as u8, d as u8)
    }

    /// Year.
    pub fn year(self) -> u16 {
        self.civil().0
    }

    /// Month (1–12).
    pub fn month(self) -> u8 {
        self.civil().1
    }

    /// Day of the month.
    pub fn day_of_month(self) -> u8 {
        self.civil().2
    }

    /// Day of the year (1–366).
    pub fn day_of_year(self) -> u16 {
        let jan1 = serial_from_civil(i32::from(self.year()), 1, 1);
        (self.0 - jan1 + 1) as u16
    }

    /// Day of the week.
    pub fn weekday(self) -> Weekday {
        match Weekday::from_ordinal(((self.0 - 1).rem_euclid(7) + 1) as u8) {
            Some(w) => w,
            None => Weekday::Monday,
        }
    }

    /// Move by `n` calendar units.  Month and year moves clamp the day to the
    /// end of the target month (Jan 31 + 1M = Feb 28/29).
    pub fn advance(self, n: i32, unit: TimeUnit) -> Result<Self> {
        let serial = match unit {
            TimeUnit::Days => self.0 + n,
            TimeUnit::Weeks => self.0 + 7 * n,
            TimeUnit::Months | TimeUnit::Years => {
                let months = if unit == TimeUnit::Years { 12 * n } else { n };
                let (y, m, d) = civil_from_serial(self.0);
                let total = y * 12 + (m - 1) + months;
                let (ny, nm) = (total.div_euclid(12), total.rem_euclid(12) + 1);
                if !(1900..=2199).contains(&ny) {
                    return Err(Error::Date(format!("year {ny} out of range [1900, 2199]")));
                }
                let nd = d.min(i32::from(days_in_month(ny as u16, nm as u8)));
                serial_from_civil(ny, nm, nd)
            }
        };
        Self::from_serial(serial)
    }

    /// Move by a [`Period`].
    pub fn advance_by(self, period: Period) -> Result<Self> {
        self.advance(period.length, period.unit)
    }

    /// Last day of this date's month.
    pub fn end_of_month(self) -> Self {
        let (y, m, _) = self.civil();
        Date(serial_from_civil(
            i32::from(y),
            i32::from(m),
            i32::from(days_in_month(y, m)),
        ))
    }

    /// `true` if this is the last day of its month.
    pub fn is_end_of_month(self) -> bool {
        self == self.end_of_month()
    }
}

// ── Arithmetic operators ──────────────────────────────────────────────────────

impl std::ops::Add<i32> for Date {
    type Output = Self;
    fn add(self, days: i32) -> Self {
        Date(self.0 + days)
    }
}

impl std::ops::Sub<i32> for Date {
    type Output = Self;
    fn sub(self, days: i32) -> Self {
        Date(self.0 - days)
    }
}

impl std::ops::Sub<Date> for Date {
    type Output = i32;
    fn sub(self, rhs: Date) -> i32 {
        self.0 - rhs.0
    }
}

impl std::ops::AddAssign<i32> for Date {
    fn add_assign(&mut self, days: i32) {
        self.0 += days;
    }
}

impl std::ops::SubAssign<i32> for Date {
    fn sub_assign(&mut self, days: i32) {
        self.0 -= days;
    }
}

// ── Display ───────────────────────────────────────────────────────────────────

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            return f.write_str("null date");
        }
        let (y, m, d) = self.civil();
        write!(f, "{y:04}-{m:02}-{d:02}")
    }
}

impl fmt::Debug for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Date({self})")
    }
}

// ── Civil calendar helpers ────────────────────────────────────────────────────

/// Whether a given year is a leap year.
pub fn is_leap_year(year: u16) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in a given month.
pub fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

// Hinnant's days-from-civil, shifted to the 1899-12-31 epoch.
const fn serial_from_civil(year: i32, month: i32, day: i32) -> i32 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = if month > 2 { month - 3 } else { month + 9 };
    let doy = (153 * mp + 2) / 5 + day - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468 + UNIX_OFFSET
}

fn civil_from_serial(serial: i32) -> (i32, i32, i32) {
    let z = serial - UNIX_OFFSET + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = yoe + era * 400 + i32::from(m <= 2);
    (y, m, d)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epoch_and_bounds() {
        assert_eq!(Date::MIN.serial(), 1);
        assert_eq!(Date::MAX.serial(), 109_573);
        assert_eq!(Date::MIN.weekday(), Weekday::Monday);
    }

    #[test]
    fn month_arithmetic_clamps() {
        let d = Date::from_ymd(2024, 1, 31).unwrap();
        assert_eq!(
            d.advance(1, TimeUnit::Months).unwrap(),
            Date::from_ymd(2024, 2, 29).unwrap()
        );
        assert_eq!(
            d.advance(-2, TimeUnit::Months).unwrap(),
            Date::from_ymd(2023, 11, 30).unwrap()
        );
        assert_eq!(
            d.advance(1, TimeUnit::Years).unwrap(),
            Date::from_ymd(2025, 1, 31).unwrap()
        );
    }

    #[test]
    fn invalid_dates_rejected() {
        assert!(Date::from_ymd(2023, 2, 29).is_err());
        assert!(Date::from_ymd(1899, 12, 31).is_err());
        assert!(Date::from_serial(0).is_err());
        assert!(Date::MAX.advance(1, TimeUnit::Days).is_err());
    }

    #[test]
    fn display_is_iso() {
        let d = Date::from_ymd(2002, 5, 15).unwrap();
        assert_eq!(d.to_string(), "2002-05-15");
        assert_eq!(d.day_of_year(), 135);
    }
}
