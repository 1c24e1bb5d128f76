//! Business-day calendars.

use crate::business_day_convention::BusinessDayConvention;
use crate::date::Date;
use crate::period::Period;
use crate::time_unit::TimeUnit;
use ql_core::errors::Result;

/// A financial calendar.
pub trait Calendar: std::fmt::Debug + Send + Sync {
    /// Calendar name.
    fn name(&self) -> &str;

    /// `true` if `date` is a business day.
    fn is_business_day(&self, date: Date) -> bool;

    /// `true` if `date` is a holiday or weekend.
    fn is_holiday(&self, date: Date) -> bool {
        !self.is_business_day(date)
    }

    /// Roll `date` onto a business day according to `convention`.
    fn adjust(&self, date: Date, convention: BusinessDayConvention) -> Date {
        let roll = |mut d: Date, step: i32| {
            while self.is_holiday(d) {
                d += step;
            }
            d
        };
        match convention {
            BusinessDayConvention::Unadjusted => date,
            BusinessDayConvention::Following => roll(date, 1),
            BusinessDayConvention::Preceding => roll(date, -1),
            BusinessDayConvention::ModifiedFollowing => {
                let d = roll(date, 1);
                if d.month() == date.month() {
                    d
                } else {
                    roll(date, -1)
                }
            }
            BusinessDayConvention::ModifiedPreceding => {
                let d = roll(date, -1);
                if d.month() == date.month() {
                    d
                } else {
                    roll(date, 1)
                }
            }
        }
    }

    /// Advance `date` by `period`.  Day periods count business days; longer
    /// periods move in calendar time and are then adjusted.
    fn advance(
        &self,
        date: Date,
        period: Period,
        convention: BusinessDayConvention,
    ) -> Result<Date> {
        if period.unit == TimeUnit::Days {
            let step = period.length.signum();
            let mut d = self.adjust(date, BusinessDayConvention::Following);
            for _ in 0..period.length.abs() {
                d += step;
                while self.is_holiday(d) {
                    d += step;
                }
            }
            return Date::from_serial(d.serial());
        }
        Ok(self.adjust(date.advance_by(period)?, convention))
    }

    /// Business days in `(from, to]`; negative if `to < from`.
    fn business_days_between(&self, from: Date, to: Date) -> i32 {
        let (lo, hi, sign) = if to >= from { (from, to, 1) } else { (to, from, -1) };
        let count = (1..=(hi - lo))
            .filter(|&i| self.is_business_day(lo + i))
            .count() as i32;
        sign * count
    }
}

/// Every day is a business day.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullCalendar;

impl Calendar for NullCalendar {
    fn name(&self) -> &str {
        "Null"
    }

    fn is_business_day(&self, _date: Date) -> bool {
        true
    }
}

/// Saturdays and Sundays are the only holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct WeekendsOnly;

impl Calendar for WeekendsOnly {
    fn name(&self) -> &str {
        "Weekends Only"
    }

    fn is_business_day(&self, date: Date) -> bool {
        !date.weekday().is_weekend()
    }
}

/// The TARGET settlement calendar.
///
/// Holidays: weekends, January 1st, Good Friday and Easter Monday (from
/// 2000), May 1st (from 2000), December 25th and 26th, and December 31st in
/// 1998, 1999 and 2001.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target;

impl Calendar for Target {
    fn name(&self) -> &str {
        "TARGET"
    }

    fn is_business_day(&self, date: Date) -> bool {
        if date.weekday().is_weekend() {
            return false;
        }
        let (y, m, d) = (date.year(), date.month(), date.day_of_month());
        let em = easter_sunday_day_of_year(y) + 1;
        let dd = date.day_of_year();
        let holiday = (m == 1 && d == 1)
            || (y >= 2000 && (dd == em - 3 || dd == em))
            || (y >= 2000 && m == 5 && d == 1)
            || (m == 12 && (d == 25 || d == 26))
            || (m == 12 && d == 31 && matches!(y, 1998 | 1999 | 2001));
        !holiday
    }
}

/// Day of the year of Easter Sunday (anonymous Gregorian algorithm).
pub fn easter_sunday_day_of_year(year: u16) -> u16 {
    let y = i32::from(year);
    let a = y % 19;
    let (b, c) = (y / 100, y % 100);
    let (d, e) = (b / 4, b % 4);
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let (i, k) = (c / 4, c % 4);
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    Date::from_ymd(year, month as u8, day as u8).map_or(0, |d| d.day_of_year())
}
