//! Day-count conventions: how the year fraction between two dates is
//! measured.  Term structures use them to turn dates into times.

use crate::date::{is_leap_year, Date};
use ql_core::{Real, Time};

/// A convention for counting the fraction of a year between two dates.
pub trait DayCounter: std::fmt::Debug + Send + Sync {
    /// Name of the convention (e.g. `"Actual/365 (Fixed)"`).
    fn name(&self) -> &str;

    /// Days between `d1` and `d2` under this convention.
    fn day_count(&self, d1: Date, d2: Date) -> i64 {
        i64::from(d2 - d1)
    }

    /// Year fraction between `d1` and `d2`; negative if `d2 < d1`.
    fn year_fraction(&self, d1: Date, d2: Date) -> Time;
}

/// Actual/365 (Fixed).
#[derive(Debug, Clone, Copy, Default)]
pub struct Actual365Fixed;

impl DayCounter for Actual365Fixed {
    fn name(&self) -> &str {
        "Actual/365 (Fixed)"
    }

    fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        self.day_count(d1, d2) as Real / 365.0
    }
}

/// Actual/360.
#[derive(Debug, Clone, Copy, Default)]
pub struct Actual360;

impl DayCounter for Actual360 {
    fn name(&self) -> &str {
        "Actual/360"
    }

    fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        self.day_count(d1, d2) as Real / 360.0
    }
}

/// 30/360 (US bond basis).
#[derive(Debug, Clone, Copy, Default)]
pub struct Thirty360;

impl DayCounter for Thirty360 {
    fn name(&self) -> &str {
        "30/360 (Bond Basis)"
    }

    fn day_count(&self, d1: Date, d2: Date) -> i64 {
        let mut dd1 = i64::from(d1.day_of_month());
        let mut dd2 = i64::from(d2.day_of_month());
        if dd1 == 31 {
            dd1 = 30;
        }
        if dd2 == 31 && dd1 == 30 {
            dd2 = 30;
        }
        360 * (i64::from(d2.year()) - i64::from(d1.year()))
            + 30 * (i64::from(d2.month()) - i64::from(d1.month()))
            + (dd2 - dd1)
    }

    fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        self.day_count(d1, d2) as Real / 360.0
    }
}

/// Actual/Actual (ISDA): days in leap years count 1/366, others 1/365.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActualActualIsda;

impl DayCounter for ActualActualIsda {
    fn name(&self) -> &str {
        "Actual/Actual (ISDA)"
    }

    fn year_fraction(&self, d1: Date, d2: Date) -> Time {
        if d2 < d1 {
            return -self.year_fraction(d2, d1);
        }
        let (y1, y2) = (d1.year(), d2.year());
        let basis = |y: u16| if is_leap_year(y) { 366.0 } else { 365.0 };
        if y1 == y2 {
            return Real::from(d2 - d1) / basis(y1);
        }
        // Whole years in between count as one each; stubs at either end use
        // their own year's basis.
        let days_y1 = basis(y1) as i32 - i32::from(d1.day_of_year()) + 1;
        let days_y2 = i32::from(d2.day_of_year()) - 1;
        Real::from(days_y1) / basis(y1)
            + Real::from(y2 - y1 - 1)
            + Real::from(days_y2) / basis(y2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn actual_conventions() {
        let (d1, d2) = (date(2023, 1, 1), date(2023, 7, 1));
        assert_abs_diff_eq!(Actual365Fixed.year_fraction(d1, d2), 181.0 / 365.0);
        assert_abs_diff_eq!(Actual360.year_fraction(d1, d2), 181.0 / 360.0);
        assert_abs_diff_eq!(Actual365Fixed.year_fraction(d2, d1), -181.0 / 365.0);
    }

    #[test]
    fn thirty_360_end_of_month() {
        assert_eq!(Thirty360.day_count(date(2023, 1, 31), date(2023, 3, 31)), 60);
        assert_abs_diff_eq!(
            Thirty360.year_fraction(date(2023, 1, 1), date(2024, 1, 1)),
            1.0
        );
    }

    #[test]
    fn actual_actual_isda_across_leap_year() {
        let yf = ActualActualIsda.year_fraction(date(2003, 11, 1), date(2004, 5, 1));
        assert_abs_diff_eq!(yf, 61.0 / 365.0 + 121.0 / 366.0, epsilon = 1e-14);
        let whole = ActualActualIsda.year_fraction(date(2001, 1, 1), date(2004, 1, 1));
        assert_abs_diff_eq!(whole, 3.0, epsilon = 1e-14);
    }
}
