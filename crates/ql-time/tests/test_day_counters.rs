//! Year fractions against published ISDA examples.

use approx::assert_abs_diff_eq;
use ql_time::{Actual360, Actual365Fixed, ActualActualIsda, Date, DayCounter, Thirty360};

fn date(y: u16, m: u8, d: u8) -> Date {
    Date::from_ymd(y, m, d).unwrap()
}

#[test]
fn actual_actual_isda_examples() {
    let cases = [
        (date(2003, 11, 1), date(2004, 5, 1), 0.497724380567),
        (date(1999, 2, 1), date(1999, 7, 1), 0.410958904110),
        (date(1999, 7, 1), date(2000, 7, 1), 1.001377348600),
        (date(2002, 8, 15), date(2003, 7, 15), 0.915068493151),
        (date(2003, 7, 15), date(2004, 1, 15), 0.504004790778),
        (date(2000, 1, 30), date(2000, 6, 30), 0.415300546448),
    ];
    for (d1, d2, expected) in cases {
        assert_abs_diff_eq!(ActualActualIsda.year_fraction(d1, d2), expected, epsilon = 1e-10);
    }
}

#[test]
fn simple_conventions() {
    let (d1, d2) = (date(2024, 1, 15), date(2024, 4, 15));
    assert_eq!(Actual365Fixed.day_count(d1, d2), 91);
    assert_abs_diff_eq!(Actual360.year_fraction(d1, d2), 91.0 / 360.0);
    assert_abs_diff_eq!(Thirty360.year_fraction(d1, d2), 0.25);
    assert_eq!(Actual365Fixed.name(), "Actual/365 (Fixed)");
}
