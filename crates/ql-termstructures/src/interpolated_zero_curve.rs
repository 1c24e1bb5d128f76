//! `InterpolatedZeroCurve`: a yield curve defined by zero rates at dates.
//!
//! Zero rates are interpolated linearly in time; `P(t) = exp(-z(t)·t)`.
//! Past the last date the zero rate is held flat when extrapolation is
//! enabled.

use std::sync::Arc;

use crate::term_structure::{ReferenceDate, TermStructure, TermStructureData};
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::Result;
use ql_core::versioning::{Version, Versioned};
use ql_core::{ensure, Rate, Real, Time};
use ql_math::interpolations::{Interpolation, LinearInterpolation};
use ql_time::{Date, DayCounter};

/// A yield curve through `(date, zero rate)` nodes.
#[derive(Debug)]
pub struct InterpolatedZeroCurve {
    data: TermStructureData,
    dates: Vec<Date>,
    times: Vec<Time>,
    rates: Vec<Rate>,
    interpolation: LinearInterpolation,
}

impl InterpolatedZeroCurve {
    /// Build the curve; the first date is the reference date.
    ///
    /// Dates must be strictly increasing and at least two must be given.
    pub fn new(dates: Vec<Date>, rates: Vec<Rate>, day_counter: Arc<dyn DayCounter>) -> Result<Self> {
        ensure!(dates.len() >= 2, "zero curve needs at least two dates");
        ensure!(
            dates.len() == rates.len(),
            "{} dates but {} zero rates",
            dates.len(),
            rates.len()
        );
        ensure!(
            dates.windows(2).all(|w| w[1] > w[0]),
            "zero curve dates must be strictly increasing"
        );
        let reference = dates[0];
        let times: Vec<Time> = dates
            .iter()
            .map(|&d| day_counter.year_fraction(reference, d))
            .collect();
        let interpolation = LinearInterpolation::new(&times, &rates)?;
        Ok(Self {
            data: TermStructureData::new(ReferenceDate::Fixed(reference), day_counter),
            dates,
            times,
            rates,
            interpolation,
        })
    }

    /// Node dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// Node times.
    pub fn times(&self) -> &[Time] {
        &self.times
    }

    /// Node zero rates.
    pub fn zero_rates(&self) -> &[Rate] {
        &self.rates
    }

    /// `(date, zero rate)` pairs.
    pub fn nodes(&self) -> impl Iterator<Item = (Date, Rate)> + '_ {
        self.dates.iter().copied().zip(self.rates.iter().copied())
    }
}

impl Versioned for InterpolatedZeroCurve {
    fn version(&self) -> Version {
        self.data.version()
    }
}

impl TermStructure for InterpolatedZeroCurve {
    fn data(&self) -> &TermStructureData {
        &self.data
    }

    fn max_date(&self) -> Result<Date> {
        Ok(self.dates[self.dates.len() - 1])
    }
}

impl YieldTermStructure for InterpolatedZeroCurve {
    fn zero_rate_impl(&self, t: Time) -> Result<Rate> {
        let last = self.times.len() - 1;
        let z: Real = if t <= self.times[last] {
            self.interpolation.value(t)
        } else {
            self.rates[last]
        };
        Ok(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::errors::Error;
    use ql_time::Actual365Fixed;

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    fn curve() -> InterpolatedZeroCurve {
        InterpolatedZeroCurve::new(
            vec![date(2024, 1, 1), date(2025, 1, 1), date(2026, 1, 1)],
            vec![0.02, 0.03, 0.04],
            Arc::new(Actual365Fixed),
        )
        .unwrap()
    }

    #[test]
    fn nodes_are_reproduced() {
        let c = curve();
        for (d, z) in c.nodes() {
            assert_abs_diff_eq!(c.zero_rate_date(d).unwrap(), z, epsilon = 1e-14);
        }
        let t = c.times()[1];
        assert_abs_diff_eq!(c.discount(t).unwrap(), (-0.03 * t).exp(), epsilon = 1e-14);
    }

    #[test]
    fn past_last_date_needs_extrapolation() {
        let c = curve();
        let far = date(2030, 1, 1);
        assert!(matches!(c.discount_date(far), Err(Error::StaleMarketData(_))));
        let v0 = c.version();
        c.enable_extrapolation();
        assert!(c.version() > v0);
        assert_abs_diff_eq!(c.zero_rate_date(far).unwrap(), 0.04, epsilon = 1e-14);
    }

    #[test]
    fn rejects_unsorted_dates() {
        let r = InterpolatedZeroCurve::new(
            vec![date(2024, 1, 1), date(2023, 1, 1)],
            vec![0.01, 0.02],
            Arc::new(Actual365Fixed),
        );
        assert!(r.is_err());
    }
}
