//! Black volatility term structures.
//!
//! * [`BlackConstantVol`]: one volatility for all maturities and strikes,
//!   read from a quote.
//! * [`BlackVarianceCurve`]: strike-independent volatilities at given dates,
//!   interpolated linearly in total variance.

use std::sync::Arc;

use crate::term_structure::{ReferenceDate, TermStructure, TermStructureData};
use ql_core::errors::Result;
use ql_core::versioning::{latest_version, Version, Versioned};
use ql_core::{ensure, Handle, Real, Time, Volatility};
use ql_math::interpolations::{Interpolation, LinearInterpolation};
use ql_quotes::{Quote, SimpleQuote};
use ql_time::{Date, DayCounter};

/// A Black volatility surface `σ(t, K)`.
///
/// Implementors provide [`black_variance_impl`](Self::black_variance_impl)
/// or [`black_vol_impl`](Self::black_vol_impl).
pub trait BlackVolTermStructure: TermStructure {
    /// Black volatility at `(t, strike)`, without range checks.
    fn black_vol_impl(&self, t: Time, strike: Real) -> Result<Volatility> {
        let t = t.max(1e-5);
        Ok((self.black_variance_impl(t, strike)? / t).sqrt())
    }

    /// Total variance `σ²·t` at `(t, strike)`, without range checks.
    fn black_variance_impl(&self, t: Time, strike: Real) -> Result<Real> {
        let vol = self.black_vol_impl(t, strike)?;
        Ok(vol * vol * t)
    }

    /// Black volatility for time `t` and `strike`.
    fn black_vol(&self, t: Time, strike: Real) -> Result<Volatility> {
        self.check_range(t)?;
        self.black_vol_impl(t, strike)
    }

    /// Total Black variance for time `t` and `strike`.
    fn black_variance(&self, t: Time, strike: Real) -> Result<Real> {
        self.check_range(t)?;
        self.black_variance_impl(t, strike)
    }

    /// Black volatility for `date` and `strike`.
    fn black_vol_date(&self, date: Date, strike: Real) -> Result<Volatility> {
        self.black_vol(self.time_from_reference(date)?, strike)
    }

    /// Total Black variance for `date` and `strike`.
    fn black_variance_date(&self, date: Date, strike: Real) -> Result<Real> {
        self.black_variance(self.time_from_reference(date)?, strike)
    }

    /// Variance accrued between `t1` and `t2`.
    fn black_forward_variance(&self, t1: Time, t2: Time, strike: Real) -> Result<Real> {
        ensure!(t2 >= t1, "t2 ({t2}) earlier than t1 ({t1})");
        let v1 = self.black_variance(t1, strike)?;
        let v2 = self.black_variance(t2, strike)?;
        ensure!(v2 >= v1, "variance must be non-decreasing in time");
        Ok(v2 - v1)
    }

    /// Volatility implied by the variance accrued between `t1` and `t2`.
    fn black_forward_vol(&self, t1: Time, t2: Time, strike: Real) -> Result<Volatility> {
        if t2 == t1 {
            return self.black_vol(t1, strike);
        }
        Ok((self.black_forward_variance(t1, t2, strike)? / (t2 - t1)).sqrt())
    }
}

// ── BlackConstantVol ──────────────────────────────────────────────────────────

/// A flat Black volatility.
#[derive(Debug)]
pub struct BlackConstantVol {
    data: TermStructureData,
    volatility: Handle<dyn Quote>,
}

impl BlackConstantVol {
    /// Surface driven by the quote behind `volatility`.
    pub fn new(
        reference: ReferenceDate,
        volatility: Handle<dyn Quote>,
        day_counter: Arc<dyn DayCounter>,
    ) -> Self {
        Self {
            data: TermStructureData::new(reference, day_counter),
            volatility,
        }
    }

    /// Surface at a fixed reference date with a constant volatility.
    pub fn with_vol(reference_date: Date, volatility: Volatility, day_counter: Arc<dyn DayCounter>) -> Self {
        let quote: Arc<dyn Quote> = SimpleQuote::shared(volatility);
        Self::new(ReferenceDate::Fixed(reference_date), Handle::new(quote), day_counter)
    }

    /// The current volatility.
    pub fn volatility(&self) -> Result<Volatility> {
        self.volatility.current()?.value()
    }
}

impl Versioned for BlackConstantVol {
    fn version(&self) -> Version {
        latest_version([self.data.version(), self.volatility.version()])
    }
}

impl TermStructure for BlackConstantVol {
    fn data(&self) -> &TermStructureData {
        &self.data
    }

    fn max_date(&self) -> Result<Date> {
        Ok(Date::MAX)
    }
}

impl BlackVolTermStructure for BlackConstantVol {
    fn black_vol_impl(&self, _t: Time, _strike: Real) -> Result<Volatility> {
        self.volatility()
    }

    fn black_variance_impl(&self, t: Time, _strike: Real) -> Result<Real> {
        let vol = self.volatility()?;
        Ok(vol * vol * t)
    }
}

// ── BlackVarianceCurve ────────────────────────────────────────────────────────

/// Strike-independent volatilities at a set of dates.
///
/// Total variance is linear in time between the dates (and from zero at the
/// reference date); past the last date the last volatility is held flat when
/// extrapolation is enabled.
#[derive(Debug)]
pub struct BlackVarianceCurve {
    data: TermStructureData,
    dates: Vec<Date>,
    times: Vec<Time>,
    variances: Vec<Real>,
    interpolation: LinearInterpolation,
}

impl BlackVarianceCurve {
    /// Build the curve from the reference date and `(dates, vols)` nodes.
    ///
    /// Total variance must be non-decreasing across the dates.
    pub fn new(
        reference_date: Date,
        dates: Vec<Date>,
        volatilities: &[Volatility],
        day_counter: Arc<dyn DayCounter>,
    ) -> Result<Self> {
        ensure!(!dates.is_empty(), "variance curve needs at least one date");
        ensure!(
            dates.len() == volatilities.len(),
            "{} dates but {} volatilities",
            dates.len(),
            volatilities.len()
        );
        ensure!(dates[0] > reference_date, "first date must be after the reference date");
        ensure!(
            dates.windows(2).all(|w| w[1] > w[0]),
            "variance curve dates must be strictly increasing"
        );
        let mut times = vec![0.0];
        let mut variances = vec![0.0];
        for (&d, &vol) in dates.iter().zip(volatilities) {
            let t = day_counter.year_fraction(reference_date, d);
            let v = vol * vol * t;
            ensure!(
                v >= variances[variances.len() - 1],
                "variance must be non-decreasing (date {d})"
            );
            times.push(t);
            variances.push(v);
        }
        let interpolation = LinearInterpolation::new(&times, &variances)?;
        Ok(Self {
            data: TermStructureData::new(ReferenceDate::Fixed(reference_date), day_counter),
            dates,
            times,
            variances,
            interpolation,
        })
    }

    /// Node dates.
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }
}

impl Versioned for BlackVarianceCurve {
    fn version(&self) -> Version {
        self.data.version()
    }
}

impl TermStructure for BlackVarianceCurve {
    fn data(&self) -> &TermStructureData {
        &self.data
    }

    fn max_date(&self) -> Result<Date> {
        Ok(self.dates[self.dates.len() - 1])
    }
}

impl BlackVolTermStructure for BlackVarianceCurve {
    fn black_variance_impl(&self, t: Time, _strike: Real) -> Result<Real> {
        let last = self.times.len() - 1;
        if t <= self.times[last] {
            Ok(self.interpolation.value(t))
        } else {
            Ok(self.variances[last] * t / self.times[last])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_time::Actual365Fixed;

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn constant_vol() {
        let surface = BlackConstantVol::with_vol(date(2025, 1, 2), 0.2, Arc::new(Actual365Fixed));
        assert_abs_diff_eq!(surface.black_vol(1.0, 100.0).unwrap(), 0.2, epsilon = 1e-15);
        assert_abs_diff_eq!(surface.black_variance(2.0, 50.0).unwrap(), 0.08, epsilon = 1e-15);
        assert_abs_diff_eq!(
            surface.black_forward_vol(1.0, 2.0, 100.0).unwrap(),
            0.2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn variance_curve_interpolates_total_variance() {
        let dc: Arc<dyn DayCounter> = Arc::new(Actual365Fixed);
        let today = date(2025, 1, 1);
        let curve = BlackVarianceCurve::new(
            today,
            vec![date(2026, 1, 1), date(2027, 1, 1)],
            &[0.2, 0.3],
            dc.clone(),
        )
        .unwrap();
        let t1 = dc.year_fraction(today, date(2026, 1, 1));
        let t2 = dc.year_fraction(today, date(2027, 1, 1));
        let v1 = 0.04 * t1;
        let v2 = 0.09 * t2;
        let mid = 0.5 * (t1 + t2);
        assert_abs_diff_eq!(curve.black_variance(mid, 100.0).unwrap(), 0.5 * (v1 + v2), epsilon = 1e-14);
        // the forward vol over the second year carries all the extra variance
        assert_abs_diff_eq!(
            curve.black_forward_variance(t1, t2, 100.0).unwrap(),
            v2 - v1,
            epsilon = 1e-14
        );
        assert!(curve.black_vol(t2 + 1.0, 100.0).is_err());
        curve.enable_extrapolation();
        assert_abs_diff_eq!(curve.black_vol(t2 + 1.0, 100.0).unwrap(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn decreasing_variance_is_rejected() {
        let r = BlackVarianceCurve::new(
            date(2025, 1, 1),
            vec![date(2026, 1, 1), date(2027, 1, 1)],
            &[0.4, 0.1],
            Arc::new(Actual365Fixed),
        );
        assert!(r.is_err());
    }
}
