//! `FlatForward`: a yield curve with a constant continuously-compounded
//! forward rate read from a quote.

use std::sync::Arc;

use crate::term_structure::{ReferenceDate, TermStructure, TermStructureData};
use crate::yield_term_structure::YieldTermStructure;
use ql_core::errors::Result;
use ql_core::versioning::{latest_version, Version, Versioned};
use ql_core::{DiscountFactor, Handle, Rate, Time};
use ql_quotes::{Quote, SimpleQuote};
use ql_time::{Date, DayCounter};

/// A flat forward-rate yield curve.
///
/// `P(t) = exp(-r·t)` with `r` the current value of the rate quote.
#[derive(Debug)]
pub struct FlatForward {
    data: TermStructureData,
    rate: Handle<dyn Quote>,
}

impl FlatForward {
    /// Curve driven by the quote behind `rate`.
    pub fn new(reference: ReferenceDate, rate: Handle<dyn Quote>, day_counter: Arc<dyn DayCounter>) -> Self {
        Self {
            data: TermStructureData::new(reference, day_counter),
            rate,
        }
    }

    /// Curve at a fixed reference date with a constant rate.
    pub fn with_rate(reference_date: Date, rate: Rate, day_counter: Arc<dyn DayCounter>) -> Self {
        let quote: Arc<dyn Quote> = SimpleQuote::shared(rate);
        Self::new(ReferenceDate::Fixed(reference_date), Handle::new(quote), day_counter)
    }

    /// The current continuously-compounded rate.
    pub fn rate(&self) -> Result<Rate> {
        self.rate.current()?.value()
    }
}

impl Versioned for FlatForward {
    fn version(&self) -> Version {
        latest_version([self.data.version(), self.rate.version()])
    }
}

impl TermStructure for FlatForward {
    fn data(&self) -> &TermStructureData {
        &self.data
    }

    fn max_date(&self) -> Result<Date> {
        Ok(Date::MAX)
    }
}

impl YieldTermStructure for FlatForward {
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        Ok((-self.rate()? * t).exp())
    }

    fn zero_rate_impl(&self, _t: Time) -> Result<Rate> {
        self.rate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ql_core::errors::Error;
    use ql_time::{Actual365Fixed, EvaluationContext, NullCalendar};

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn discount_zero_and_forward_rates() {
        let curve = FlatForward::with_rate(date(2025, 1, 2), 0.05, Arc::new(Actual365Fixed));
        assert_abs_diff_eq!(curve.discount(0.0).unwrap(), 1.0, epsilon = 1e-15);
        assert_abs_diff_eq!(curve.discount(10.0).unwrap(), (-0.5f64).exp(), epsilon = 1e-12);
        assert_abs_diff_eq!(curve.zero_rate(3.0).unwrap(), 0.05, epsilon = 1e-15);
        assert_abs_diff_eq!(curve.forward_rate(1.0, 2.0).unwrap(), 0.05, epsilon = 1e-12);
        assert_abs_diff_eq!(curve.forward_rate(1.0, 1.0).unwrap(), 0.05, epsilon = 1e-10);
    }

    #[test]
    fn negative_time_is_stale() {
        let curve = FlatForward::with_rate(date(2025, 1, 2), 0.05, Arc::new(Actual365Fixed));
        assert!(matches!(curve.discount(-0.1), Err(Error::StaleMarketData(_))));
        assert!(curve.discount_date(date(2024, 12, 31)).is_err());
    }

    #[test]
    fn quote_changes_propagate() {
        let r = SimpleQuote::shared(0.03);
        let handle: Handle<dyn Quote> = Handle::new(r.clone());
        let curve = FlatForward::new(ReferenceDate::Fixed(date(2025, 1, 2)), handle, Arc::new(Actual365Fixed));
        let v0 = curve.version();
        r.set_value(0.04);
        assert!(curve.version() > v0);
        assert_abs_diff_eq!(curve.discount(1.0).unwrap(), (-0.04f64).exp(), epsilon = 1e-15);
    }

    #[test]
    fn floating_curve_moves_with_evaluation_date() {
        let ctx = Arc::new(EvaluationContext::new(date(2025, 1, 2)));
        let rate: Arc<dyn Quote> = SimpleQuote::shared(0.05);
        let curve = FlatForward::new(
            ReferenceDate::floating(ctx.clone(), Arc::new(NullCalendar)),
            Handle::new(rate),
            Arc::new(Actual365Fixed),
        );
        let maturity = date(2026, 1, 2);
        let before = curve.discount_date(maturity).unwrap();
        let v0 = curve.version();
        ctx.set_evaluation_date(date(2025, 7, 3));
        let after = curve.discount_date(maturity).unwrap();
        assert!(after > before);
        assert!(curve.version() > v0);
        assert_abs_diff_eq!(after, (-0.05 * 183.0 / 365.0f64).exp(), epsilon = 1e-14);
    }
}
