//! `YieldTermStructure`: discount factors, zero rates and forward rates.
//!
//! Concrete curves implement one of the `*_impl` hooks; the public queries
//! add range checks and date conversion.  All rates are continuously
//! compounded.

use crate::term_structure::TermStructure;
use ql_core::errors::Result;
use ql_core::{DiscountFactor, Rate, Time};
use ql_time::Date;

/// Time step used when a forward rate is requested over an empty interval.
const DT: Time = 1.0e-4;

/// A yield (interest-rate) term structure.
///
/// Implementors provide either [`discount_impl`](Self::discount_impl) or
/// [`zero_rate_impl`](Self::zero_rate_impl); the other follows from
/// `P(t) = exp(-z(t)·t)`.
pub trait YieldTermStructure: TermStructure {
    /// Discount factor at `t`, without range checks.
    fn discount_impl(&self, t: Time) -> Result<DiscountFactor> {
        Ok((-self.zero_rate_impl(t)? * t).exp())
    }

    /// Continuously-compounded zero rate at `t`, without range checks.
    fn zero_rate_impl(&self, t: Time) -> Result<Rate> {
        let t = t.max(DT);
        Ok(-self.discount_impl(t)?.ln() / t)
    }

    /// Discount factor for time `t`.
    fn discount(&self, t: Time) -> Result<DiscountFactor> {
        self.check_range(t)?;
        self.discount_impl(t)
    }

    /// Discount factor for `date`.
    fn discount_date(&self, date: Date) -> Result<DiscountFactor> {
        self.discount(self.time_from_reference(date)?)
    }

    /// Continuously-compounded zero rate for time `t`.
    fn zero_rate(&self, t: Time) -> Result<Rate> {
        self.check_range(t)?;
        self.zero_rate_impl(t)
    }

    /// Continuously-compounded zero rate for `date`.
    fn zero_rate_date(&self, date: Date) -> Result<Rate> {
        self.zero_rate(self.time_from_reference(date)?)
    }

    /// Continuously-compounded forward rate between `t1` and `t2`; for
    /// `t1 == t2` the instantaneous forward rate.
    fn forward_rate(&self, t1: Time, t2: Time) -> Result<Rate> {
        let (t1, t2) = if t2 - t1 < DT {
            let lo = (t1 - DT / 2.0).max(0.0);
            (lo, lo + DT)
        } else {
            (t1, t2)
        };
        self.check_range(t2)?;
        let d1 = self.discount(t1)?;
        let d2 = self.discount_impl(t2)?;
        Ok((d1 / d2).ln() / (t2 - t1))
    }

    /// Continuously-compounded forward rate between two dates.
    fn forward_rate_dates(&self, d1: Date, d2: Date) -> Result<Rate> {
        self.forward_rate(self.time_from_reference(d1)?, self.time_from_reference(d2)?)
    }
}
