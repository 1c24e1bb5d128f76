//! The evaluation date shared by a family of market objects.
//!
//! Term structures with a floating reference date hold an
//! `Arc<EvaluationContext>` and measure times from its current date.  Moving
//! the date bumps the context's version, which invalidates every cache that
//! depends on it.  [`SavedContext`] restores the previous date when dropped,
//! so a scenario can move the date freely and leave the context unchanged.

use std::sync::{PoisonError, RwLock};

use crate::date::Date;
use ql_core::versioning::{Version, VersionStamp, Versioned};

/// Holder of the evaluation date.
#[derive(Debug)]
pub struct EvaluationContext {
    date: RwLock<Date>,
    stamp: VersionStamp,
}

impl EvaluationContext {
    /// Create a context evaluating at `date`.
    pub fn new(date: Date) -> Self {
        Self {
            date: RwLock::new(date),
            stamp: VersionStamp::new(),
        }
    }

    /// Current evaluation date.
    pub fn evaluation_date(&self) -> Date {
        *self.date.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the evaluation date.  Setting the same date again is a no-op.
    pub fn set_evaluation_date(&self, date: Date) {
        let mut current = self.date.write().unwrap_or_else(PoisonError::into_inner);
        if *current != date {
            *current = date;
            self.stamp.touch();
        }
    }

    /// Snapshot the current date; it is restored when the guard drops.
    pub fn save(&self) -> SavedContext<'_> {
        SavedContext {
            context: self,
            saved: self.evaluation_date(),
        }
    }

    /// Move to `date` for the lifetime of the returned guard.
    pub fn scoped(&self, date: Date) -> SavedContext<'_> {
        let guard = self.save();
        self.set_evaluation_date(date);
        guard
    }
}

impl Versioned for EvaluationContext {
    fn version(&self) -> Version {
        self.stamp.get()
    }
}

/// Restores the evaluation date of an [`EvaluationContext`] on drop.
#[derive(Debug)]
#[must_use = "the saved date is restored as soon as the guard is dropped"]
pub struct SavedContext<'a> {
    context: &'a EvaluationContext,
    saved: Date,
}

impl SavedContext<'_> {
    /// The date that will be restored.
    pub fn saved_date(&self) -> Date {
        self.saved
    }
}

impl Drop for SavedContext<'_> {
    fn drop(&mut self) {
        self.context.set_evaluation_date(self.saved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: u16, m: u8, d: u8) -> Date {
        Date::from_ymd(y, m, d).unwrap()
    }

    #[test]
    fn scoped_date_is_restored() {
        let ctx = EvaluationContext::new(date(2024, 1, 2));
        {
            let _g = ctx.scoped(date(2025, 6, 30));
            assert_eq!(ctx.evaluation_date(), date(2025, 6, 30));
            ctx.set_evaluation_date(date(2026, 1, 1));
        }
        assert_eq!(ctx.evaluation_date(), date(2024, 1, 2));
    }

    #[test]
    fn moving_the_date_bumps_version() {
        let ctx = EvaluationContext::new(date(2024, 1, 2));
        let v0 = ctx.version();
        ctx.set_evaluation_date(date(2024, 1, 2));
        assert_eq!(ctx.version(), v0);
        ctx.set_evaluation_date(date(2024, 1, 3));
        assert!(ctx.version() > v0);
    }
}
