//! A length of calendar time such as `3M` or `10Y`.

use serde::{Deserialize, Serialize};

use crate::time_unit::TimeUnit;

/// An integer number of [`TimeUnit`]s.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    /// Number of units.
    pub length: i32,
    /// The unit of time.
    pub unit: TimeUnit,
}

impl Period {
    /// Create a new period.
    pub fn new(length: i32, unit: TimeUnit) -> Self {
        Self { length, unit }
    }

    /// `n` days.
    pub fn days(n: i32) -> Self {
        Self::new(n, TimeUnit::Days)
    }

    /// `n` weeks.
    pub fn weeks(n: i32) -> Self {
        Self::new(n, TimeUnit::Weeks)
    }

    /// `n` months.
    pub fn months(n: i32) -> Self {
        Self::new(n, TimeUnit::Months)
    }

    /// `n` years.
    pub fn years(n: i32) -> Self {
        Self::new(n, TimeUnit::Years)
    }
}

impl std::ops::Neg for Period {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.length, self.unit)
    }
}

impl std::ops::Mul<i32> for Period {
    type Output = Self;
    fn mul(self, n: i32) -> Self {
        Self::new(self.length * n, self.unit)
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.length, self.unit.suffix())
    }
}

impl std::fmt::Debug for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Period({self})")
    }
}
