//! Units of time used by [`Period`](crate::period::Period).

use serde::{Deserialize, Serialize};

/// A unit of calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeUnit {
    /// Calendar days.
    Days,
    /// Calendar weeks (7 days).
    Weeks,
    /// Calendar months.
    Months,
    /// Calendar years (12 months).
    Years,
}

impl TimeUnit {
    /// Single-letter suffix used when printing periods (`D`, `W`, `M`, `Y`).
    pub fn suffix(self) -> char {
        match self {
            TimeUnit::Days => 'D',
            TimeUnit::Weeks => 'W',
            TimeUnit::Months => 'M',
            TimeUnit::Years => 'Y',
        }
    }
}

impl std::fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeUnit::Days => "Day(s)",
            TimeUnit::Weeks => "Week(s)",
            TimeUnit::Months => "Month(s)",
            TimeUnit::Years => "Year(s)",
        };
        f.write_str(s)
    }
}
