//! Rules for rolling a date that falls on a holiday.

use serde::{Deserialize, Serialize};

/// How to adjust a date that falls on a non-business day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BusinessDayConvention {
    /// First business day after the holiday.
    Following,
    /// First business day after the holiday, unless that crosses into the
    /// next month; then the first business day before it.
    ModifiedFollowing,
    /// First business day before the holiday.
    Preceding,
    /// First business day before the holiday, unless that crosses into the
    /// previous month; then the first business day after it.
    ModifiedPreceding,
    /// No adjustment.
    Unadjusted,
}
