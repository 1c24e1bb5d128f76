//! Single-barrier options.

use serde::{Deserialize, Serialize};

use ql_core::errors::Result;
use ql_core::{ensure, Real};

use crate::exercise::Exercise;
use crate::instrument::{Instrument, InstrumentArguments};
use crate::payoff::Payoff;
use crate::vanilla_option::validate_payoff;

/// Barrier type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BarrierType {
    /// Activated when the underlying falls below the barrier.
    DownIn,
    /// Activated when the underlying rises above the barrier.
    UpIn,
    /// Extinguished when the underlying falls below the barrier.
    DownOut,
    /// Extinguished when the underlying rises above the barrier.
    UpOut,
}

impl BarrierType {
    /// `true` for knock-in barriers.
    pub fn is_knock_in(self) -> bool {
        matches!(self, BarrierType::DownIn | BarrierType::UpIn)
    }

    /// `true` for barriers below the spot.
    pub fn is_down(self) -> bool {
        matches!(self, BarrierType::DownIn | BarrierType::DownOut)
    }

    /// `true` if an underlying at `price` has crossed `barrier`.
    pub fn is_triggered(self, price: Real, barrier: Real) -> bool {
        if self.is_down() {
            price < barrier
        } else {
            price > barrier
        }
    }
}

/// Terms of a barrier option.
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierOptionArguments {
    /// Payoff at expiry.
    pub payoff: Payoff,
    /// Exercise rights.
    pub exercise: Exercise,
    /// Barrier type.
    pub barrier_type: BarrierType,
    /// Barrier level.
    pub barrier: Real,
    /// Cash paid when a knock-out barrier is hit, or at expiry if a
    /// knock-in barrier never is.
    pub rebate: Real,
}

impl InstrumentArguments for BarrierOptionArguments {
    fn validate(&self) -> Result<()> {
        validate_payoff(&self.payoff)?;
        ensure!(
            self.barrier.is_finite() && self.barrier > 0.0,
            "invalid barrier level {}",
            self.barrier
        );
        ensure!(self.rebate >= 0.0, "negative rebate {}", self.rebate);
        Ok(())
    }
}

/// A barrier option.
pub type BarrierOption = Instrument<BarrierOptionArguments>;

impl Instrument<BarrierOptionArguments> {
    /// Single-barrier option.
    pub fn barrier(
        barrier_type: BarrierType,
        barrier: Real,
        rebate: Real,
        payoff: Payoff,
        exercise: Exercise,
    ) -> Self {
        Self::new(BarrierOptionArguments {
            payoff,
            exercise,
            barrier_type,
            barrier,
            rebate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoff::OptionType;
    use ql_time::Date;

    #[test]
    fn barrier_classification() {
        assert!(BarrierType::DownIn.is_knock_in());
        assert!(!BarrierType::UpOut.is_knock_in());
        assert!(BarrierType::DownOut.is_down());
        assert!(BarrierType::DownOut.is_triggered(89.0, 90.0));
        assert!(!BarrierType::DownOut.is_triggered(90.0, 90.0));
        assert!(BarrierType::UpIn.is_triggered(121.0, 120.0));
    }

    #[test]
    fn construction_and_validation() {
        let expiry = Date::from_ymd(2026, 6, 15).unwrap();
        let opt = BarrierOption::barrier(
            BarrierType::DownOut,
            80.0,
            0.0,
            Payoff::plain_vanilla(OptionType::Call, 100.0),
            Exercise::european(expiry),
        );
        assert_eq!(opt.arguments().barrier_type, BarrierType::DownOut);
        assert!(opt.arguments().validate().is_ok());

        let bad = BarrierOption::barrier(
            BarrierType::UpOut,
            120.0,
            -1.0,
            Payoff::plain_vanilla(OptionType::Call, 100.0),
            Exercise::european(expiry),
        );
        assert!(bad.arguments().validate().is_err());
    }
}
