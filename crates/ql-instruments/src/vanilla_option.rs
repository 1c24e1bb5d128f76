//! Single-asset options with a terminal payoff.

use ql_core::errors::Result;
use ql_core::{ensure, Real};
use ql_time::Date;

use crate::dividends::DividendSchedule;
use crate::exercise::Exercise;
use crate::instrument::{Instrument, InstrumentArguments};
use crate::payoff::{OptionType, Payoff};

/// Terms of a vanilla option.
#[derive(Debug, Clone, PartialEq)]
pub struct VanillaOptionArguments {
    /// Payoff at exercise.
    pub payoff: Payoff,
    /// Exercise rights.
    pub exercise: Exercise,
    /// Discrete cash dividends paid by the underlying.
    pub dividends: DividendSchedule,
}

impl InstrumentArguments for VanillaOptionArguments {
    fn validate(&self) -> Result<()> {
        validate_payoff(&self.payoff)
    }
}

pub(crate) fn validate_payoff(payoff: &Payoff) -> Result<()> {
    let strike = payoff.strike();
    ensure!(
        strike.is_finite() && strike >= 0.0,
        "invalid strike {strike} in {payoff}"
    );
    if let Payoff::Gap { second_strike, .. } = payoff {
        ensure!(second_strike.is_finite(), "invalid second strike in {payoff}");
    }
    Ok(())
}

/// A vanilla option.
pub type VanillaOption = Instrument<VanillaOptionArguments>;

impl Instrument<VanillaOptionArguments> {
    /// Option on a non-dividend-paying underlying (or one whose yield is in
    /// the process).
    pub fn vanilla(payoff: Payoff, exercise: Exercise) -> Self {
        Self::new(VanillaOptionArguments {
            payoff,
            exercise,
            dividends: DividendSchedule::new(),
        })
    }

    /// Plain vanilla European call or put.
    pub fn european(option_type: OptionType, strike: Real, expiry: Date) -> Self {
        Self::vanilla(
            Payoff::plain_vanilla(option_type, strike),
            Exercise::european(expiry),
        )
    }

    /// Option paying the given discrete cash dividends.
    pub fn with_dividends(payoff: Payoff, exercise: Exercise, dividends: DividendSchedule) -> Self {
        Self::new(VanillaOptionArguments {
            payoff,
            exercise,
            dividends,
        })
    }

    /// The payoff.
    pub fn payoff(&self) -> &Payoff {
        &self.arguments().payoff
    }

    /// The exercise.
    pub fn exercise(&self) -> &Exercise {
        &self.arguments().exercise
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::ExerciseType;

    #[test]
    fn european_construction() {
        let expiry = Date::from_ymd(2026, 6, 15).unwrap();
        let opt = VanillaOption::european(OptionType::Call, 100.0, expiry);
        assert_eq!(opt.payoff().strike(), 100.0);
        assert_eq!(opt.payoff().option_type(), OptionType::Call);
        assert_eq!(opt.exercise().exercise_type(), ExerciseType::European);
        assert!(opt.arguments().dividends.is_empty());
    }

    #[test]
    fn negative_strike_is_rejected() {
        let expiry = Date::from_ymd(2026, 6, 15).unwrap();
        let opt = VanillaOption::european(OptionType::Put, -1.0, expiry);
        assert!(opt.arguments().validate().is_err());
    }
}
