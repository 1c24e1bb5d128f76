//! Option payoffs.
//!
//! [`Payoff`] is a closed set of striked payoffs; engines match on it to
//! decide what they support.

use std::fmt;

use serde::{Deserialize, Serialize};

use ql_core::Real;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// A call option (right to buy).
    Call,
    /// A put option (right to sell).
    Put,
}

impl OptionType {
    /// +1 for Call, −1 for Put.
    pub fn sign(self) -> Real {
        match self {
            OptionType::Call => 1.0,
            OptionType::Put => -1.0,
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "Call"),
            OptionType::Put => write!(f, "Put"),
        }
    }
}

/// Terminal payoff of an option as a function of the underlying price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Payoff {
    /// `max(φ(S − K), 0)`.
    PlainVanilla {
        /// Call or put.
        option_type: OptionType,
        /// Strike.
        strike: Real,
    },
    /// `cash` if `φ(S − K) > 0`.
    CashOrNothing {
        /// Call or put.
        option_type: OptionType,
        /// Strike.
        strike: Real,
        /// Amount paid in the money.
        cash: Real,
    },
    /// `S` if `φ(S − K) > 0`.
    AssetOrNothing {
        /// Call or put.
        option_type: OptionType,
        /// Strike.
        strike: Real,
    },
    /// `φ(S − K₂)` if `φ(S − K) ≥ 0`, where `K` triggers and `K₂` pays.
    Gap {
        /// Call or put.
        option_type: OptionType,
        /// Trigger strike.
        strike: Real,
        /// Payoff strike.
        second_strike: Real,
    },
}

impl Payoff {
    /// Plain vanilla payoff.
    pub fn plain_vanilla(option_type: OptionType, strike: Real) -> Self {
        Payoff::PlainVanilla { option_type, strike }
    }

    /// Cash-or-nothing payoff.
    pub fn cash_or_nothing(option_type: OptionType, strike: Real, cash: Real) -> Self {
        Payoff::CashOrNothing {
            option_type,
            strike,
            cash,
        }
    }

    /// Asset-or-nothing payoff.
    pub fn asset_or_nothing(option_type: OptionType, strike: Real) -> Self {
        Payoff::AssetOrNothing { option_type, strike }
    }

    /// Gap payoff.
    pub fn gap(option_type: OptionType, strike: Real, second_strike: Real) -> Self {
        Payoff::Gap {
            option_type,
            strike,
            second_strike,
        }
    }

    /// Payoff at underlying price `price`.
    pub fn value(&self, price: Real) -> Real {
        let phi = self.option_type().sign();
        match *self {
            Payoff::PlainVanilla { strike, .. } => (phi * (price - strike)).max(0.0),
            Payoff::CashOrNothing { strike, cash, .. } => {
                if phi * (price - strike) > 0.0 {
                    cash
                } else {
                    0.0
                }
            }
            Payoff::AssetOrNothing { strike, .. } => {
                if phi * (price - strike) > 0.0 {
                    price
                } else {
                    0.0
                }
            }
            Payoff::Gap {
                strike,
                second_strike,
                ..
            } => {
                if phi * (price - strike) >= 0.0 {
                    phi * (price - second_strike)
                } else {
                    0.0
                }
            }
        }
    }

    /// The (trigger) strike.
    pub fn strike(&self) -> Real {
        match *self {
            Payoff::PlainVanilla { strike, .. }
            | Payoff::CashOrNothing { strike, .. }
            | Payoff::AssetOrNothing { strike, .. }
            | Payoff::Gap { strike, .. } => strike,
        }
    }

    /// Call or put.
    pub fn option_type(&self) -> OptionType {
        match *self {
            Payoff::PlainVanilla { option_type, .. }
            | Payoff::CashOrNothing { option_type, .. }
            | Payoff::AssetOrNothing { option_type, .. }
            | Payoff::Gap { option_type, .. } => option_type,
        }
    }

    /// `true` for [`Payoff::PlainVanilla`].
    pub fn is_plain_vanilla(&self) -> bool {
        matches!(self, Payoff::PlainVanilla { .. })
    }

    /// Short name of the payoff kind.
    pub fn name(&self) -> &'static str {
        match self {
            Payoff::PlainVanilla { .. } => "Vanilla",
            Payoff::CashOrNothing { .. } => "CashOrNothing",
            Payoff::AssetOrNothing { .. } => "AssetOrNothing",
            Payoff::Gap { .. } => "Gap",
        }
    }
}

impl fmt::Display for Payoff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} @ {}", self.name(), self.option_type(), self.strike())
    }
}
