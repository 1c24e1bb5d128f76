//! # ql-processes
//!
//! Stochastic processes driving the pricing engines: the generalized
//! Black-Scholes process and the Heston stochastic volatility process.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// Generalized Black-Scholes process.
pub mod black_scholes_process;

/// Heston process and its discretizations.
pub mod heston_process;

/// `StochasticProcess1D` trait.
pub mod stochastic_process;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use black_scholes_process::GeneralizedBlackScholesProcess;
pub use heston_process::{HestonDiscretization, HestonProcess, HestonState};
pub use stochastic_process::StochasticProcess1D;
