//! # ql-termstructures
//!
//! Yield curves and Black volatility term structures.  Every structure is
//! [`Versioned`](ql_core::Versioned): its version moves with its quotes and,
//! for floating reference dates, with the evaluation date.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Modules ───────────────────────────────────────────────────────────────────

/// `TermStructure` base trait and reference date policies.
pub mod term_structure;

/// `YieldTermStructure`: discount factors and continuously-compounded rates.
pub mod yield_term_structure;

/// `FlatForward`: quote-driven constant-rate curve.
pub mod flat_forward;

/// `InterpolatedZeroCurve`: linear zero-rate curve.
pub mod interpolated_zero_curve;

/// Black volatility term structures.
pub mod black_vol_term_structure;

// ── Convenience re-exports ────────────────────────────────────────────────────

pub use black_vol_term_structure::{BlackConstantVol, BlackVarianceCurve, BlackVolTermStructure};
pub use flat_forward::FlatForward;
pub use interpolated_zero_curve::InterpolatedZeroCurve;
pub use term_structure::{ReferenceDate, TermStructure, TermStructureData};
pub use yield_term_structure::YieldTermStructure;
