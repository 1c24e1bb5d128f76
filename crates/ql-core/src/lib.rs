//! # ql-core
//!
//! Core types, traits, and error definitions shared by every crate in the
//! workspace: numeric type aliases, the error enum, version stamps used for
//! cache invalidation, relinkable handles and the fixing time series.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// ── Public modules ───────────────────────────────────────────────────────────

/// Error types and the `ensure!` / `fail!` / `ensure_post!` macros.
pub mod errors;

/// Shared, relinkable references (`Handle<T>`, `RelinkableHandle<T>`).
pub mod handle;

/// Lazy caching keyed on input versions.
pub mod patterns;

/// Generic time-series container.
pub mod time_series;

/// Version stamps and the `Versioned` trait.
pub mod versioning;

// ── Primitive type aliases ────────────────────────────────────────────────────

/// Floating-point type used throughout the library.
pub type Real = f64;

/// A rate expressed as a decimal (e.g. 0.05 = 5 %).
pub type Rate = Real;

/// A discount factor in [0, 1].
pub type DiscountFactor = Real;

/// A price or value.
pub type Price = Real;

/// A volatility level expressed as a decimal.
pub type Volatility = Real;

/// A time measurement in years.
pub type Time = Real;

// ── Re-exports for convenience ────────────────────────────────────────────────

pub use errors::{Error, Result};
pub use handle::{Handle, RelinkableHandle};
pub use patterns::lazy_object::LazyCache;
pub use time_series::TimeSeries;
pub use versioning::{latest_version, Version, VersionStamp, Versioned};
