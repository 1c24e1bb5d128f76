//! # ql-quotes
//!
//! Versioned market quotes: scalar inputs that term structures and
//! processes read through [`Handle`](ql_core::Handle)s.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// `Quote` trait and concrete implementations.
pub mod quote;

pub use quote::{CompositeQuote, DerivedQuote, Quote, SimpleQuote};
