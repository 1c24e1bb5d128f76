//! `Quote` trait, the mutable [`SimpleQuote`] and quotes derived from other
//! quotes.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use ql_core::errors::{Error, Result};
use ql_core::versioning::{latest_version, Version, VersionStamp, Versioned};
use ql_core::{Handle, Real};

/// A market-observable value.
///
/// The version changes whenever the value may have changed, so consumers
/// can cache anything computed from it.
pub trait Quote: Versioned + fmt::Debug + Send + Sync {
    /// Current value; `StaleMarketData` if the quote holds no value.
    fn value(&self) -> Result<Real>;

    /// Return `true` if the quote currently holds a value.
    fn is_valid(&self) -> bool {
        self.value().is_ok()
    }
}

/// A mutable market quote.
///
/// Shared through `Arc`; [`set_value`][Self::set_value] takes `&self` so a
/// scenario can move spot or volatility while curves and processes keep
/// pointing at the same object.
#[derive(Debug, Default)]
pub struct SimpleQuote {
    value: RwLock<Option<Real>>,
    stamp: VersionStamp,
}

impl SimpleQuote {
    /// Create a quote holding `value`.
    pub fn new(value: Real) -> Self {
        Self {
            value: RwLock::new(Some(value)),
            stamp: VersionStamp::new(),
        }
    }

    /// Create a quote with no value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Shorthand for `Arc::new(SimpleQuote::new(value))`.
    pub fn shared(value: Real) -> Arc<Self> {
        Arc::new(Self::new(value))
    }

    /// Set a new value and return the previous one.
    ///
    /// The version is bumped only if the value actually changes.
    pub fn set_value(&self, value: Real) -> Option<Real> {
        let mut slot = self.value.write().unwrap_or_else(PoisonError::into_inner);
        let previous = slot.replace(value);
        if previous != Some(value) {
            self.stamp.touch();
        }
        previous
    }

    /// Remove the value.
    pub fn reset(&self) {
        let mut slot = self.value.write().unwrap_or_else(PoisonError::into_inner);
        if slot.take().is_some() {
            self.stamp.touch();
        }
    }
}

impl Versioned for SimpleQuote {
    fn version(&self) -> Version {
        self.stamp.get()
    }
}

impl Quote for SimpleQuote {
    fn value(&self) -> Result<Real> {
        self.value
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ok_or_else(|| Error::StaleMarketData("quote has no value".into()))
    }
}

/// A quote computed from another quote by a unary function.
pub struct DerivedQuote<F> {
    element: Handle<dyn Quote>,
    f: F,
}

impl<F: Fn(Real) -> Real + Send + Sync> DerivedQuote<F> {
    /// `f` applied to the value of `element`.
    pub fn new(element: Handle<dyn Quote>, f: F) -> Self {
        Self { element, f }
    }
}

impl<F> fmt::Debug for DerivedQuote<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedQuote")
            .field("element", &self.element)
            .finish_non_exhaustive()
    }
}

impl<F> Versioned for DerivedQuote<F> {
    fn version(&self) -> Version {
        self.element.version()
    }
}

impl<F: Fn(Real) -> Real + Send + Sync> Quote for DerivedQuote<F> {
    fn value(&self) -> Result<Real> {
        Ok((self.f)(self.element.current()?.value()?))
    }
}

/// A quote computed from two quotes by a binary function.
pub struct CompositeQuote<F> {
    first: Handle<dyn Quote>,
    second: Handle<dyn Quote>,
    f: F,
}

impl<F: Fn(Real, Real) -> Real + Send + Sync> CompositeQuote<F> {
    /// `f` applied to the values of `first` and `second`.
    pub fn new(first: Handle<dyn Quote>, second: Handle<dyn Quote>, f: F) -> Self {
        Self { first, second, f }
    }
}

impl<F> fmt::Debug for CompositeQuote<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeQuote")
            .field("first", &self.first)
            .field("second", &self.second)
            .finish_non_exhaustive()
    }
}

impl<F> Versioned for CompositeQuote<F> {
    fn version(&self) -> Version {
        latest_version([self.first.version(), self.second.version()])
    }
}

impl<F: Fn(Real, Real) -> Real + Send + Sync> Quote for CompositeQuote<F> {
    fn value(&self) -> Result<Real> {
        let a = self.first.current()?.value()?;
        let b = self.second.current()?.value()?;
        Ok((self.f)(a, b))
    }
}
