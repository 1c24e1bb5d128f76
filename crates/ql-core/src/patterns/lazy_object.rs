//! Lazily computed values that are recomputed only when their inputs change.
//!
//! A [`LazyCache`] stores the last computed value together with the input
//! [`Version`] it was computed at.  Asking for the value at a different
//! version triggers a recalculation; asking again at the same version returns
//! the cached copy.  Calculations that fail leave the cache empty, so a
//! failing computation is retried (and fails again) on every request.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::errors::Result;
use crate::versioning::Version;

/// A cache slot keyed on an input version.
///
/// # Example
/// ```
/// use ql_core::LazyCache;
///
/// let cache = LazyCache::new();
/// let mut calls = 0;
/// let v = cache.get_or_try_compute(7, || { calls += 1; Ok(42.0) }).unwrap();
/// assert_eq!(v, 42.0);
/// let v = cache.get_or_try_compute(7, || { calls += 1; Ok(0.0) }).unwrap();
/// assert_eq!(v, 42.0);
/// assert_eq!(calls, 1);
/// ```
#[derive(Debug)]
pub struct LazyCache<T> {
    slot: Mutex<Option<(Version, T)>>,
    freeze_count: AtomicU32,
}

impl<T: Clone> LazyCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            freeze_count: AtomicU32::new(0),
        }
    }

    /// Return the cached value if it was computed at `version`, otherwise run
    /// `compute` and cache its result.
    ///
    /// While the cache is frozen a previously computed value is returned
    /// regardless of `version`.
    pub fn get_or_try_compute<F>(&self, version: Version, compute: F) -> Result<T>
    where
        F: FnOnce() -> Result<T>,
    {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some((cached_at, value)) = slot.as_ref() {
            if *cached_at == version || self.is_frozen() {
                return Ok(value.clone());
            }
        }
        *slot = None;
        let value = compute()?;
        *slot = Some((version, value.clone()));
        Ok(value)
    }

    /// `true` if a value computed at `version` is available.
    pub fn is_calculated(&self, version: Version) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|(v, _)| *v == version)
    }

    /// Drop the cached value.
    pub fn invalidate(&self) {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Keep serving the cached value until [`unfreeze`][Self::unfreeze].
    pub fn freeze(&self) {
        self.freeze_count.fetch_add(1, Ordering::AcqRel);
    }

    /// Undo one call to [`freeze`][Self::freeze].
    pub fn unfreeze(&self) {
        let _ = self
            .freeze_count
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1));
    }

    /// Return `true` if recalculation is currently deferred.
    pub fn is_frozen(&self) -> bool {
        self.freeze_count.load(Ordering::Acquire) > 0
    }
}

impl<T: Clone> Default for LazyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Clone for LazyCache<T> {
    /// Clones start empty.
    fn clone(&self) -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use std::cell::Cell;

    #[test]
    fn recomputes_on_version_change() {
        let cache = LazyCache::new();
        let calls = Cell::new(0);
        let compute = |x: f64| {
            calls.set(calls.get() + 1);
            Ok(x)
        };
        assert_eq!(cache.get_or_try_compute(1, || compute(1.0)), Ok(1.0));
        assert_eq!(cache.get_or_try_compute(1, || compute(9.0)), Ok(1.0));
        assert_eq!(cache.get_or_try_compute(2, || compute(2.0)), Ok(2.0));
        assert_eq!(calls.get(), 2);
        assert!(cache.is_calculated(2));
        assert!(!cache.is_calculated(1));
    }

    #[test]
    fn failure_leaves_cache_empty() {
        let cache: LazyCache<f64> = LazyCache::new();
        cache.get_or_try_compute(1, || Ok(1.0)).unwrap();
        let err = cache.get_or_try_compute(2, || Err(Error::Runtime("boom".into())));
        assert!(err.is_err());
        assert!(!cache.is_calculated(1));
        assert!(!cache.is_calculated(2));
    }

    #[test]
    fn frozen_cache_serves_stale_value() {
        let cache = LazyCache::new();
        cache.get_or_try_compute(1, || Ok(10.0)).unwrap();
        cache.freeze();
        assert_eq!(cache.get_or_try_compute(5, || Ok(50.0)), Ok(10.0));
        cache.unfreeze();
        cache.unfreeze();
        assert!(!cache.is_frozen());
        assert_eq!(cache.get_or_try_compute(5, || Ok(50.0)), Ok(50.0));
    }

    #[test]
    fn invalidate_forces_recalculation() {
        let cache = LazyCache::new();
        cache.get_or_try_compute(3, || Ok(1)).unwrap();
        cache.invalidate();
        assert_eq!(cache.get_or_try_compute(3, || Ok(2)), Ok(2));
    }
}
