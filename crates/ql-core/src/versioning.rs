//! Version stamps for cache invalidation.
//!
//! Every mutable market object owns a [`VersionStamp`].  Stamps are drawn
//! from one process-wide logical clock, so a mutation anywhere produces a
//! value strictly larger than every stamp issued before it.  The version of a
//! derived object (curve, process, engine, instrument) is the maximum of its
//! own stamp and the versions of its inputs: it grows whenever any input is
//! mutated, relinked or replaced by a freshly built object.
//!
//! Caches remember the version they were computed at and recompute when the
//! current version differs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A logical timestamp.
pub type Version = u64;

static CLOCK: AtomicU64 = AtomicU64::new(0);

fn tick() -> Version {
    CLOCK.fetch_add(1, Ordering::AcqRel) + 1
}

/// The version of an object's last mutation.
///
/// A new stamp already carries a fresh version, so objects built after a
/// cached computation always invalidate it.
#[derive(Debug)]
pub struct VersionStamp(AtomicU64);

impl VersionStamp {
    /// Create a stamp at a fresh version.
    pub fn new() -> Self {
        Self(AtomicU64::new(tick()))
    }

    /// Current version.
    pub fn get(&self) -> Version {
        self.0.load(Ordering::Acquire)
    }

    /// Record a mutation and return the new version.
    pub fn touch(&self) -> Version {
        let v = tick();
        self.0.store(v, Ordering::Release);
        v
    }
}

impl Default for VersionStamp {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VersionStamp {
    /// A clone is a distinct object and gets its own fresh version.
    fn clone(&self) -> Self {
        Self::new()
    }
}

/// Objects whose state can be summarised by a [`Version`].
pub trait Versioned {
    /// Version of the object including all of its inputs.
    fn version(&self) -> Version;
}

impl<T: Versioned + ?Sized> Versioned for Arc<T> {
    fn version(&self) -> Version {
        (**self).version()
    }
}

impl<T: Versioned + ?Sized> Versioned for Box<T> {
    fn version(&self) -> Version {
        (**self).version()
    }
}

impl<T: Versioned + ?Sized> Versioned for &T {
    fn version(&self) -> Version {
        (**self).version()
    }
}

impl<T: Versioned> Versioned for Option<T> {
    fn version(&self) -> Version {
        self.as_ref().map_or(0, Versioned::version)
    }
}

impl Versioned for VersionStamp {
    fn version(&self) -> Version {
        self.get()
    }
}

/// Combine input versions into the version of a derived object.
pub fn latest_version(versions: impl IntoIterator<Item = Version>) -> Version {
    versions.into_iter().max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamps_are_strictly_increasing() {
        let a = VersionStamp::new();
        let b = VersionStamp::new();
        assert!(b.get() > a.get());
        let before = b.get();
        let after = a.touch();
        assert!(after > before);
        assert_eq!(a.get(), after);
    }

    #[test]
    fn derived_version_tracks_every_input() {
        let x = VersionStamp::new();
        let y = VersionStamp::new();
        let derived = || latest_version([x.get(), y.get()]);
        let v0 = derived();
        x.touch();
        let v1 = derived();
        assert!(v1 > v0);
        y.touch();
        assert!(derived() > v1);
    }

    #[test]
    fn replacing_an_input_with_a_new_object_changes_version() {
        let old = Arc::new(VersionStamp::new());
        for _ in 0..5 {
            old.touch();
        }
        let cached = latest_version([old.version()]);
        let fresh = Arc::new(VersionStamp::new());
        assert_ne!(latest_version([fresh.version()]), cached);
    }

    #[test]
    fn empty_option_has_version_zero() {
        let none: Option<VersionStamp> = None;
        assert_eq!(none.version(), 0);
    }
}
