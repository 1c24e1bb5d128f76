//! Shared, relinkable references to market objects.
//!
//! A [`Handle<T>`] lets several consumers (curves, processes, engines) share
//! one link to an object.  Relinking through a [`RelinkableHandle`] is seen
//! by every clone, and bumps the handle's version so that caches downstream
//! of it recompute.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::errors::{Error, Result};
use crate::versioning::{latest_version, Version, VersionStamp, Versioned};

struct Link<T: ?Sized> {
    target: RwLock<Option<Arc<T>>>,
    stamp: VersionStamp,
}

/// A shared, possibly empty, reference to a `T`.
///
/// Read-only: the link can only be changed through a [`RelinkableHandle`]
/// sharing the same link.
pub struct Handle<T: ?Sized> {
    link: Arc<Link<T>>,
}

impl<T: ?Sized> Handle<T> {
    /// Create a handle linked to `target`.
    pub fn new(target: Arc<T>) -> Self {
        Self {
            link: Arc::new(Link {
                target: RwLock::new(Some(target)),
                stamp: VersionStamp::new(),
            }),
        }
    }

    /// Create an empty handle.
    pub fn empty() -> Self {
        Self {
            link: Arc::new(Link {
                target: RwLock::new(None),
                stamp: VersionStamp::new(),
            }),
        }
    }

    /// Return `true` if the handle is not linked to anything.
    pub fn is_empty(&self) -> bool {
        self.link
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// The object currently linked.
    pub fn current(&self) -> Result<Arc<T>> {
        self.link
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| Error::StaleMarketData("empty handle cannot be dereferenced".into()))
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            link: Arc::clone(&self.link),
        }
    }
}

impl<T: ?Sized + Versioned> Versioned for Handle<T> {
    fn version(&self) -> Version {
        let target = self
            .link
            .target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, |t| t.version());
        latest_version([self.link.stamp.get(), target])
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.current() {
            Ok(t) => write!(f, "Handle({t:?})"),
            Err(_) => write!(f, "Handle(empty)"),
        }
    }
}

/// A [`Handle`] whose target can be replaced at runtime.
pub struct RelinkableHandle<T: ?Sized> {
    handle: Handle<T>,
}

impl<T: ?Sized> RelinkableHandle<T> {
    /// Create a relinkable handle linked to `target`.
    pub fn new(target: Arc<T>) -> Self {
        Self {
            handle: Handle::new(target),
        }
    }

    /// Create an unlinked relinkable handle.
    pub fn empty() -> Self {
        Self {
            handle: Handle::empty(),
        }
    }

    /// Point every handle sharing this link at `target`.
    pub fn link_to(&self, target: Arc<T>) {
        *self
            .handle
            .link
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(target);
        self.handle.link.stamp.touch();
    }

    /// Detach the link.
    pub fn unlink(&self) {
        *self
            .handle
            .link
            .target
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.handle.link.stamp.touch();
    }

    /// A read-only handle sharing this link.
    pub fn handle(&self) -> Handle<T> {
        self.handle.clone()
    }
}

impl<T: ?Sized> Clone for RelinkableHandle<T> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
        }
    }
}

impl<T: ?Sized + Versioned> Versioned for RelinkableHandle<T> {
    fn version(&self) -> Version {
        self.handle.version()
    }
}

impl<T: ?Sized + fmt::Debug> fmt::Debug for RelinkableHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.handle.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Level(f64, VersionStamp);

    impl Versioned for Level {
        fn version(&self) -> Version {
            self.1.get()
        }
    }

    #[test]
    fn relinking_is_visible_through_clones() {
        let rh = RelinkableHandle::new(Arc::new(Level(1.0, VersionStamp::new())));
        let h = rh.handle();
        assert_eq!(h.current().unwrap().0, 1.0);
        rh.link_to(Arc::new(Level(2.0, VersionStamp::new())));
        assert_eq!(h.current().unwrap().0, 2.0);
    }

    #[test]
    fn relinking_to_an_older_object_still_bumps_version() {
        let older = Arc::new(Level(1.0, VersionStamp::new()));
        let newer = Arc::new(Level(2.0, VersionStamp::new()));
        let rh = RelinkableHandle::new(newer);
        let v0 = rh.version();
        rh.link_to(older);
        assert!(rh.version() > v0);
    }

    #[test]
    fn empty_handle_is_stale() {
        let h: Handle<Level> = Handle::empty();
        assert!(h.is_empty());
        assert!(matches!(h.current(), Err(Error::StaleMarketData(_))));
    }
}
