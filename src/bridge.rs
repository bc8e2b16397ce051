//! The persistent-weak half of the callback bridge.
//!
//! Native callback registrations come in two ownership flavors. The
//! fire-once flavor needs no machinery in Rust: a strong value is moved into
//! a `FnOnce` (a spawned send task, a transfer thread) and its storage dies
//! with the closure. The persistent flavor is this module: a registration
//! that may be invoked, or reclaimed by the host, at times the operation does
//! not control — an abort handler on a caller-owned signal, the `progress()`
//! accessor on a download result. Such a registration must not keep the
//! operation alive, so it holds only a [`Weak`] target and upgrades at
//! invocation time, degrading to a no-op once the owner is gone.

use std::sync::{Arc, Weak};

/// A non-owning reference to callback target `T`.
///
/// Exactly one strong owner exists (the operation or its transfer state);
/// any number of observers may be created per registration and outlive it.
pub struct Observer<T: ?Sized> {
    target: Weak<T>,
}

impl<T: ?Sized> Observer<T> {
    pub fn new(target: &Arc<T>) -> Self {
        Self { target: Arc::downgrade(target) }
    }

    /// Upgrade-or-no-op: runs `f` against the target if it is still alive,
    /// returning `None` once the owner has dropped it.
    pub fn observe<R>(&self, f: impl FnOnce(&T) -> R) -> Option<R> {
        self.target.upgrade().map(|target| f(&target))
    }

    /// True when the strong owner is gone and `observe` would no-op.
    pub fn is_dead(&self) -> bool {
        self.target.strong_count() == 0
    }
}

impl<T: ?Sized> Clone for Observer<T> {
    fn clone(&self) -> Self {
        Self { target: self.target.clone() }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    #[test]
    fn observes_while_owner_lives() {
        let counter = Arc::new(AtomicU64::new(41));
        let observer = Observer::new(&counter);

        assert_eq!(observer.observe(|c| c.fetch_add(1, Ordering::Relaxed)), Some(41));
        assert_eq!(counter.load(Ordering::Relaxed), 42);
    }

    #[test]
    fn no_ops_after_owner_drops() {
        let counter = Arc::new(AtomicU64::new(0));
        let observer = Observer::new(&counter);
        drop(counter);

        assert!(observer.is_dead());
        assert_eq!(observer.observe(|c| c.load(Ordering::Relaxed)), None);
    }

    #[test]
    fn observers_are_independent_of_each_other() {
        let value = Arc::new(5u32);
        let a = Observer::new(&value);
        let b = a.clone();
        drop(a);

        // Dropping one observer must not affect another.
        assert_eq!(b.observe(|v| *v), Some(5));
    }
}
