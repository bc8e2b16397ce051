//! Cancellation-signal objects and their token wiring.
//!
//! An [`AbortSignal`] is the caller-supplied side of cancellation: a boolean
//! aborted state plus an abort event. Operations bind the event to their own
//! [`CancellationToken`] via [`AbortSignal::bind`]; firing the signal cancels
//! the token, which the in-flight send or the next blocking read observes.
//!
//! Handler registrations are persistent-weak (see [`crate::bridge`]): the
//! signal holds only [`Observer`]s of the hooks, the strong hook lives inside
//! the operation, and a hook whose operation has already been destroyed is
//! skipped. A registration is released either explicitly by the host through
//! [`AbortRegistration::release`] (when it reclaims the wrapping function
//! value) or lazily when the signal fires and prunes dead entries.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tokio_util::sync::CancellationToken;

use crate::bridge::Observer;

type AbortHook = dyn Fn() + Send + Sync;

struct SignalInner {
    aborted: AtomicBool,
    handlers: Mutex<Vec<(u64, Observer<AbortHook>)>>,
    next_id: Mutex<u64>,
}

/// Caller-owned cancellation-signal object.
#[derive(Clone)]
pub struct AbortSignal {
    inner: Arc<SignalInner>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(SignalInner {
                aborted: AtomicBool::new(false),
                handlers: Mutex::new(Vec::new()),
                next_id: Mutex::new(0),
            }),
        }
    }

    /// The boolean aborted state. Irreversible once set.
    pub fn aborted(&self) -> bool {
        self.inner.aborted.load(Ordering::SeqCst)
    }

    /// Fires the abort event. Idempotent: handlers run on the first call
    /// only. Dead registrations are pruned here.
    pub fn abort(&self) {
        if self.inner.aborted.swap(true, Ordering::SeqCst) {
            return;
        }

        let live: Vec<Observer<AbortHook>> = {
            let mut handlers = self.inner.handlers.lock().unwrap();
            handlers.retain(|(_, observer)| !observer.is_dead());
            handlers.iter().map(|(_, observer)| observer.clone()).collect()
        };

        // Hooks run outside the lock; a hook may re-enter the signal.
        for observer in live {
            observer.observe(|hook| hook());
        }
    }

    /// Registers `hook` to run when the signal aborts. Only a weak reference
    /// is kept; the caller owns the strong `Arc`. If the signal has already
    /// aborted, the hook runs immediately.
    pub fn on_abort(&self, hook: &Arc<AbortHook>) -> AbortRegistration {
        let id = {
            let mut next_id = self.inner.next_id.lock().unwrap();
            let id = *next_id;
            *next_id += 1;
            id
        };

        self.inner.handlers.lock().unwrap().push((id, Observer::new(hook)));

        if self.aborted() {
            (hook.as_ref())();
        }

        AbortRegistration { signal: Arc::downgrade(&self.inner), id }
    }

    /// Binds this signal to `token`: aborting the signal cancels the token.
    /// The returned [`TokenBinding`] is the strong owner of the hook and must
    /// live as long as the operation wants the binding active.
    pub fn bind(&self, token: &CancellationToken) -> TokenBinding {
        let token = token.clone();
        let hook: Arc<AbortHook> = Arc::new(move || token.cancel());
        let registration = self.on_abort(&hook);
        TokenBinding { _hook: hook, _registration: registration }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to one abort-handler registration. Dropping it does nothing (the
/// weak entry just goes dead); [`release`](Self::release) is the explicit
/// host teardown.
pub struct AbortRegistration {
    signal: Weak<SignalInner>,
    id: u64,
}

impl AbortRegistration {
    /// Removes the registration from the signal's handler list.
    pub fn release(self) {
        if let Some(inner) = self.signal.upgrade() {
            inner.handlers.lock().unwrap().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Strong end of a signal→token binding, owned by an operation for the
/// duration of its run.
pub struct TokenBinding {
    _hook: Arc<AbortHook>,
    _registration: AbortRegistration,
}
