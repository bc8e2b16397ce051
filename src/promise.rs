//! Completion handles: the environment-agnostic promise surface.
//!
//! A [`Promise`] pairs a pending operation with exactly one eventual
//! resolve-or-reject outcome. Construction does **not** start the operation;
//! the stored executor only runs when the host hands it a [`Settler`], i.e.
//! once a resolve/reject pair exists. A scripting adapter runs the executor
//! from a real JS `Promise` executor; tests and native callers use
//! [`Promise::settle`], which wires up a oneshot channel and awaits it.
//!
//! Exactly-once settlement is enforced by the type system: a [`Settler`] is
//! consumed by `resolve` or `reject`, so no code path can fire twice. The
//! settle message travels over a `tokio::sync::oneshot`, which is also the
//! cross-thread hand-off: a download worker thread settles by sending that
//! one message, and the outcome becomes observable on the event loop that
//! awaits the receiver.

use tokio::sync::oneshot;

use crate::errors::{ErrorKind, Rejection};

/// The single terminal outcome of a promise.
#[derive(Debug)]
pub enum Outcome<T> {
    Resolved(T),
    Rejected(Rejection),
}

impl<T> Outcome<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Outcome::Resolved(_))
    }

    /// Unwraps the resolved value, panicking on a rejection. Test helper.
    pub fn unwrap(self) -> T {
        match self {
            Outcome::Resolved(value) => value,
            Outcome::Rejected(e) => panic!("promise rejected: {e} ({:?})", e.kind),
        }
    }

    /// Unwraps the rejection, panicking on a resolved value. Test helper.
    pub fn unwrap_err(self) -> Rejection {
        match self {
            Outcome::Resolved(_) => panic!("promise resolved, expected rejection"),
            Outcome::Rejected(e) => e,
        }
    }
}

/// One resolve/reject pair. Consumed on use, so each promise settles at most
/// once; the operations guarantee it settles at least once.
pub struct Settler<T> {
    tx: oneshot::Sender<Outcome<T>>,
}

impl<T> Settler<T> {
    /// Creates a settler and the receiver its outcome will arrive on.
    pub fn channel() -> (Self, oneshot::Receiver<Outcome<T>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    pub fn resolve(self, value: T) {
        // The receiver side may already be gone; nothing left to notify then.
        let _ = self.tx.send(Outcome::Resolved(value));
    }

    pub fn reject(self, error: Rejection) {
        let _ = self.tx.send(Outcome::Rejected(error));
    }
}

type Executor<T> = Box<dyn FnOnce(Settler<T>) + Send>;

/// A not-yet-launched operation plus its eventual outcome.
pub struct Promise<T> {
    executor: Executor<T>,
}

impl<T: Send + 'static> Promise<T> {
    /// Wraps an executor. `f` runs when [`launch`](Self::launch) (or
    /// [`settle`](Self::settle)) is called, never earlier.
    pub fn new(f: impl FnOnce(Settler<T>) + Send + 'static) -> Self {
        Self { executor: Box::new(f) }
    }

    /// Runs the executor with the given settler. Must be called on the
    /// session's event loop, inside a Tokio runtime context.
    pub fn launch(self, settler: Settler<T>) {
        (self.executor)(settler);
    }

    /// Launches the promise and awaits its outcome.
    pub async fn settle(self) -> Outcome<T> {
        let (settler, rx) = Settler::channel();
        self.launch(settler);
        rx.await.unwrap_or_else(|_| {
            Outcome::Rejected(Rejection::new(ErrorKind::Internal, "abandoned"))
        })
    }
}
