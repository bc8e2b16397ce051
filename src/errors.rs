//! Error taxonomy for the bridge.
//!
//! Two families exist. [`ParamError`] is synchronous: it is raised while a
//! call is still being validated, before any promise exists, and is thrown
//! straight back at the caller. [`Rejection`] is asynchronous: once a promise
//! exists, every failure is terminal and surfaces as a rejection carrying the
//! human-readable message the scripted side sees, plus an [`ErrorKind`] tag so
//! that cancellation, I/O and protocol failures stay distinguishable even when
//! their messages collide (a download read error and a cancelled download both
//! reject with `"Fail"`).

/// Synchronous parameter-validation failure.
///
/// The display strings are part of the scripted surface and must not change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    #[error("Missing URL")]
    MissingUrl,

    #[error("Missing Destination")]
    MissingDestination,

    #[error("Malformed URL")]
    MalformedUrl,

    /// The options argument was present but not an object. Raised by the
    /// marshaling adapter, never by the typed core.
    #[error("Not an Object")]
    NotAnObject,

    #[error("Invalid offset")]
    InvalidOffset,

    /// A `signal` option that is not a cancellation-signal object. Raised by
    /// the marshaling adapter.
    #[error("Not an AbortSignal")]
    NotAnAbortSignal,

    /// An `onConnect` option that is not callable. Raised by the marshaling
    /// adapter.
    #[error("Not a Function")]
    NotAFunction,

    /// A header name or value the HTTP layer cannot represent.
    #[error("Invalid header")]
    InvalidHeader,

    /// A method string the HTTP layer cannot represent.
    #[error("Invalid method")]
    InvalidMethod,
}

/// Classifies a [`Rejection`] beyond its message string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Transport-level send failure.
    Network,
    /// The response violated what the operation requires of it
    /// (e.g. a download response without a content length).
    Protocol,
    /// Destination open/read/write failure.
    Io,
    /// The cancellation token was observed set.
    Cancelled,
    /// A promise was abandoned without ever settling. Not produced by the
    /// operations themselves.
    Internal,
}

/// Terminal failure of an operation, delivered through a promise.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct Rejection {
    pub kind: ErrorKind,
    pub message: String,
}

impl Rejection {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }
}
