//! In-process bridge giving scripted content two network operations —
//! in-memory fetch and HTTP-to-file download — over a shared client context,
//! with cooperative cancellation, streaming progress, and promise-style
//! completion.

pub mod abort;
pub mod bridge;
pub mod errors;
pub mod net;
pub mod promise;
pub mod request;
pub mod session;

pub use abort::{AbortRegistration, AbortSignal, TokenBinding};
pub use errors::{ErrorKind, ParamError, Rejection};
pub use net::{DownloadStarted, FetchOutput, ProgressHandle};
pub use promise::{Outcome, Promise, Settler};
pub use request::Request;
pub use session::{DownloadParams, FetchParams, Session};
