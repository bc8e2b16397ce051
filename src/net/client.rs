//! The async HTTP client capability and its production adapter.
//!
//! Operations never talk to `reqwest` directly; they depend on
//! [`AsyncHttpClient`], which models the native "start async send, finish
//! with result-or-error" convention as one awaitable call. That keeps the
//! fetch/download state machines testable against a fake client, and keeps
//! [`ReqwestClient`] — the fire-once bridge translating transport results
//! into the operation's resolve/reject — as the only reqwest-aware code.

use std::io;
use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use http::header::CONTENT_LENGTH;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::errors::Rejection;
use crate::request::Request;

/// Response body as an async stream of chunks, sized however the transport
/// delivers them.
pub type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Vec<u8>>> + Send>>;

/// A response as handed to an operation: status line data, headers, the
/// advertised content length (when any) and the readable body.
pub struct HttpResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub content_length: Option<u64>,
    pub body: ByteStream,
}

/// Shared client context capable of one asynchronous send with cooperative
/// cancellation. Each operation has at most one send in flight.
#[async_trait]
pub trait AsyncHttpClient: Send + Sync {
    async fn send(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, Rejection>;
}

/// Production adapter over a shared [`reqwest::Client`].
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Self {
        Self { client: reqwest::Client::new() }
    }
}

impl Default for ReqwestClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncHttpClient for ReqwestClient {
    async fn send(
        &self,
        request: Request,
        cancel: CancellationToken,
    ) -> Result<HttpResponse, Rejection> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(Rejection::cancelled("Cancelled")),
            res = builder.send() => res.map_err(|e| Rejection::network(e.to_string()))?,
        };

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let content_length = response.content_length().or_else(|| {
            headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        });

        log::debug!("send completed: status {status}, length {content_length:?}");

        let body = response
            .bytes_stream()
            .map(|chunk| match chunk {
                Ok(bytes) => Ok(bytes.to_vec()),
                Err(e) => Err(io::Error::other(e)),
            })
            .boxed();

        Ok(HttpResponse { status, headers, content_length, body })
    }
}

/// Adapts a [`ByteStream`] to the blocking reads a transfer thread performs.
///
/// The wrapped stream is driven through `handle.block_on`, so the owning
/// runtime must keep running while the worker reads. Chunks larger than the
/// caller's buffer are carried over between reads.
pub struct BlockingBody {
    handle: tokio::runtime::Handle,
    body: ByteStream,
    pending: Vec<u8>,
    pos: usize,
}

impl BlockingBody {
    pub fn new(handle: tokio::runtime::Handle, body: ByteStream) -> Self {
        Self { handle, body, pending: Vec::new(), pos: 0 }
    }

    /// Blocking read of up to `buf.len()` bytes. `Ok(0)` means end of
    /// stream. The token is checked before the read and observed during it;
    /// cancellation surfaces as [`io::ErrorKind::Interrupted`].
    pub fn read(&mut self, buf: &mut [u8], cancel: &CancellationToken) -> io::Result<usize> {
        if cancel.is_cancelled() {
            return Err(io::Error::new(io::ErrorKind::Interrupted, "Cancelled"));
        }

        while self.pos >= self.pending.len() {
            let body = &mut self.body;
            let next = self.handle.block_on(async {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        Some(Err(io::Error::new(io::ErrorKind::Interrupted, "Cancelled")))
                    }
                    chunk = body.next() => chunk,
                }
            });

            match next {
                None => return Ok(0),
                Some(Err(e)) => return Err(e),
                Some(Ok(chunk)) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
            }
        }

        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A scriptable fake client for the operation state-machine tests.

    use std::sync::Mutex;

    use futures::stream;

    use super::*;

    /// What the fake should do when `send` is called.
    pub enum FakeBehavior {
        /// Respond with the given status/headers/content length and body
        /// chunks.
        Respond {
            status: u16,
            headers: HeaderMap,
            content_length: Option<u64>,
            chunks: Vec<io::Result<Vec<u8>>>,
            /// When set, the body never ends after the listed chunks; reads
            /// park until cancellation.
            stall: bool,
        },
        /// Fail the send with a transport error.
        Fail(String),
        /// Never complete the send; only cancellation resolves it.
        Hang,
    }

    pub struct FakeClient {
        behavior: Mutex<Option<FakeBehavior>>,
        pub seen: Mutex<Vec<Request>>,
    }

    impl FakeClient {
        pub fn new(behavior: FakeBehavior) -> Self {
            Self { behavior: Mutex::new(Some(behavior)), seen: Mutex::new(Vec::new()) }
        }

        pub fn respond_with(status: u16, body: &[u8]) -> Self {
            Self::new(FakeBehavior::Respond {
                status,
                headers: HeaderMap::new(),
                content_length: Some(body.len() as u64),
                chunks: vec![Ok(body.to_vec())],
                stall: false,
            })
        }
    }

    #[async_trait]
    impl AsyncHttpClient for FakeClient {
        async fn send(
            &self,
            request: Request,
            cancel: CancellationToken,
        ) -> Result<HttpResponse, Rejection> {
            self.seen.lock().unwrap().push(request);

            let behavior = self
                .behavior
                .lock()
                .unwrap()
                .take()
                .expect("fake client sent twice");

            match behavior {
                FakeBehavior::Fail(message) => Err(Rejection::network(message)),
                FakeBehavior::Hang => {
                    cancel.cancelled().await;
                    Err(Rejection::cancelled("Cancelled"))
                }
                FakeBehavior::Respond { status, headers, content_length, chunks, stall } => {
                    let body: ByteStream = if stall {
                        stream::iter(chunks).chain(stream::pending()).boxed()
                    } else {
                        stream::iter(chunks).boxed()
                    };
                    Ok(HttpResponse { status, headers, content_length, body })
                }
            }
        }
    }
}
