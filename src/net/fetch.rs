//! One request/response exchange resolved in memory.

use std::sync::Arc;

use futures::StreamExt;
use http::HeaderMap;
use tokio_util::sync::CancellationToken;

use crate::abort::AbortSignal;
use crate::errors::Rejection;
use crate::net::client::{AsyncHttpClient, ByteStream};
use crate::promise::{Promise, Settler};
use crate::request::Request;

/// Caller hook invoked once with `(status, headers snapshot)` as soon as the
/// response arrives, before the body is drained.
pub type ConnectHook = Box<dyn FnOnce(u16, HeaderMap) + Send>;

/// What a fetch resolves with.
#[derive(Debug, PartialEq, Eq)]
pub enum FetchOutput {
    /// Body text only; produced when a connect hook already consumed the
    /// status and headers.
    Body(String),
    Response {
        body: String,
        status: u16,
        headers: HeaderMap,
    },
}

/// A single fetch attempt: `Init → Sent → (Connected?) → Resolved | Rejected`.
pub struct FetchOperation {
    client: Arc<dyn AsyncHttpClient>,
    request: Request,
    cancel: CancellationToken,
    signal: Option<AbortSignal>,
    on_connect: Option<ConnectHook>,
}

impl FetchOperation {
    pub(crate) fn new(
        client: Arc<dyn AsyncHttpClient>,
        request: Request,
        signal: Option<AbortSignal>,
        on_connect: Option<ConnectHook>,
    ) -> Self {
        Self {
            client,
            request,
            cancel: CancellationToken::new(),
            signal,
            on_connect,
        }
    }

    /// Wraps the operation in its completion handle. Nothing is sent until
    /// the promise is launched.
    pub fn into_promise(self) -> Promise<FetchOutput> {
        Promise::new(move |settler| self.launch(settler))
    }

    fn launch(mut self, settler: Settler<FetchOutput>) {
        // The binding's strong hook lives inside the task; after the task
        // ends, an abort on the caller's signal degrades to a no-op.
        let binding = self.signal.take().map(|signal| signal.bind(&self.cancel));

        tokio::spawn(async move {
            let _binding = binding;
            self.run(settler).await;
        });
    }

    async fn run(mut self, settler: Settler<FetchOutput>) {
        let url = self.request.url.clone();

        let response = match self.client.send(self.request, self.cancel.clone()).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("fetch {url}: send failed: {e}");
                settler.reject(e);
                return;
            }
        };

        let status = response.status;
        let headers = response.headers;

        let connected = match self.on_connect.take() {
            Some(hook) => {
                hook(status, headers.clone());
                true
            }
            None => false,
        };

        let body = match drain(response.body, &self.cancel).await {
            Ok(body) => body,
            Err(e) => {
                log::debug!("fetch {url}: body read failed: {e}");
                settler.reject(e);
                return;
            }
        };

        let text = String::from_utf8_lossy(&body).into_owned();
        if connected {
            settler.resolve(FetchOutput::Body(text));
        } else {
            settler.resolve(FetchOutput::Response { body: text, status, headers });
        }
    }
}

/// Drains the whole body into memory. The sink is unbounded on purpose: no
/// streaming ceiling is enforced, the caller gets the body as one string.
async fn drain(mut body: ByteStream, cancel: &CancellationToken) -> Result<Vec<u8>, Rejection> {
    let mut out = Vec::new();
    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(Rejection::cancelled("Cancelled")),
            chunk = body.next() => chunk,
        };
        match chunk {
            None => return Ok(out),
            Some(Ok(bytes)) => out.extend_from_slice(&bytes),
            Some(Err(e)) => return Err(Rejection::network(e.to_string())),
        }
    }
}
