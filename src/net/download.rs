//! Long-running HTTP-to-file transfer.
//!
//! A download settles twice: the outer promise resolves as soon as the
//! response metadata is known, handing the caller a [`DownloadStarted`] with
//! the advertised length, a weak [`ProgressHandle`] and the nested completion
//! promise. Launching the nested promise spawns the one dedicated worker
//! thread that moves the bytes; the thread never touches host state — it
//! bumps the relaxed atomic counter and delivers its terminal outcome through
//! the settle message.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::abort::{AbortSignal, TokenBinding};
use crate::bridge::Observer;
use crate::errors::{ErrorKind, Rejection};
use crate::net::client::{AsyncHttpClient, BlockingBody, ByteStream};
use crate::promise::{Promise, Settler};
use crate::request::Request;

/// Fixed read size of the transfer loop.
const TRANSFER_CHUNK_SIZE: usize = 8192;

/// What the outer promise resolves with once response metadata is known.
pub struct DownloadStarted {
    /// Advertised content length in bytes.
    pub length: u64,
    /// Advisory transferred-byte counter accessor.
    pub progress: ProgressHandle,
    /// Nested completion handle; resolves `"Success"` after the last byte is
    /// flushed, strictly after the outer promise.
    pub promise: Promise<String>,
}

/// Weak accessor for the transferred-byte counter.
///
/// The count is returned as a decimal string so totals beyond the caller
/// number type's safe-integer range are not silently truncated. The handle
/// may outlive the transfer (the host reclaims it at its own pace); once the
/// transfer state is gone it reads as `None`.
pub struct ProgressHandle {
    counter: Observer<AtomicU64>,
}

impl ProgressHandle {
    /// Current transferred-byte count, relaxed load. Advisory only: there is
    /// no ordering relationship with the completion message.
    pub fn get(&self) -> Option<String> {
        self.counter.observe(|c| c.load(Ordering::Relaxed).to_string())
    }
}

/// One download attempt:
/// `Init → Sent → MetadataResolved → Transferring → Completed | Failed`,
/// with `Cancelled` reachable from `Sent` or `Transferring`.
pub struct DownloadOperation {
    client: Arc<dyn AsyncHttpClient>,
    request: Request,
    destination: PathBuf,
    /// Parsed from the caller's `offset` option and recorded, but not applied:
    /// the destination is opened in append mode regardless. Resume semantics
    /// are an open product decision; see DESIGN.md.
    #[allow(unused)]
    offset: u64,
    transferred: Arc<AtomicU64>,
    cancel: CancellationToken,
    signal: Option<AbortSignal>,
}

impl DownloadOperation {
    pub(crate) fn new(
        client: Arc<dyn AsyncHttpClient>,
        request: Request,
        destination: PathBuf,
        offset: u64,
        signal: Option<AbortSignal>,
    ) -> Self {
        Self {
            client,
            request,
            destination,
            offset,
            transferred: Arc::new(AtomicU64::new(0)),
            cancel: CancellationToken::new(),
            signal,
        }
    }

    /// Wraps the operation in its outer completion handle. Nothing is sent
    /// until the promise is launched.
    pub fn into_promise(self) -> Promise<DownloadStarted> {
        Promise::new(move |settler| self.launch(settler))
    }

    fn launch(mut self, settler: Settler<DownloadStarted>) {
        let binding = self.signal.take().map(|signal| signal.bind(&self.cancel));

        tokio::spawn(async move {
            self.run(binding, settler).await;
        });
    }

    async fn run(self, binding: Option<TokenBinding>, settler: Settler<DownloadStarted>) {
        let url = self.request.url.clone();

        let response = match self.client.send(self.request, self.cancel.clone()).await {
            Ok(response) => response,
            Err(e) => {
                log::debug!("download {url}: send failed: {e}");
                settler.reject(e);
                return;
            }
        };

        // Chunked responses without a known length are not supported; a
        // zero length is treated the same as an absent one.
        let length = match response.content_length {
            Some(length) if length > 0 => length,
            _ => {
                settler.reject(Rejection::protocol("Empty response"));
                return;
            }
        };

        log::debug!("download {url}: {length} bytes -> {}", self.destination.display());

        let progress = ProgressHandle { counter: Observer::new(&self.transferred) };

        let state = TransferState {
            destination: self.destination,
            transferred: self.transferred,
            body: response.body,
            cancel: self.cancel,
            _binding: binding,
        };
        let promise = Promise::new(move |settler| state.spawn(settler));

        settler.resolve(DownloadStarted { length, progress, promise });
    }
}

/// Everything the worker thread owns for the duration of the transfer.
struct TransferState {
    destination: PathBuf,
    transferred: Arc<AtomicU64>,
    body: ByteStream,
    cancel: CancellationToken,
    /// Keeps the abort-signal binding alive while bytes move.
    _binding: Option<TokenBinding>,
}

impl TransferState {
    /// Spawns the dedicated worker thread. Runs on the event loop when the
    /// nested promise is launched, so a runtime handle is available to drive
    /// the blocking reads.
    fn spawn(self, settler: Settler<String>) {
        let handle = tokio::runtime::Handle::current();
        let spawned = std::thread::Builder::new()
            .name("download-transfer".to_string())
            .spawn(move || self.transfer(handle, settler));

        if let Err(e) = spawned {
            // The unrun closure is dropped with the settler inside; the
            // receiver observes an abandoned promise.
            log::warn!("could not spawn transfer thread: {e}");
        }
    }

    fn transfer(self, handle: tokio::runtime::Handle, settler: Settler<String>) {
        // Always append mode; the recorded offset is deliberately not used.
        let mut file = match OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.destination)
        {
            Ok(file) => file,
            Err(e) => {
                log::warn!("download open {} failed: {e}", self.destination.display());
                settler.reject(Rejection::io("Fail on open"));
                return;
            }
        };

        let mut body = BlockingBody::new(handle, self.body);
        let mut buf = [0u8; TRANSFER_CHUNK_SIZE];

        loop {
            match body.read(&mut buf, &self.cancel) {
                Ok(0) => {
                    log::debug!(
                        "download {} complete: {} bytes",
                        self.destination.display(),
                        self.transferred.load(Ordering::Relaxed)
                    );
                    settler.resolve("Success".to_string());
                    return;
                }
                Ok(n) => {
                    self.transferred.fetch_add(n as u64, Ordering::Relaxed);
                    // write_all retries partial writes until the chunk is
                    // fully flushed.
                    if let Err(e) = file.write_all(&buf[..n]) {
                        log::warn!("download write {} failed: {e}", self.destination.display());
                        settler.reject(Rejection::io("Fail"));
                        return;
                    }
                }
                Err(e) => {
                    let kind = if self.cancel.is_cancelled() {
                        ErrorKind::Cancelled
                    } else {
                        ErrorKind::Io
                    };
                    log::debug!("download {} read failed: {e}", self.destination.display());
                    settler.reject(Rejection::new(kind, "Fail"));
                    return;
                }
            }
        }
    }
}
