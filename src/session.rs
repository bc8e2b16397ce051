//! Session: the scripted entry point.
//!
//! One `Session` per scripting context, owning the shared HTTP client every
//! request issued through it goes out on. `fetch` and `download` validate
//! their parameter bags synchronously — a [`ParamError`] is thrown straight
//! back at the caller and no promise ever exists — and on success hand back a
//! pending [`Promise`] whose operation has not been launched yet. Launch
//! happens when the host runs the promise's executor, so a send can only
//! start once a resolve/reject pair exists.

use std::path::PathBuf;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use url::Url;

use crate::abort::AbortSignal;
use crate::errors::ParamError;
use crate::net::client::{AsyncHttpClient, ReqwestClient};
use crate::net::download::{DownloadOperation, DownloadStarted};
use crate::net::fetch::{ConnectHook, FetchOperation, FetchOutput};
use crate::promise::Promise;
use crate::request::Request;

/// Parameter bag for [`Session::fetch`], as marshaled from the caller.
#[derive(Default)]
pub struct FetchParams {
    pub url: Option<String>,
    /// Defaults to GET; an empty string also falls back to GET.
    pub method: Option<String>,
    /// Request body. An empty string attaches no body.
    pub data: Option<String>,
    /// Unique keys, in caller order.
    pub headers: Option<Vec<(String, String)>>,
    pub signal: Option<AbortSignal>,
    pub on_connect: Option<ConnectHook>,
}

/// Parameter bag for [`Session::download`].
#[derive(Default)]
pub struct DownloadParams {
    pub url: Option<String>,
    pub destination: Option<String>,
    /// Must parse as a non-negative integer when present. Recorded on the
    /// operation but not applied to the transfer; see DESIGN.md.
    pub offset: Option<String>,
    pub signal: Option<AbortSignal>,
}

/// Shared client context and operation factory for one scripting context.
#[derive(Clone)]
pub struct Session {
    client: Arc<dyn AsyncHttpClient>,
}

impl Session {
    /// A session backed by a fresh shared `reqwest` client.
    pub fn new() -> Self {
        Self::with_client(Arc::new(ReqwestClient::new()))
    }

    /// A session over any client capability; used to run the operation
    /// state machines against a fake transport.
    pub fn with_client(client: Arc<dyn AsyncHttpClient>) -> Self {
        Self { client }
    }

    /// Validates and builds a fetch. Errors are synchronous; on success the
    /// returned promise is pending and unlaunched.
    pub fn fetch(&self, params: FetchParams) -> Result<Promise<FetchOutput>, ParamError> {
        let url = parse_url(params.url.ok_or(ParamError::MissingUrl)?)?;

        let method = match params.method.as_deref() {
            None | Some("") => Method::GET,
            Some(m) => Method::from_bytes(m.as_bytes()).map_err(|_| ParamError::InvalidMethod)?,
        };

        let mut request = Request::new(method, url);
        if let Some(headers) = params.headers {
            request.headers = build_headers(headers)?;
        }
        request.body = match params.data {
            Some(data) if !data.is_empty() => Some(data.into_bytes()),
            _ => None,
        };

        let op = FetchOperation::new(
            self.client.clone(),
            request,
            params.signal,
            params.on_connect,
        );
        Ok(op.into_promise())
    }

    /// Validates and builds a download. Errors are synchronous; on success
    /// the returned outer promise is pending and unlaunched.
    pub fn download(&self, params: DownloadParams) -> Result<Promise<DownloadStarted>, ParamError> {
        let url = params.url.ok_or(ParamError::MissingUrl)?;
        let destination = params.destination.ok_or(ParamError::MissingDestination)?;
        let url = parse_url(url)?;

        let offset = match params.offset.as_deref() {
            None => 0,
            Some(raw) => raw.parse::<u64>().map_err(|_| ParamError::InvalidOffset)?,
        };

        let op = DownloadOperation::new(
            self.client.clone(),
            Request::new(Method::GET, url),
            PathBuf::from(destination),
            offset,
            params.signal,
        );
        Ok(op.into_promise())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_url(raw: String) -> Result<Url, ParamError> {
    let url = Url::parse(&raw).map_err(|_| ParamError::MalformedUrl)?;
    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(ParamError::MalformedUrl),
    }
}

fn build_headers(pairs: Vec<(String, String)>) -> Result<HeaderMap, ParamError> {
    let mut headers = HeaderMap::new();
    for (key, value) in pairs {
        let name =
            HeaderName::from_bytes(key.as_bytes()).map_err(|_| ParamError::InvalidHeader)?;
        let value = HeaderValue::from_str(&value).map_err(|_| ParamError::InvalidHeader)?;
        // Keys are unique: a repeated key keeps the last value.
        headers.insert(name, value);
    }
    Ok(headers)
}
