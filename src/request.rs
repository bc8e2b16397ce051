//! Immutable request model.

use http::{HeaderMap, Method};
use url::Url;

/// One HTTP request as built from caller parameters. Built once by the
/// session, immutable thereafter.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub url: Url,
    /// Header mapping with unique keys, in caller order.
    pub headers: HeaderMap,
    /// Request body bytes, when the caller supplied a non-empty `data`.
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
        }
    }
}
