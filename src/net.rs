pub mod client;
pub mod download;
pub mod fetch;

pub use client::{AsyncHttpClient, BlockingBody, ByteStream, HttpResponse, ReqwestClient};
pub use download::{DownloadOperation, DownloadStarted, ProgressHandle};
pub use fetch::{ConnectHook, FetchOperation, FetchOutput};
