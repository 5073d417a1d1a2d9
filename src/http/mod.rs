//! Retrying HTTP request/response layer.
//!
//! Callers depend on the [`HttpClient`] and [`HttpResponse`] traits. The
//! stock implementation is [`RetryingClient`], which sends through any
//! [`Transport`] and retries transient transport failures a fixed number of
//! times. [`ReqwestTransport`] is the production backend.

mod blocking;
mod client;
mod config;
mod response;
mod retry;
mod transport;

pub use blocking::{ReqwestResponse, ReqwestTransport};
pub use client::RetryingClient;
pub use config::ClientConfig;
pub use response::{ByteChunks, Response, json_as};
pub use retry::{DEFAULT_RETRIES, with_retry};
pub use transport::{Headers, RawResponse, Transport, TransportError, TransportRequest};

#[cfg(test)]
pub use transport::MockTransport;

use reqwest::Url;
use serde_json::Value;

use crate::error::Result;

/// Sequence of responses produced by a streaming request.
pub type ResponseStream = Box<dyn Iterator<Item = Result<Box<dyn HttpResponse>>> + Send>;

/// Synchronous HTTP client.
///
/// HTTP error statuses are not errors at this level. A 404 or 503 comes back
/// as an ordinary response and the caller inspects the status code.
pub trait HttpClient: Send + Sync {
    fn request(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        data: Option<&Value>,
    ) -> Result<Box<dyn HttpResponse>>;

    /// Streaming requests. No implementation supports them yet.
    fn stream(&self, url: &str, headers: &Headers, data: Option<&Value>) -> Result<ResponseStream>;

    fn close(&mut self) -> Result<()>;
}

/// Decoding surface over one response.
///
/// Responses hold a pooled connection until they are closed or dropped.
pub trait HttpResponse: Send + std::fmt::Debug {
    /// URL of the request this response answers.
    fn url(&self) -> &Url;

    fn headers(&self) -> Headers;

    /// Decodes the body as UTF-8 JSON.
    fn json(&mut self) -> Result<Value>;

    fn text(&mut self) -> Result<String>;

    fn status_code(&self) -> u16;

    fn read(&mut self) -> Result<&[u8]>;

    /// Streams the body in chunks of at most `chunk_size` bytes.
    fn iter_bytes(&mut self, chunk_size: Option<usize>) -> Result<ByteChunks<'_>>;

    fn close(&mut self) -> Result<()>;
}
