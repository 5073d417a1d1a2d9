//! Contract between the retrying client and the HTTP engine underneath it.
//!
//! A [`Transport`] only has to send an already built [`TransportRequest`] and
//! hand back a [`RawResponse`]. Failures are split into transient transport
//! errors, which the client may retry, and everything else.

use std::collections::HashMap;
use std::io::Read;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde_json::Value;

use crate::error::BoxError;

/// Request and response header mapping.
pub type Headers = HashMap<String, String>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection reset, timeout, DNS failure and the like.
    #[error("transport error: {0}")]
    Transport(#[source] BoxError),

    /// The peer answered but the exchange broke HTTP rules (redirect loops, bad encodings).
    #[error("HTTP protocol error: {0}")]
    Protocol(#[source] BoxError),

    #[error("client has been closed")]
    Closed,

    #[error("response body has already been consumed")]
    StreamConsumed,
}

impl TransportError {
    /// Only failures below the HTTP layer are worth another attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transport(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        TransportError::Transport(Box::new(error))
    }
}

/// A fully built request, ready to be sent any number of times.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl TransportRequest {
    /// Builds a request from loosely typed caller input.
    ///
    /// `data` is encoded as the JSON body. A `content-type` header is added
    /// unless the caller already supplied one.
    pub fn build(
        method: &str,
        url: &str,
        headers: &Headers,
        data: Option<&Value>,
    ) -> Result<Self, TransportError> {
        let url = parse_url(url)?;

        let method = Method::from_bytes(method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(format!("method {:?}: {}", method, e)))?;

        let mut header_map = HeaderMap::with_capacity(headers.len());
        for (name, value) in headers {
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                TransportError::InvalidRequest(format!("header name {:?}: {}", name, e))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|e| {
                TransportError::InvalidRequest(format!("header {:?} value: {}", name, e))
            })?;
            header_map.insert(header_name, header_value);
        }

        let body = match data {
            Some(data) => {
                let encoded = serde_json::to_vec(data)
                    .map_err(|e| TransportError::InvalidRequest(format!("JSON body: {}", e)))?;
                if !header_map.contains_key(CONTENT_TYPE) {
                    header_map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(encoded)
            }
            None => None,
        };

        Ok(Self {
            method,
            url,
            headers: header_map,
            body,
        })
    }
}

fn parse_url(url: &str) -> Result<Url, TransportError> {
    let parsed =
        Url::parse(url).map_err(|e| TransportError::InvalidUrl(format!("{:?}: {}", url, e)))?;
    if !parsed.has_host() {
        return Err(TransportError::InvalidUrl(format!("{:?}: missing host", url)));
    }
    Ok(parsed)
}

/// The HTTP engine the retrying client is layered on.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Performs one attempt. Never retries on its own.
    fn send(&self, request: &TransportRequest) -> Result<Box<dyn RawResponse>, TransportError>;

    /// Tears down the connection pool. Later sends fail with [`TransportError::Closed`].
    fn close(&mut self) -> Result<(), TransportError>;
}

/// A response as handed back by a [`Transport`].
///
/// The body is fetched lazily. Implementations cache it on the first
/// [`RawResponse::read`] so repeated reads are cheap.
pub trait RawResponse: Send {
    fn status(&self) -> StatusCode;

    fn headers(&self) -> &HeaderMap;

    /// Returns the whole body, reading it from the connection if needed.
    fn read(&mut self) -> Result<&[u8], TransportError>;

    /// Returns a reader over the body.
    ///
    /// Served from the cache when the body was already read, otherwise from
    /// the live connection, in which case the body counts as consumed.
    fn body_reader(&mut self) -> Result<Box<dyn Read + '_>, TransportError>;

    /// Releases the connection. Must tolerate being called more than once.
    fn close(&mut self) -> Result<(), TransportError>;
}
