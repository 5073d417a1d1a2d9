//! [`Transport`] backed by `reqwest`'s blocking client.

use std::io::{Cursor, Read};

use log::debug;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::HeaderMap;

use super::transport::{RawResponse, Transport, TransportError, TransportRequest};

/// Sends requests through a shared `reqwest::blocking::Client` and its
/// connection pool.
pub struct ReqwestTransport {
    client: Option<Client>,
}

impl ReqwestTransport {
    /// Creates a transport that sends through `client`.
    pub fn new(client: Client) -> Self {
        Self {
            client: Some(client),
        }
    }

    /// Returns the underlying client, or `None` once the transport is closed.
    pub fn inner(&self) -> Option<&Client> {
        self.client.as_ref()
    }
}

impl Transport for ReqwestTransport {
    #[tracing::instrument(
        skip(self, request),
        fields(method = %request.method, url = %request.url)
    )]
    fn send(&self, request: &TransportRequest) -> Result<Box<dyn RawResponse>, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;

        let mut builder = client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().map_err(classify_error)?;
        Ok(Box::new(ReqwestResponse::new(response)))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if self.client.take().is_some() {
            debug!("Connection pool released");
        }
        Ok(())
    }
}

/// Sorts a `reqwest` failure into the transport error categories.
fn classify_error(error: reqwest::Error) -> TransportError {
    if error.is_builder() {
        TransportError::InvalidUrl(error.to_string())
    } else if error.is_redirect() || error.is_decode() || error.is_status() {
        TransportError::Protocol(Box::new(error))
    } else {
        // connect, timeout, request and body failures
        TransportError::Transport(Box::new(error))
    }
}

/// Response read lazily from a `reqwest` connection.
pub struct ReqwestResponse {
    status: StatusCode,
    headers: HeaderMap,
    inner: Option<reqwest::blocking::Response>,
    content: Option<Vec<u8>>,
    consumed: bool,
}

impl ReqwestResponse {
    /// Wraps a response whose headers have arrived. The body is read on demand.
    pub fn new(response: reqwest::blocking::Response) -> Self {
        Self {
            status: response.status(),
            headers: response.headers().clone(),
            inner: Some(response),
            content: None,
            consumed: false,
        }
    }
}

impl RawResponse for ReqwestResponse {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn read(&mut self) -> Result<&[u8], TransportError> {
        if self.content.is_none() {
            if self.consumed {
                return Err(TransportError::StreamConsumed);
            }
            let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
            // a failed read leaves the connection mid-body
            self.consumed = true;
            let mut buf = Vec::new();
            inner.read_to_end(&mut buf)?;
            self.content = Some(buf);
        }
        Ok(self.content.as_deref().unwrap_or_default())
    }

    fn body_reader(&mut self) -> Result<Box<dyn Read + '_>, TransportError> {
        if self.content.is_some() {
            return Ok(Box::new(Cursor::new(
                self.content.as_deref().unwrap_or_default(),
            )));
        }
        if self.consumed {
            return Err(TransportError::StreamConsumed);
        }
        let inner = self.inner.as_mut().ok_or(TransportError::Closed)?;
        self.consumed = true;
        Ok(Box::new(inner))
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // dropping the blocking response hands the connection back to the pool
        self.inner.take();
        Ok(())
    }
}
