//! HTTP client with a fixed retry budget for transport failures.

use log::debug;
use serde_json::Value;

use super::response::Response;
use super::retry::{DEFAULT_RETRIES, with_retry};
use super::transport::{Headers, Transport, TransportError, TransportRequest};
use super::{HttpClient, HttpResponse, ResponseStream};
use crate::error::{Error, Result};

/// [`HttpClient`] that sends through a [`Transport`], retrying transient
/// transport failures without delay.
pub struct RetryingClient<T: Transport> {
    transport: T,
    retries: u32,
}

impl<T: Transport> RetryingClient<T> {
    /// Wraps `transport` with the default budget of [`DEFAULT_RETRIES`].
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retries: DEFAULT_RETRIES,
        }
    }

    /// Sets the number of retries after the first attempt. Zero disables retry.
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Returns the number of retries after the first attempt.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Returns a reference to the underlying transport.
    pub fn inner(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> HttpClient for RetryingClient<T> {
    #[tracing::instrument(skip(self, headers, data))]
    fn request(
        &self,
        method: &str,
        url: &str,
        headers: &Headers,
        data: Option<&Value>,
    ) -> Result<Box<dyn HttpResponse>> {
        debug!("{} {}...", method, url);

        let request = TransportRequest::build(method, url, headers, data).map_err(|e| match e {
            TransportError::InvalidUrl(_) => Error::client_with_source("Invalid URL Format", e),
            other => Error::client_with_source("Invalid request", other),
        })?;

        let raw = with_retry(
            "HTTP request",
            self.retries,
            || self.transport.send(&request),
            TransportError::is_transient,
        )
        .map_err(|e| Error::network("Exception re-raised from HTTP request", e))?;

        debug!("{} {} -> {}", method, url, raw.status());
        Ok(Box::new(Response::new(request.url, raw)))
    }

    fn stream(
        &self,
        _url: &str,
        _headers: &Headers,
        _data: Option<&Value>,
    ) -> Result<ResponseStream> {
        Err(Error::NotImplemented("streaming requests"))
    }

    fn close(&mut self) -> Result<()> {
        debug!("Closing HTTP client");
        Ok(self.transport.close()?)
    }
}
