//! Decoding surface over a raw transport response.

use std::collections::hash_map::Entry;
use std::io::{ErrorKind, Read};

use log::debug;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::HttpResponse;
use super::transport::{Headers, RawResponse, TransportError};
use crate::error::{Error, Result};

/// Buffer size used when the caller leaves chunking to the transport.
const NATIVE_CHUNK_SIZE: usize = 8 * 1024;

/// Response returned by [`super::RetryingClient`].
///
/// Dropping it releases the connection as well, but [`HttpResponse::close`]
/// is the only way to learn about a failed release.
pub struct Response {
    url: Url,
    raw: Box<dyn RawResponse>,
}

impl Response {
    /// Creates a response for the request sent to `url`.
    pub fn new(url: Url, raw: Box<dyn RawResponse>) -> Self {
        Self { url, raw }
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("url", &self.url.as_str())
            .field("status", &self.raw.status())
            .finish()
    }
}

impl HttpResponse for Response {
    fn url(&self) -> &Url {
        &self.url
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        for (name, value) in self.raw.headers() {
            let value = String::from_utf8_lossy(value.as_bytes());
            match headers.entry(name.as_str().to_string()) {
                Entry::Occupied(mut existing) => {
                    let existing = existing.get_mut();
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
                Entry::Vacant(slot) => {
                    slot.insert(value.into_owned());
                }
            }
        }
        headers
    }

    fn json(&mut self) -> Result<Value> {
        let url = &self.url;
        let body = self.raw.read()?;

        let text = std::str::from_utf8(body).map_err(|e| decode_error(url, e))?;
        serde_json::from_str(text).map_err(|e| decode_error(url, e))
    }

    fn text(&mut self) -> Result<String> {
        let body = self.raw.read()?.to_vec();
        Ok(String::from_utf8(body)?)
    }

    fn status_code(&self) -> u16 {
        self.raw.status().as_u16()
    }

    fn read(&mut self) -> Result<&[u8]> {
        Ok(self.raw.read()?)
    }

    fn iter_bytes(&mut self, chunk_size: Option<usize>) -> Result<ByteChunks<'_>> {
        if chunk_size == Some(0) {
            return Err(Error::client("Chunk size must be greater than zero"));
        }
        let reader = self.raw.body_reader()?;
        Ok(ByteChunks::new(reader, chunk_size))
    }

    fn close(&mut self) -> Result<()> {
        debug!("Closing response from {}", self.url);
        self.raw
            .close()
            .map_err(|e| Error::client_with_source("Error closing response", e))
    }
}

fn decode_error(url: &Url, cause: impl Into<crate::error::BoxError>) -> Error {
    Error::client_with_source(
        format!(
            "Unable to decode response from endpoint {}. Check that your endpoint is valid.",
            url
        ),
        cause,
    )
}

/// Decodes a JSON body into `T`.
///
/// A body that is not JSON, or JSON of the wrong shape, is a client error
/// naming the request URL.
pub fn json_as<T: DeserializeOwned>(response: &mut dyn HttpResponse) -> Result<T> {
    let value = response.json()?;
    serde_json::from_value(value).map_err(|e| decode_error(response.url(), e))
}

/// Lazy, single-pass sequence of body chunks.
///
/// With a chunk size every chunk except the last is exactly that long.
/// Without one, each chunk is whatever the transport yields per read. The
/// iterator ends after the body is exhausted or after the first error.
pub struct ByteChunks<'a> {
    reader: Box<dyn Read + 'a>,
    chunk_size: Option<usize>,
    done: bool,
}

impl<'a> ByteChunks<'a> {
    fn new(reader: Box<dyn Read + 'a>, chunk_size: Option<usize>) -> Self {
        Self {
            reader,
            chunk_size,
            done: false,
        }
    }

    fn fill(&mut self, size: usize) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0; size];
        let mut filled = 0;
        while filled < size {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn read_native(&mut self) -> std::io::Result<Vec<u8>> {
        let mut buf = vec![0; NATIVE_CHUNK_SIZE];
        loop {
            match self.reader.read(&mut buf) {
                Ok(n) => {
                    buf.truncate(n);
                    return Ok(buf);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }
}

impl Iterator for ByteChunks<'_> {
    type Item = Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let chunk = match self.chunk_size {
            Some(size) => self.fill(size),
            None => self.read_native(),
        };

        match chunk {
            Ok(chunk) if chunk.is_empty() => {
                self.done = true;
                None
            }
            Ok(chunk) => Some(Ok(chunk)),
            Err(e) => {
                self.done = true;
                Some(Err(TransportError::from(e).into()))
            }
        }
    }
}

impl std::iter::FusedIterator for ByteChunks<'_> {}
