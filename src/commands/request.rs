use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::Value;
use std::io::Write;

use crate::http::{Headers, HttpClient};

/// What to send for a one-off request.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub data: Option<Value>,
    /// Print response headers after the status line.
    pub include_headers: bool,
}

/// Performs a request and prints the status and body to `out`.
///
/// Error statuses are printed like any other response. JSON bodies are
/// pretty-printed, anything else is written as text.
#[tracing::instrument(
    skip(client, options, out),
    fields(method = %options.method, url = %options.url)
)]
pub fn request<W: Write>(
    client: &dyn HttpClient,
    options: &RequestOptions,
    out: &mut W,
) -> Result<()> {
    let mut response = client
        .request(
            &options.method,
            &options.url,
            &options.headers,
            options.data.as_ref(),
        )
        .with_context(|| format!("{} {} failed", options.method, options.url))?;

    let status = response.status_code();
    info!("{} {} -> {}", options.method, options.url, status);
    writeln!(out, "HTTP {}", status)?;

    if options.include_headers {
        let mut headers: Vec<(String, String)> = response.headers().into_iter().collect();
        headers.sort();
        for (name, value) in headers {
            writeln!(out, "{}: {}", name, value)?;
        }
        writeln!(out)?;
    }

    let body = match response.json() {
        Ok(value) => serde_json::to_string_pretty(&value)?,
        Err(e) if e.is_client() => {
            debug!("Body is not JSON, printing as text: {}", e);
            let bytes = response.read()?;
            String::from_utf8_lossy(bytes).into_owned()
        }
        Err(e) => return Err(e.into()),
    };
    if !body.is_empty() {
        writeln!(out, "{}", body)?;
    }

    response.close()?;
    Ok(())
}
