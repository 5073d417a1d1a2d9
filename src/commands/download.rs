use anyhow::{Context, Result};
use log::{debug, info};
use std::io::Write;

use crate::http::{Headers, HttpClient};

/// Downloads `url` into `writer` chunk by chunk, returning the byte count.
///
/// The body is never held in memory as a whole. Non-2xx statuses fail.
#[tracing::instrument(skip(client, headers, writer))]
pub fn download<W: Write>(
    client: &dyn HttpClient,
    url: &str,
    headers: &Headers,
    chunk_size: Option<usize>,
    writer: &mut W,
) -> Result<u64> {
    info!("Downloading {}...", url);

    let mut response = client
        .request("GET", url, headers, None)
        .with_context(|| format!("Failed to start download from {}", url))?;

    let status = response.status_code();
    if !(200..300).contains(&status) {
        anyhow::bail!("Download from {} failed with HTTP status {}", url, status);
    }

    let mut downloaded_bytes: u64 = 0;
    for chunk in response.iter_bytes(chunk_size)? {
        let chunk = chunk.context("Failed to read chunk from download stream")?;
        writer
            .write_all(&chunk)
            .context("Failed to write chunk to file")?;
        downloaded_bytes += chunk.len() as u64;
    }
    writer.flush().context("Failed to flush downloaded file")?;

    debug!(
        "Downloaded {:.2} MB",
        downloaded_bytes as f64 / (1024.0 * 1024.0)
    );

    response.close()?;
    Ok(downloaded_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{MockTransport, RetryingClient};
    use crate::test_utils::FakeRawResponse;
    use reqwest::StatusCode;

    #[test]
    fn test_download_writes_all_chunks() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(Box::new(FakeRawResponse::ok(b"test content").with_read_limit(5))));
        let client = RetryingClient::new(transport);

        let mut out = Vec::new();
        let bytes = download(
            &client,
            "https://files.example.com/file.txt",
            &Headers::new(),
            Some(4),
            &mut out,
        )
        .unwrap();

        assert_eq!(bytes, 12); // "test content" is 12 bytes
        assert_eq!(out, b"test content");
    }

    #[test]
    fn test_download_not_found() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .times(1)
            .returning(|_| Ok(Box::new(FakeRawResponse::new(StatusCode::NOT_FOUND, b"missing"))));
        let client = RetryingClient::new(transport);

        let err = download(
            &client,
            "https://files.example.com/file.txt",
            &Headers::new(),
            None,
            &mut std::io::sink(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("404"));
    }

    #[test]
    fn test_download_rejects_zero_chunk_size() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(Box::new(FakeRawResponse::ok(b"abc"))));
        let client = RetryingClient::new(transport);

        let err = download(
            &client,
            "https://files.example.com/file.txt",
            &Headers::new(),
            Some(0),
            &mut std::io::sink(),
        )
        .unwrap_err();
        assert!(err.downcast_ref::<crate::Error>().unwrap().is_client());
    }

    #[test]
    fn test_download_mid_body_failure() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .returning(|_| Ok(Box::new(FakeRawResponse::ok(b"abc").failing_read())));
        let client = RetryingClient::new(transport);

        let err = download(
            &client,
            "https://files.example.com/file.txt",
            &Headers::new(),
            None,
            &mut std::io::sink(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("Failed to read chunk"));
    }
}
