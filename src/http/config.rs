use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use super::blocking::ReqwestTransport;
use super::client::RetryingClient;
use super::retry::DEFAULT_RETRIES;
use super::transport::Headers;
use crate::error::{Error, Result};

/// Settings for building a [`RetryingClient`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Retries after the first attempt.
    pub retries: u32,
    /// Total time allowed per attempt. `None` keeps the transport default.
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
    pub user_agent: String,
    /// Headers sent with every request.
    pub default_headers: Headers,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            timeout: None,
            connect_timeout: None,
            user_agent: default_user_agent(),
            default_headers: Headers::new(),
        }
    }
}

fn default_user_agent() -> String {
    format!("rhttp/{}", env!("CARGO_PKG_VERSION"))
}

impl ClientConfig {
    /// Creates a [`RetryingClient`] over a `reqwest` client built from these settings.
    pub fn build(&self) -> Result<RetryingClient<ReqwestTransport>> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
                Error::client_with_source(format!("Invalid default header name {:?}", name), e)
            })?;
            let mut value = HeaderValue::from_str(value).map_err(|e| {
                Error::client_with_source(
                    format!("Invalid value for default header {}", name.as_str()),
                    e,
                )
            })?;
            if name == reqwest::header::AUTHORIZATION {
                value.set_sensitive(true);
            }
            headers.insert(name, value);
        }

        let mut builder = Client::builder()
            .user_agent(self.user_agent.as_str())
            .default_headers(headers);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = self.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }

        let client = builder
            .build()
            .map_err(|e| Error::client_with_source("Invalid client configuration", e))?;
        debug!(
            "Built HTTP client (retries: {}, timeout: {:?})",
            self.retries, self.timeout
        );

        Ok(RetryingClient::new(ReqwestTransport::new(client)).with_retries(self.retries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpClient;
    use mockito::{Matcher, Server};

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.retries, 3);
        assert!(config.timeout.is_none());
        assert!(config.user_agent.starts_with("rhttp/"));
    }

    #[test]
    fn test_build_applies_retries() {
        let config = ClientConfig {
            retries: 1,
            ..Default::default()
        };
        let client = config.build().unwrap();
        assert_eq!(client.retries(), 1);
    }

    #[test]
    fn test_build_sends_user_agent_and_default_headers() {
        let mut server = Server::new();
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", "rhttp-test")
            .match_header("authorization", Matcher::Exact("Bearer token".to_string()))
            .match_header("x-format", "tagged")
            .create();

        let mut default_headers = Headers::new();
        default_headers.insert("Authorization".to_string(), "Bearer token".to_string());
        default_headers.insert("X-Format".to_string(), "tagged".to_string());

        let config = ClientConfig {
            user_agent: "rhttp-test".to_string(),
            default_headers,
            ..Default::default()
        };
        let client = config.build().unwrap();
        let _ = client.request("GET", &server.url(), &Headers::new(), None);

        mock.assert();
    }

    #[test]
    fn test_build_rejects_bad_default_header() {
        let mut default_headers = Headers::new();
        default_headers.insert("bad header".to_string(), "x".to_string());

        let config = ClientConfig {
            default_headers,
            ..Default::default()
        };
        let err = config.build().err().unwrap();
        assert!(err.is_client());
    }
}
