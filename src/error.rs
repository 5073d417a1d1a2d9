//! Error taxonomy surfaced by the HTTP layer.

use crate::http::TransportError;

/// Boxed cause carried by [`Error::Client`] and [`Error::Network`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller input or response decoding problem. Never retried.
    #[error("{message}")]
    Client {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// Transport failure that survived the retry budget.
    #[error("{message}")]
    Network {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// A declared capability gap.
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),

    /// Body read or client close failure, passed through unmapped.
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("response body is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Creates a client error with no underlying cause.
    pub fn client(message: impl Into<String>) -> Self {
        Error::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a client error that keeps `source` as its cause.
    pub fn client_with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Client {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates a network error wrapping the transport failure that caused it.
    pub fn network(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Network {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Returns true for [`Error::Client`].
    pub fn is_client(&self) -> bool {
        matches!(self, Error::Client { .. })
    }

    /// Returns true for [`Error::Network`].
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Returns true for [`Error::NotImplemented`].
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, Error::NotImplemented(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_client_error_display_is_message() {
        let err = Error::client("Invalid URL Format");
        assert_eq!(err.to_string(), "Invalid URL Format");
        assert!(err.is_client());
        assert!(err.source().is_none());
    }

    #[test]
    fn test_network_error_keeps_cause() {
        let err = Error::network(
            "Exception re-raised from HTTP request",
            TransportError::Closed,
        );
        assert!(err.is_network());
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), TransportError::Closed.to_string());
    }

    #[test]
    fn test_not_implemented_display() {
        let err = Error::NotImplemented("streaming requests");
        assert!(err.is_not_implemented());
        assert_eq!(err.to_string(), "streaming requests is not implemented");
    }

    #[test]
    fn test_transport_error_is_transparent() {
        let err = Error::from(TransportError::StreamConsumed);
        assert_eq!(err.to_string(), TransportError::StreamConsumed.to_string());
    }
}
