use bytes::Bytes;
use thiserror::Error;

/// Errors raised by a [`Transport`](super::Transport) before a usable
/// response was obtained.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum TransportError {
    /// Request exceeded the configured timeout duration.
    #[error("request timed out")]
    Timeout,

    /// Failed to establish a connection to the endpoint.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The endpoint answered with a non-2xx status.
    ///
    /// The body is kept so a structured JSON-RPC error inside it can still be
    /// recovered by the client.
    #[error("request failed with status code {status}")]
    HttpStatus { status: u16, body: Bytes },

    /// The request envelope could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(String),

    /// Any other network-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl TransportError {
    /// HTTP status of the response, if one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Body of the response, if one was received.
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        match self {
            Self::HttpStatus { body, .. } => Some(body),
            _ => None,
        }
    }
}
