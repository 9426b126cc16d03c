//! Error types for the endpoint API client.

use thiserror::Error;

/// Errors that can occur while talking to a cluster endpoint.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Bad credentials or an irrecoverable 401
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request timeout
    #[error("request timeout after {0}s")]
    Timeout(u64),

    /// Connection failed
    #[error("connection failed: {0}")]
    Connection(String),

    /// Endpoint returned a non-success HTTP status
    #[error("endpoint returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether a retry with backoff could plausibly succeed.
    ///
    /// Timeouts, connection failures, and 5xx responses are transient;
    /// auth failures and 4xx responses are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Timeout(_) | ClientError::Connection(_) => true,
            ClientError::Http { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// Classify a reqwest transport error.
    pub(crate) fn from_transport(e: reqwest::Error, timeout_seconds: u64) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(timeout_seconds)
        } else {
            ClientError::Connection(e.to_string())
        }
    }
}
