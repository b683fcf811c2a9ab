//! Error type for API calls.

use podium_protocol::{ProtocolError, ValidationError};
use podium_transport::TransportError;

/// Every way an API call can fail, decided once when the response is parsed.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (refused, reset, timed out).
    #[error("network failure: {0}")]
    Network(#[from] TransportError),

    /// The server answered with a non-2xx status.
    ///
    /// `message` is the body's `error` field, or `"<status> <reason>"`
    /// when the body carries none.
    #[error("{message}")]
    Server { status: u16, message: String },

    /// A 2xx response whose body is empty, not JSON, or `null`.
    #[error("empty response from {endpoint}")]
    EmptyResponse { endpoint: String },

    /// A 2xx JSON body that doesn't match the expected shape.
    #[error("unexpected response: {0}")]
    Protocol(#[from] ProtocolError),

    /// Input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ApiError {
    /// HTTP status for server errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `true` when the server rejected the bearer token.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    /// `true` when nothing reached the server.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
