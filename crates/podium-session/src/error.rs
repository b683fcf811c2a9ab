//! Error types for the session layer.

use podium_api::ApiError;
use podium_protocol::ValidationError;

/// Errors surfaced by [`AuthManager`](crate::AuthManager) operations.
///
/// Only the operations the user initiates (login, register, confirm)
/// return these. Background verification and profile refresh fail closed
/// instead.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The server or the network rejected the call.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Input failed a client-side check; nothing was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Credentials could not be written to durable storage.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),
}

/// Failures of a [`CredentialStore`](crate::CredentialStore).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage i/o: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file or a stored value is not the JSON we wrote.
    #[error("storage format: {0}")]
    Format(#[from] serde_json::Error),
}
