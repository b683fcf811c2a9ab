//! Unified error type for the Podium client.

use podium_api::ApiError;
use podium_protocol::{ProtocolError, ValidationError};
use podium_session::{SessionError, StorageError};
use podium_sync::SyncError;
use podium_transport::TransportError;

use crate::ConfigError;

/// Top-level error that wraps every crate-specific error.
///
/// When using the `podium` meta-crate you deal with this single type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PodiumError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Input rejected before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The operation needs a signed-in player.
    #[error("not signed in")]
    NotSignedIn,
}

impl PodiumError {
    /// `true` when the server could not be reached at all.
    pub fn is_network(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api(e) => e.is_network(),
            Self::Session(SessionError::Api(e)) => e.is_network(),
            Self::Sync(SyncError::Api(e)) => e.is_network(),
            _ => false,
        }
    }
}
