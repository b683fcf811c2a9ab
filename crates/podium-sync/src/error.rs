//! Error types for the sync layer.

use podium_api::ApiError;
use podium_protocol::ValidationError;

/// Errors returned by [`SyncHandle`](crate::SyncHandle) operations.
///
/// Background poll and push failures never show up here; they land in the
/// snapshot's `error` field and the loops keep running.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The score input was rejected before any request.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// The server said this player may not submit right now.
    #[error("score submission is closed for this player")]
    SubmissionClosed,

    /// The sync was shut down.
    #[error("leaderboard sync has stopped")]
    Stopped,
}
