//! Real-time leaderboard synchronization for Podium.
//!
//! A sync keeps one displayed leaderboard current from two sources:
//!
//! - **Polling**: `GET /api/leaderboard/top/{limit}` immediately, then on a
//!   fixed interval ([`podium_poll::PollScheduler`]).
//! - **Push**: a Pusher-protocol socket subscribed to the leaderboard
//!   channel. Ranking events replace the rows; milestone and notification
//!   events feed the recent-activity list.
//!
//! Both run as independent cancellable tasks feeding one state-sink actor,
//! so updates are applied one at a time in arrival order and the last
//! write wins. Consumers read [`SyncSnapshot`]s from a [`SyncHandle`].
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use podium_api::ApiClient;
//! use podium_sync::{LeaderboardSync, PushConfig, SyncConfig};
//! use podium_transport::{ReqwestTransport, WebSocketConnector};
//!
//! let api = ApiClient::new(ReqwestTransport::new()?, "https://api.example.com/dev");
//! let sync = LeaderboardSync::spawn_with_push(
//!     api,
//!     SyncConfig::default(),
//!     WebSocketConnector,
//!     PushConfig::new("app-key", "eu"),
//! );
//!
//! let mut updates = sync.subscribe();
//! while updates.changed().await.is_ok() {
//!     for row in &updates.borrow().rows {
//!         println!("#{} {} {}", row.rank, row.entry.username, row.entry.score);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod notifications;
mod poll;
mod push;
mod sync;
mod view;

pub use config::{PushConfig, PushStatus, SyncConfig, SyncPhase};
pub use error::SyncError;
pub use notifications::{notification, NotificationFeed};
pub use sync::{LeaderboardSync, SubmissionGate, SyncHandle};
pub use view::{rank_entries, RankedEntry, SyncSnapshot};
