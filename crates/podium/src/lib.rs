//! # Podium
//!
//! Client for a hosted game leaderboard: player sign-in with a persisted
//! session, a live top-N ranking kept fresh by polling and server push,
//! and validated score submission.
//!
//! The sub-crates can be used on their own. This crate wires them together
//! behind [`PodiumClient`], loads [`ClientConfig`] and folds every error
//! into [`PodiumError`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use podium::prelude::*;
//!
//! # async fn run() -> Result<(), PodiumError> {
//! podium::init_tracing();
//! let client = PodiumClient::builder(ClientConfig::load()?).start()?;
//! client.login("ada@example.com", "Secr3tpass").await?;
//! client.submit_score("1500").await?;
//! for row in client.leaderboard().rows {
//!     println!("#{} {} {}", row.rank, row.entry.username, row.entry.score);
//! }
//! client.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;

pub use client::{PodiumClient, PodiumClientBuilder};
pub use config::{ClientConfig, ConfigError, CONFIG_PATH_VAR};
pub use error::PodiumError;

pub use podium_api as api;
pub use podium_poll as poll;
pub use podium_protocol as protocol;
pub use podium_session as session;
pub use podium_sync as sync;
pub use podium_transport as transport;

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "podium=info";

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// [`DEFAULT_LOG_FILTER`]. Does nothing if a global subscriber is already
/// set.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

pub mod prelude {
    pub use crate::{ClientConfig, PodiumClient, PodiumClientBuilder, PodiumError};
    pub use podium_protocol::{GameStats, LeaderboardEntry, Notification, NotificationKind, User};
    pub use podium_session::{AuthSnapshot, CredentialStore, FileStore, MemoryStore};
    pub use podium_sync::{PushStatus, RankedEntry, SyncPhase, SyncSnapshot};
}
