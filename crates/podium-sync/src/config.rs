//! Sync configuration and state machine.

use std::time::Duration;

use podium_poll::PollConfig;
use podium_protocol::LEADERBOARD_CHANNEL;

// ---------------------------------------------------------------------------
// SyncConfig
// ---------------------------------------------------------------------------

/// Configuration for a leaderboard sync.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How many rows to request.
    pub limit: usize,

    /// Poll cadence. An interval of zero turns periodic polling off.
    pub poll: PollConfig,

    /// Size of the recent-activity feed. The oldest entry is evicted first.
    pub max_notifications: usize,

    /// How long a notification stays in the feed. Zero keeps entries until
    /// they are evicted or cleared.
    pub notification_ttl: Duration,

    /// Fill [`RankedEntry::change`](crate::RankedEntry::change) by diffing
    /// successive rankings. When off, `change` is always 0.
    pub track_rank_changes: bool,

    /// Capacity of the actor's command channel.
    pub channel_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            poll: PollConfig::default(),
            max_notifications: 4,
            notification_ttl: Duration::from_secs(5),
            track_rank_changes: false,
            channel_size: 64,
        }
    }
}

// ---------------------------------------------------------------------------
// PushConfig
// ---------------------------------------------------------------------------

/// Where and how to reach the hosted push service.
///
/// Missing credentials are not an error: the sync simply runs without push.
#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Application key. Required.
    pub key: Option<String>,
    /// Cluster name, e.g. `eu`. Required unless `host` is set.
    pub cluster: Option<String>,
    /// Full `ws://` / `wss://` origin overriding the cluster host.
    pub host: Option<String>,
    pub channel: String,
    pub reconnect_delay: Duration,
    /// Upper bound of the random delay added to each reconnect.
    pub reconnect_jitter: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            key: None,
            cluster: None,
            host: None,
            channel: LEADERBOARD_CHANNEL.to_string(),
            reconnect_delay: Duration::from_secs(3),
            reconnect_jitter: Duration::from_secs(1),
        }
    }
}

impl PushConfig {
    pub fn new(key: impl Into<String>, cluster: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            cluster: Some(cluster.into()),
            ..Default::default()
        }
    }

    /// The socket URL, or `None` when credentials are missing.
    pub fn endpoint(&self) -> Option<String> {
        let key = non_empty(&self.key)?;
        let origin = match (non_empty(&self.host), non_empty(&self.cluster)) {
            (Some(host), _) => host.trim_end_matches('/').to_string(),
            (None, Some(cluster)) => format!("wss://ws-{cluster}.pusher.com"),
            (None, None) => return None,
        };
        Some(format!(
            "{origin}/app/{key}?protocol=7&client=podium&version={}",
            env!("CARGO_PKG_VERSION")
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

// ---------------------------------------------------------------------------
// SyncPhase
// ---------------------------------------------------------------------------

/// Lifecycle of a sync.
///
/// ```text
/// Idle → Loading → Ready ⇄ Error
///   └────────────────┴───────┴──→ Stopped
/// ```
///
/// - **Idle**: spawned, nothing fetched yet.
/// - **Loading**: the first fetch is in flight.
/// - **Ready**: the last update succeeded.
/// - **Error**: the last fetch failed; the previous rows are still shown.
/// - **Stopped**: shut down. Terminal; late results are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
    Stopped,
}

impl SyncPhase {
    /// Returns `true` if moving to `target` is allowed.
    pub fn can_transition_to(self, target: Self) -> bool {
        match (self, target) {
            (Self::Stopped, _) => false,
            (_, Self::Stopped) => true,
            (Self::Idle, Self::Loading) => true,
            (_, Self::Loading) => false,
            (_, Self::Ready | Self::Error) => true,
            (_, Self::Idle) => false,
        }
    }

    pub fn is_stopped(self) -> bool {
        matches!(self, Self::Stopped)
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Loading => write!(f, "Loading"),
            Self::Ready => write!(f, "Ready"),
            Self::Error => write!(f, "Error"),
            Self::Stopped => write!(f, "Stopped"),
        }
    }
}

// ---------------------------------------------------------------------------
// PushStatus
// ---------------------------------------------------------------------------

/// State of the push connection, for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PushStatus {
    /// No credentials configured; polling only.
    #[default]
    Disabled,
    Connecting,
    Connected,
    /// Lost or failed; a reconnect is scheduled.
    Disconnected { reason: String },
}

impl PushStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}
