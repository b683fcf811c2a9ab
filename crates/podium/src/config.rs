//! Client configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file named
//! by `PODIUM_CONFIG`, then individual `PODIUM_*` environment variables.
//! Later layers win.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use podium_api::DEFAULT_BASE_URL;
use podium_poll::PollConfig;
use podium_sync::{PushConfig, SyncConfig};
use serde::{Deserialize, Serialize};

/// Names the TOML file to load.
pub const CONFIG_PATH_VAR: &str = "PODIUM_CONFIG";

/// Failures while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment variable is set but unusable.
    #[error("invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

/// Everything needed to wire up a [`PodiumClient`](crate::PodiumClient).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the leaderboard API, including any stage prefix.
    pub api_base_url: String,

    /// Push-service application key. Without it the client only polls.
    pub pusher_key: Option<String>,

    pub pusher_cluster: Option<String>,

    /// Full socket origin overriding the cluster host (self-hosted or test
    /// servers).
    pub pusher_host: Option<String>,

    /// Milliseconds between leaderboard polls. 0 turns polling off.
    pub poll_interval_ms: u64,

    pub leaderboard_limit: usize,

    /// Report per-row rank movement between updates.
    pub track_rank_changes: bool,

    /// Where the signed-in session is persisted.
    pub credentials_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            pusher_key: None,
            pusher_cluster: None,
            pusher_host: None,
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
            leaderboard_limit: Self::DEFAULT_LEADERBOARD_LIMIT,
            track_rank_changes: false,
            credentials_path: PathBuf::from(Self::DEFAULT_CREDENTIALS_PATH),
        }
    }
}

impl ClientConfig {
    const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
    const DEFAULT_LEADERBOARD_LIMIT: usize = 10;
    const DEFAULT_CREDENTIALS_PATH: &str = ".podium/credentials.json";

    /// Loads defaults, then the file named by `PODIUM_CONFIG` (if set),
    /// then environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) if !path.trim().is_empty() => Self::load_from(Path::new(path.trim()))?,
            _ => Self::default(),
        };
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Loads a TOML file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&contents)?;
        tracing::debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Overrides fields from `PODIUM_*` variables, read through `lookup`.
    /// Blank values are ignored.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("PODIUM_API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = get("PODIUM_PUSHER_KEY") {
            self.pusher_key = Some(v);
        }
        if let Some(v) = get("PODIUM_PUSHER_CLUSTER") {
            self.pusher_cluster = Some(v);
        }
        if let Some(v) = get("PODIUM_PUSHER_HOST") {
            self.pusher_host = Some(v);
        }
        if let Some(v) = get("PODIUM_POLL_INTERVAL_MS") {
            self.poll_interval_ms = parse_env("PODIUM_POLL_INTERVAL_MS", v)?;
        }
        if let Some(v) = get("PODIUM_LEADERBOARD_LIMIT") {
            self.leaderboard_limit = parse_env("PODIUM_LEADERBOARD_LIMIT", v)?;
        }
        if let Some(v) = get("PODIUM_TRACK_RANK_CHANGES") {
            self.track_rank_changes = parse_env("PODIUM_TRACK_RANK_CHANGES", v)?;
        }
        if let Some(v) = get("PODIUM_CREDENTIALS_PATH") {
            self.credentials_path = PathBuf::from(v);
        }
        Ok(())
    }

    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            limit: self.leaderboard_limit.max(1),
            poll: PollConfig::with_interval(Duration::from_millis(self.poll_interval_ms)),
            track_rank_changes: self.track_rank_changes,
            ..SyncConfig::default()
        }
    }

    pub fn push_config(&self) -> PushConfig {
        PushConfig {
            key: self.pusher_key.clone(),
            cluster: self.pusher_cluster.clone(),
            host: self.pusher_host.clone(),
            ..PushConfig::default()
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}
