//! What the sync publishes: ranked rows and the state snapshot.

use std::collections::HashMap;

use podium_protocol::{LeaderboardEntry, Notification};

use crate::{PushStatus, SyncPhase};

/// A leaderboard row with its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedEntry {
    /// 1-based position in the latest ranking.
    pub rank: usize,
    pub entry: LeaderboardEntry,
    /// Positions gained (positive) or lost (negative) since the previous
    /// ranking. 0 for new names, and always 0 unless rank tracking is on.
    pub change: i64,
}

/// Ranks `entries` in the order the server sent them.
///
/// With `track_changes`, each row's `change` compares its rank against the
/// first row with the same username in `previous`.
pub fn rank_entries(
    previous: &[RankedEntry],
    entries: Vec<LeaderboardEntry>,
    track_changes: bool,
) -> Vec<RankedEntry> {
    let mut before: HashMap<&str, usize> = HashMap::new();
    if track_changes {
        for row in previous {
            before.entry(row.entry.username.as_str()).or_insert(row.rank);
        }
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, entry)| {
            let rank = i + 1;
            let change = before
                .get(entry.username.as_str())
                .map_or(0, |&old| old as i64 - rank as i64);
            RankedEntry {
                rank,
                entry,
                change,
            }
        })
        .collect()
}

/// Everything a consumer needs to draw the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSnapshot {
    pub rows: Vec<RankedEntry>,
    /// Wall-clock milliseconds of the last successful update.
    pub last_updated_ms: Option<u64>,
    /// Message of the last failed fetch, cleared by the next success.
    pub error: Option<String>,
    pub phase: SyncPhase,
    /// Whether the submission gate is open. Starts open.
    pub can_submit: bool,
    /// Recent activity, oldest first.
    pub notifications: Vec<Notification>,
    pub push: PushStatus,
}

impl Default for SyncSnapshot {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            last_updated_ms: None,
            error: None,
            phase: SyncPhase::Idle,
            can_submit: true,
            notifications: Vec::new(),
            push: PushStatus::Disabled,
        }
    }
}

impl SyncSnapshot {
    /// `true` until the first fetch lands.
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, SyncPhase::Idle | SyncPhase::Loading)
    }

    pub fn row_for(&self, username: &str) -> Option<&RankedEntry> {
        self.rows.iter().find(|r| r.entry.username == username)
    }
}
