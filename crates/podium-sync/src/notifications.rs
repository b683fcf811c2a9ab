//! Bounded, self-expiring recent-activity feed.

use std::collections::VecDeque;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use podium_protocol::{Notification, NotificationKind};
use tokio::time::Instant;

/// Holds at most `capacity` notifications, each for at most `ttl`.
#[derive(Debug)]
pub struct NotificationFeed {
    entries: VecDeque<(Instant, Notification)>,
    capacity: usize,
    ttl: Duration,
}

impl NotificationFeed {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Appends a notification, evicting the oldest when full.
    pub fn push(&mut self, notification: Notification) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((Instant::now(), notification));
    }

    /// Drops entries older than the TTL. Returns `true` if any were dropped.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.ttl.is_zero() {
            return false;
        }
        let before = self.entries.len();
        // Entries are in arrival order, so expired ones are at the front.
        while self
            .entries
            .front()
            .is_some_and(|(at, _)| now.saturating_duration_since(*at) >= self.ttl)
        {
            self.entries.pop_front();
        }
        self.entries.len() != before
    }

    /// When the oldest entry expires, if any will.
    pub fn next_expiry(&self) -> Option<Instant> {
        if self.ttl.is_zero() {
            return None;
        }
        self.entries.front().map(|(at, _)| *at + self.ttl)
    }

    pub fn clear(&mut self) -> bool {
        let had_any = !self.entries.is_empty();
        self.entries.clear();
        had_any
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Current entries, oldest first.
    pub fn to_vec(&self) -> Vec<Notification> {
        self.entries.iter().map(|(_, n)| n.clone()).collect()
    }
}

/// Builds a notification stamped with the current wall-clock time.
pub fn notification(
    kind: NotificationKind,
    message: impl Into<String>,
    score: Option<u64>,
) -> Notification {
    Notification {
        kind,
        message: message.into(),
        score,
        timestamp_ms: now_ms(),
    }
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
