//! Session types: what the client knows about the signed-in player.
//!
//! A "session" is the pairing of a verified [`User`] with the bearer token
//! the server issued for them. The two only ever exist together: the
//! manager holds an `Option<Session>`, so "user without token" is not a
//! state the program can express.

use std::fmt;
use std::sync::Arc;

use podium_protocol::{GameStats, User};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// BearerToken
// ---------------------------------------------------------------------------

/// The id token sent as `Authorization: Bearer <token>`.
///
/// Cheap to clone, so other components can take their own immutable copy
/// per call. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BearerToken(Arc<str>);

impl BearerToken {
    pub fn new(token: impl Into<Arc<str>>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building a request.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

impl From<&str> for BearerToken {
    fn from(token: &str) -> Self {
        Self::new(token)
    }
}

impl From<String> for BearerToken {
    fn from(token: String) -> Self {
        Self::new(token)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A signed-in player and their bearer token.
///
/// Created on successful login or when restored from storage. Destroyed on
/// logout or when the server rejects the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: User,
    pub token: BearerToken,
}

// ---------------------------------------------------------------------------
// AuthSnapshot
// ---------------------------------------------------------------------------

/// An immutable view of the auth state, as published to subscribers.
///
/// `is_authenticated` is derived from `session` rather than stored, so it
/// can never disagree with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub game_stats: Option<GameStats>,
    /// `true` while a login or a restore verification is in flight.
    pub is_loading: bool,
}

impl AuthSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&BearerToken> {
        self.session.as_ref().map(|s| &s.token)
    }
}

// ---------------------------------------------------------------------------
// RestoreOutcome
// ---------------------------------------------------------------------------

/// What [`AuthManager::restore`](crate::AuthManager::restore) found.
#[derive(Debug)]
pub enum RestoreOutcome {
    /// Stored credentials were installed optimistically. The handle
    /// resolves once the server has confirmed or rejected them.
    Verifying(JoinHandle<()>),
    /// Nothing usable was stored. Any partial leftovers were cleared.
    Empty,
    /// `restore` already ran for this manager; nothing was done.
    AlreadyRestored,
}

impl RestoreOutcome {
    /// Waits for background verification, if any was started.
    pub async fn settled(self) {
        if let Self::Verifying(handle) = self {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "session verification task failed");
            }
        }
    }
}
