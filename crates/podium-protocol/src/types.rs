//! Wire types for the leaderboard HTTP API.
//!
//! Every struct here mirrors a JSON body the API sends or accepts. The
//! API uses camelCase keys, so each type carries
//! `#[serde(rename_all = "camelCase")]` and Rust code keeps snake_case.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// The identity of a signed-in player, as returned by verify/profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub email: String,
    pub username: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.username, self.email)
    }
}

/// The player's standing as the server sees it. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub current_score: u64,
    /// ISO-8601 timestamp, `None` if the player never submitted.
    #[serde(default)]
    pub last_played: Option<String>,
    /// 1-based rank, `None` while unranked.
    #[serde(default)]
    pub rank: Option<u32>,
    pub total_players: u64,
}

// ---------------------------------------------------------------------------
// Auth endpoints
// ---------------------------------------------------------------------------

/// `POST /api/auth/register` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

/// `POST /api/auth/register` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub message: String,
    pub user_sub: String,
}

/// `POST /api/auth/confirm` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmRequest {
    pub email: String,
    pub confirmation_code: String,
}

/// Any response that only carries a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

/// `POST /api/auth/login` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token triple issued on login. Only `id_token` is used as the bearer.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub id_token: String,
}

// Tokens are credentials; keep them out of logs.
impl fmt::Debug for AuthTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthTokens").finish_non_exhaustive()
    }
}

/// `POST /api/auth/login` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub tokens: AuthTokens,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

/// `POST /api/auth/verify` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub message: String,
    pub user: User,
}

/// `GET /api/auth/profile` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub user: User,
    pub game_stats: GameStats,
}

// ---------------------------------------------------------------------------
// Leaderboard endpoints
// ---------------------------------------------------------------------------

/// One row of the leaderboard. The server decides the order; the client
/// never re-sorts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: u64,
    pub timestamp: String,
}

/// `GET /api/leaderboard/top` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopScoreResponse {
    pub top_score: Option<LeaderboardEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `GET /api/leaderboard/top/{limit}` response, also embedded in the
/// `score-submitted` push event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopScoresResponse {
    pub top_scores: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Score endpoints
// ---------------------------------------------------------------------------

/// `POST /api/scores/submit` body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitScoreRequest {
    pub score: u64,
}

/// `GET /api/scores/can-submit` response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionStatus {
    /// A missing or non-boolean field reads as `false`.
    #[serde(default)]
    pub can_submit: bool,
}

// ---------------------------------------------------------------------------
// Push-service admin endpoints
// ---------------------------------------------------------------------------

/// `POST /api/leaderboard/ws/test-notification` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestNotificationRequest {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: crate::NotificationKind,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// The body of a non-2xx response: `{ "error": "..." }`.
///
/// Every field is optional; a body without `error` falls back to the
/// status line.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
