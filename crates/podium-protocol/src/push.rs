//! Push-channel frames and the events they carry.
//!
//! The hosted pub/sub service speaks the Pusher wire protocol: every frame
//! is a JSON object `{ "event", "channel"?, "data" }`, where `data` is
//! usually a JSON document encoded *as a string*. [`PusherFrame`] is the
//! raw frame; [`PushEvent`] is what the rest of the client cares about.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, TopScoresResponse};

/// The single channel the leaderboard publishes on.
pub const LEADERBOARD_CHANNEL: &str = "leaderboard";
/// Published after any score submission, carrying the new ranking.
pub const EVENT_SCORE_SUBMITTED: &str = "score-submitted";
/// Published when a submitted score crosses the 1000-point milestone.
pub const EVENT_MILESTONE: &str = "1000 posted";
/// Free-form notification broadcast (server test endpoint).
pub const EVENT_NOTIFICATION: &str = "notification";

/// Score assumed for a milestone event that omits it.
pub const MILESTONE_DEFAULT_SCORE: u64 = 1000;

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

/// What kind of activity a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    HighScore,
    NewPlayer,
    GameEvent,
    Test,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HighScore => write!(f, "HIGH SCORE"),
            Self::NewPlayer => write!(f, "NEW PLAYER"),
            Self::GameEvent => write!(f, "GAME EVENT"),
            Self::Test => write!(f, "TEST"),
        }
    }
}

/// An ephemeral activity notice. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u64>,
    /// Milliseconds since the Unix epoch, stamped on arrival.
    pub timestamp_ms: u64,
}

// ---------------------------------------------------------------------------
// Raw frames
// ---------------------------------------------------------------------------

/// One frame on the push socket, in either direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PusherFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default)]
    pub data: Value,
}

impl PusherFrame {
    /// Client → service: start receiving events on `channel`.
    pub fn subscribe(channel: &str) -> Self {
        Self {
            event: "pusher:subscribe".into(),
            channel: None,
            data: serde_json::json!({ "channel": channel }),
        }
    }

    /// Client → service: stop receiving events on `channel`.
    pub fn unsubscribe(channel: &str) -> Self {
        Self {
            event: "pusher:unsubscribe".into(),
            channel: None,
            data: serde_json::json!({ "channel": channel }),
        }
    }

    /// Client → service: answer to `pusher:ping`.
    pub fn pong() -> Self {
        Self {
            event: "pusher:pong".into(),
            channel: None,
            data: serde_json::json!({}),
        }
    }

    /// Decodes `data` into `T`, unwrapping the string-encoded form.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        match &self.data {
            Value::String(inner) => {
                serde_json::from_str(inner).map_err(ProtocolError::Decode)
            }
            // A frame without data reads as an empty object.
            Value::Null => serde_json::from_value(Value::Object(Default::default()))
                .map_err(ProtocolError::Decode),
            other => {
                serde_json::from_value(other.clone()).map_err(ProtocolError::Decode)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Decoded events
// ---------------------------------------------------------------------------

/// A push frame interpreted for the leaderboard client.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// Handshake finished; the service assigned a socket id.
    ConnectionEstablished { socket_id: Option<String> },
    /// A subscription request was accepted.
    SubscriptionSucceeded { channel: String },
    /// Keep-alive probe; must be answered with [`PusherFrame::pong`].
    Ping,
    /// Service-side error report (bad key, over quota, ...).
    ServiceError { message: String, code: Option<u32> },
    /// A complete replacement ranking.
    ScoreSubmitted(TopScoresResponse),
    /// A score crossed the milestone. Does not alter the ranking.
    Milestone { username: String, score: u64 },
    /// A free-form notification.
    Notification {
        kind: crate::NotificationKind,
        message: String,
        score: Option<u64>,
    },
    /// Anything else, including other channels and payloads without a
    /// ranking. Safe to ignore.
    Ignored { event: String },
}

#[derive(Deserialize)]
struct ConnectionData {
    #[serde(default)]
    socket_id: Option<String>,
}

#[derive(Deserialize)]
struct ErrorData {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<u32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScoreSubmittedData {
    #[serde(default)]
    response: Option<RankingData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RankingData {
    #[serde(default)]
    top_scores: Option<Vec<crate::LeaderboardEntry>>,
    #[serde(default)]
    count: Option<usize>,
}

#[derive(Deserialize)]
struct MilestoneData {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    score: Option<u64>,
}

#[derive(Deserialize)]
struct NotificationData {
    #[serde(rename = "type")]
    kind: crate::NotificationKind,
    message: String,
    #[serde(default)]
    score: Option<u64>,
}

impl PushEvent {
    /// Interprets a frame. Application events are only accepted on
    /// `channel`; protocol events (`pusher:*`) are channel-less.
    pub fn from_frame(frame: &PusherFrame, channel: &str) -> Result<Self, ProtocolError> {
        match frame.event.as_str() {
            "pusher:connection_established" => {
                let data: ConnectionData = frame.data_as()?;
                return Ok(Self::ConnectionEstablished {
                    socket_id: data.socket_id,
                });
            }
            "pusher_internal:subscription_succeeded" => {
                return Ok(Self::SubscriptionSucceeded {
                    channel: frame.channel.clone().unwrap_or_default(),
                });
            }
            "pusher:ping" => return Ok(Self::Ping),
            "pusher:error" => {
                let data: ErrorData = frame.data_as()?;
                return Ok(Self::ServiceError {
                    message: data.message.unwrap_or_else(|| "unknown error".into()),
                    code: data.code,
                });
            }
            _ => {}
        }

        if frame.channel.as_deref() != Some(channel) {
            return Ok(Self::Ignored {
                event: frame.event.clone(),
            });
        }

        match frame.event.as_str() {
            EVENT_SCORE_SUBMITTED => {
                let data: ScoreSubmittedData = frame.data_as()?;
                match data.response {
                    Some(RankingData {
                        top_scores: Some(top_scores),
                        count,
                    }) => {
                        let count = count.unwrap_or(top_scores.len());
                        Ok(Self::ScoreSubmitted(TopScoresResponse {
                            top_scores,
                            count,
                        }))
                    }
                    _ => Ok(Self::Ignored {
                        event: frame.event.clone(),
                    }),
                }
            }
            EVENT_MILESTONE => {
                let data: MilestoneData = frame.data_as()?;
                Ok(Self::Milestone {
                    username: data.username.unwrap_or_else(|| "Someone".into()),
                    score: data.score.unwrap_or(MILESTONE_DEFAULT_SCORE),
                })
            }
            EVENT_NOTIFICATION => {
                let data: NotificationData = frame.data_as()?;
                Ok(Self::Notification {
                    kind: data.kind,
                    message: data.message,
                    score: data.score,
                })
            }
            _ => Ok(Self::Ignored {
                event: frame.event.clone(),
            }),
        }
    }
}
