//! Wire protocol for Podium.
//!
//! This crate defines the "language" the client speaks with the
//! leaderboard API and the push service:
//!
//! - **Types** ([`LeaderboardEntry`], [`LoginResponse`], [`ProfileResponse`],
//!   etc.) — the JSON bodies of every endpoint.
//! - **Push** ([`PusherFrame`], [`PushEvent`], [`Notification`]) — frames on
//!   the pub/sub socket and what they mean.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages
//!   are converted to/from bytes.
//! - **Validation** ([`parse_score`], [`validate_password`], ...) — input
//!   checks that run before a request exists.
//! - **Errors** ([`ProtocolError`], [`ValidationError`]).
//!
//! The protocol layer doesn't know about connections or sessions; it only
//! knows shapes.

mod codec;
mod error;
mod push;
mod types;
mod validate;

pub use codec::{Codec, JsonCodec};
pub use error::{ProtocolError, ValidationError};
pub use push::{
    Notification, NotificationKind, PushEvent, PusherFrame, EVENT_MILESTONE,
    EVENT_NOTIFICATION, EVENT_SCORE_SUBMITTED, LEADERBOARD_CHANNEL,
    MILESTONE_DEFAULT_SCORE,
};
pub use types::{
    AuthTokens, ConfirmRequest, ErrorBody, GameStats, LeaderboardEntry,
    LoginRequest, LoginResponse, MessageResponse, ProfileResponse,
    RegisterRequest, RegisterResponse, SubmissionStatus, SubmitScoreRequest,
    TestNotificationRequest, TopScoreResponse, TopScoresResponse, User,
    VerifyResponse,
};
pub use validate::{
    parse_score, require, validate_email, validate_password, validate_score,
    MAX_SCORE, MIN_PASSWORD_LEN, MIN_SCORE,
};
