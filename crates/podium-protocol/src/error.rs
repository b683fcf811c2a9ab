//! Error types for the protocol layer.
//!
//! Two families live here. [`ProtocolError`] is about bytes that don't
//! turn into the expected shape. [`ValidationError`] is about user input
//! that must be rejected before anything is sent.

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields,
    /// wrong data types, or truncated messages.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message parsed but violates protocol rules, e.g. a push frame
    /// whose `data` string is not itself JSON.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

/// Client-side input checks that fail before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A required field was empty or whitespace.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// The score input is not an integer.
    #[error("score must be a whole number, got {0:?}")]
    NotANumber(String),

    /// The score is outside the accepted range.
    #[error("score must be between {min} and {max}, got {value}")]
    ScoreOutOfRange { value: i64, min: u64, max: u64 },

    /// The password fails the complexity rule.
    #[error("password {0}")]
    WeakPassword(&'static str),

    /// The email address is not plausibly an address.
    #[error("invalid email address")]
    InvalidEmail,
}
