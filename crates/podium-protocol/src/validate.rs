//! Client-side input checks.
//!
//! These run before any request is built, so rejected input never costs a
//! round trip.

use crate::ValidationError;

/// Smallest score the client will submit.
pub const MIN_SCORE: u64 = 1;
/// Largest score the client will submit.
pub const MAX_SCORE: u64 = 1_000_000;
/// Minimum password length, in characters.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Parses raw score input (as typed into a form) into a submittable score.
///
/// Accepts surrounding whitespace; rejects anything that is not a whole
/// number in `MIN_SCORE..=MAX_SCORE`.
///
/// ```rust
/// use podium_protocol::{parse_score, ValidationError};
///
/// assert_eq!(parse_score(" 1500 "), Ok(1500));
/// assert!(matches!(parse_score("abc"), Err(ValidationError::NotANumber(_))));
/// assert!(matches!(parse_score("-5"), Err(ValidationError::ScoreOutOfRange { .. })));
/// ```
pub fn parse_score(input: &str) -> Result<u64, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField("score"));
    }
    let value: i64 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
    check_range(value)
}

/// Validates an already-numeric score.
pub fn validate_score(score: u64) -> Result<u64, ValidationError> {
    check_range(i64::try_from(score).unwrap_or(i64::MAX))
}

fn check_range(value: i64) -> Result<u64, ValidationError> {
    match u64::try_from(value) {
        Ok(score) if (MIN_SCORE..=MAX_SCORE).contains(&score) => Ok(score),
        _ => Err(ValidationError::ScoreOutOfRange {
            value,
            min: MIN_SCORE,
            max: MAX_SCORE,
        }),
    }
}

/// Rejects empty or whitespace-only values.
pub fn require<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(value)
    }
}

/// Required, and shaped like `local@domain`.
pub fn validate_email(email: &str) -> Result<&str, ValidationError> {
    let email = require("email", email)?.trim();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::InvalidEmail),
    }
}

/// At least [`MIN_PASSWORD_LEN`] characters with an uppercase letter, a
/// lowercase letter, and a digit.
pub fn validate_password(password: &str) -> Result<&str, ValidationError> {
    require("password", password)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::WeakPassword("must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return Err(ValidationError::WeakPassword("must contain an uppercase letter"));
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return Err(ValidationError::WeakPassword("must contain a lowercase letter"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ValidationError::WeakPassword("must contain a number"));
    }
    Ok(password)
}
