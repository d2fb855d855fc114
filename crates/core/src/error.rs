#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The target session has no open connection.
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// Writing a frame to a live connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The backing session or TTL store failed.
    #[error("Store error: {0}")]
    Store(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Longest grant or block window accepted, roughly one hundred years.
///
/// Keeps every deadline well inside both `i64` epoch milliseconds and the
/// PostgreSQL timestamp range.
pub const MAX_DURATION_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Reject a duration outside `1..=MAX_DURATION_SECS` with a
/// [`CoreError::Validation`].
pub fn require_positive_seconds(seconds: i64) -> Result<u64, CoreError> {
    if seconds <= 0 {
        return Err(CoreError::Validation(format!(
            "seconds must be greater than 0, got {seconds}"
        )));
    }
    require_bounded_seconds(seconds as u64)
}

/// Reject a duration longer than [`MAX_DURATION_SECS`].
pub fn require_bounded_seconds(seconds: u64) -> Result<u64, CoreError> {
    if seconds > MAX_DURATION_SECS {
        return Err(CoreError::Validation(format!(
            "seconds must be at most {MAX_DURATION_SECS}, got {seconds}"
        )));
    }
    Ok(seconds)
}
