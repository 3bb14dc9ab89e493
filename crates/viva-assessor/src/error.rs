//! Assessor error types.
//!
//! These represent failures when calling the external assessment service.
//! The scoring pipeline treats every variant the same way (log and abort,
//! no retry), but the classification keeps transport, auth, and API
//! failures distinguishable in logs without string matching.

use thiserror::Error;

/// Errors that can occur when calling the assessment service.
#[derive(Debug, Error)]
pub enum AssessorError {
    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl AssessorError {
    /// Returns `true` if this error would also fail on an identical retry.
    pub fn is_permanent(&self) -> bool {
        matches!(self, AssessorError::AuthenticationFailed(_))
    }
}
