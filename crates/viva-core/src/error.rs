//! Core error taxonomy.
//!
//! Every state-machine precondition fails fast with a specific kind at the
//! request boundary. Scoring pipeline failures are contained behind
//! `CoreError::Scoring` and never reach the request that triggered
//! completion.

use thiserror::Error;

/// Errors produced by the attempt state machine and its collaborators.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The named resource does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requester does not own the resource and holds no elevated role.
    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    /// The interview is outside its time window or not active.
    #[error("interview not available: {0}")]
    InvalidTimeWindow(&'static str),

    /// The user has already completed the maximum number of attempts.
    #[error("attempt limit reached ({0})")]
    AttemptLimitExceeded(u32),

    /// An answer was submitted to a finished attempt.
    #[error("attempt is already completed")]
    AlreadyCompleted,

    /// Missing or mismatched request input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An expected-version write lost a race on the named record.
    #[error("version conflict on {0}")]
    Conflict(&'static str),

    /// Scoring pipeline failure. Logged, never surfaced to the submit caller.
    #[error("scoring failed: {0}")]
    Scoring(String),

    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(String),
}
