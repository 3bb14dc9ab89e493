//! Collaborator traits at the core's boundary.
//!
//! Stores, the external assessment service, and the clock are all injected
//! behind async traits so the engine can be exercised with in-memory
//! implementations in tests and the CLI.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Attempt, InterviewConfig, QaPair, UserDisplay};

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

/// Read-mostly access to interview configurations.
#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<InterviewConfig>, CoreError>;

    /// Bump the interview's participant counter. Called once per fresh
    /// attempt start.
    async fn increment_participant_count(&self, id: Uuid) -> Result<(), CoreError>;
}

/// Persistence for attempts.
///
/// `update` is an expected-version write: the store replaces the record only
/// if its current version equals `expected_version`, and stores the new
/// record with `expected_version + 1`. A mismatch returns
/// `CoreError::Conflict("attempt")`, turning an unguarded race into a
/// detectable conflict.
#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Attempt>, CoreError>;

    async fn insert(&self, attempt: Attempt) -> Result<(), CoreError>;

    async fn update(&self, attempt: Attempt, expected_version: u64) -> Result<(), CoreError>;

    /// The at-most-one in-progress attempt for (interview, user), if any.
    async fn find_in_progress(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Attempt>, CoreError>;

    /// Number of completed attempts for (interview, user).
    async fn count_completed(&self, interview_id: Uuid, user_id: Uuid)
        -> Result<u64, CoreError>;

    /// All completed attempts for an interview, in storage order.
    async fn list_completed(&self, interview_id: Uuid) -> Result<Vec<Attempt>, CoreError>;

    /// All attempts belonging to a user, in storage order.
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Attempt>, CoreError>;
}

/// Resolves display identity for leaderboard entries.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn display(&self, id: Uuid) -> Result<Option<UserDisplay>, CoreError>;
}

// ---------------------------------------------------------------------------
// Assessment service
// ---------------------------------------------------------------------------

/// Request sent to the external assessment service.
///
/// The reply is free-text natural language with no guaranteed structure,
/// which is what forces the defensive parsing in [`crate::assessment`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentRequest {
    /// Competency dimensions in report order.
    pub dimensions: Vec<String>,
    /// The full transcript of the completed attempt.
    pub transcript: Vec<QaPair>,
}

/// Trait for external assessment backends.
#[async_trait]
pub trait Assessor: Send + Sync {
    /// Human-readable backend name (e.g. "openai").
    fn name(&self) -> &str;

    /// Produce a free-text evaluation of the transcript. Called once per
    /// completed attempt; the caller does not retry.
    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<String>;
}

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Supplies `now` for time-window checks and timestamping.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
