//! Core data model types for viva.
//!
//! These are the fundamental types the whole system uses to represent
//! interview configurations, attempts, transcripts, and score reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle status of an interview, controlled by its creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    Draft,
    Active,
    Closed,
}

impl fmt::Display for InterviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterviewStatus::Draft => write!(f, "draft"),
            InterviewStatus::Active => write!(f, "active"),
            InterviewStatus::Closed => write!(f, "closed"),
        }
    }
}

impl FromStr for InterviewStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(InterviewStatus::Draft),
            "active" => Ok(InterviewStatus::Active),
            "closed" => Ok(InterviewStatus::Closed),
            other => Err(format!("unknown interview status: {other}")),
        }
    }
}

/// Per-interview rules governing attempts and scoring axes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSettings {
    /// Maximum number of completed attempts per user.
    pub max_attempts: u32,
    /// Named evaluation axes, in report order.
    pub competency_dimensions: Vec<String>,
    /// How many questions each attempt asks.
    pub questions_to_ask: usize,
    /// The ordered question pool. Questions are asked in pool order.
    pub question_pool: Vec<String>,
}

/// A resolved interview configuration. Read-only to the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewConfig {
    /// Unique identifier.
    pub id: Uuid,
    /// Human-readable title.
    pub title: String,
    /// Description shown to candidates.
    #[serde(default)]
    pub description: String,
    /// The user who created this interview.
    pub creator_id: Uuid,
    /// Current lifecycle status.
    pub status: InterviewStatus,
    /// Attempts may only be started inside [start_time, end_time].
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Number of users who have started at least one attempt.
    #[serde(default)]
    pub participant_count: u64,
    pub settings: InterviewSettings,
}

impl InterviewConfig {
    /// Effective number of questions an attempt asks. The pool length
    /// silently caps `questions_to_ask` rather than erroring.
    pub fn question_limit(&self) -> usize {
        self.settings
            .questions_to_ask
            .min(self.settings.question_pool.len())
    }
}

/// Lifecycle status of an attempt. The only transition is
/// `InProgress -> Completed`, and `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
}

/// Outcome of the asynchronous scoring pipeline for an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStatus {
    /// No pipeline run has finished yet. This is the normal window between
    /// completion and the report landing.
    Pending,
    Succeeded,
    Failed,
}

/// One recorded question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// A score for one competency dimension, kept in configured order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionScore {
    pub dimension: String,
    pub score: u8,
}

/// The score report attached to an attempt. Timestamps are written by the
/// state machine; scores and comment are written by the scoring pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptResult {
    #[serde(default)]
    pub overall_score: Option<u8>,
    #[serde(default)]
    pub dimensional_scores: Vec<DimensionScore>,
    #[serde(default)]
    pub comment: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

/// One candidate's pass through an interview's question sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: Uuid,
    pub status: AttemptStatus,
    /// Append-only transcript. Length never exceeds the interview's
    /// question limit.
    pub transcript: Vec<QaPair>,
    pub result: AttemptResult,
    pub scoring_status: ScoringStatus,
    /// Record version for optimistic-concurrency writes.
    pub version: u64,
}

impl Attempt {
    /// Create a fresh in-progress attempt with an empty transcript.
    pub fn new(interview_id: Uuid, user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            interview_id,
            user_id,
            status: AttemptStatus::InProgress,
            transcript: Vec::new(),
            result: AttemptResult {
                overall_score: None,
                dimensional_scores: Vec::new(),
                comment: None,
                started_at: now,
                completed_at: None,
            },
            scoring_status: ScoringStatus::Pending,
            version: 0,
        }
    }

    /// Whether the scoring pipeline has landed a report on this attempt.
    pub fn is_scored(&self) -> bool {
        self.result.overall_score.is_some()
    }
}

/// Role of the user making a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

/// Identity and role of a requester, used for read authorization.
#[derive(Debug, Clone, Copy)]
pub struct Requester {
    pub id: Uuid,
    pub role: Role,
}

/// Display identity resolved from the user store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDisplay {
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}
