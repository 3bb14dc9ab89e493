//! Attempt lifecycle state machine.
//!
//! Owns attempt creation, resumption, question advancement, and completion
//! detection, and dispatches the scoring pipeline at the moment of
//! completion without awaiting it. All mutations go through expected-version
//! store writes, so concurrent submissions on one attempt surface as
//! `Conflict` instead of silently corrupting the transcript.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::ScoringPolicy;
use crate::dashboard::{self, LeaderboardEntry, ScoreDistribution};
use crate::error::CoreError;
use crate::model::{Attempt, AttemptStatus, InterviewStatus, QaPair, Requester, Role};
use crate::scoring::ScoringPipeline;
use crate::traits::{Assessor, AttemptStore, Clock, InterviewStore, UserStore};

/// Result of starting or resuming an attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartOutcome {
    pub attempt_id: Uuid,
    /// The question to ask next: index 0 on a fresh start, the first
    /// unanswered question on a resume.
    pub question: String,
    pub resumed: bool,
}

/// Result of submitting one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum SubmitOutcome {
    Next { question: String },
    /// The attempt is finished; the score report is being generated in the
    /// background and arrives on the attempt record later.
    Completed,
}

/// One page of a user's attempt history, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptPage {
    pub attempts: Vec<Attempt>,
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Dashboard read model for one interview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewDashboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub score_distribution: ScoreDistribution,
    pub total_participants: u64,
    pub completed_attempts: usize,
}

/// The attempt state machine and its read paths.
pub struct AttemptEngine {
    interviews: Arc<dyn InterviewStore>,
    attempts: Arc<dyn AttemptStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
    pipeline: Arc<ScoringPipeline>,
}

impl AttemptEngine {
    pub fn new(
        interviews: Arc<dyn InterviewStore>,
        attempts: Arc<dyn AttemptStore>,
        users: Arc<dyn UserStore>,
        assessor: Arc<dyn Assessor>,
        clock: Arc<dyn Clock>,
        policy: ScoringPolicy,
    ) -> Self {
        let pipeline = Arc::new(ScoringPipeline::new(
            Arc::clone(&attempts),
            Arc::clone(&interviews),
            assessor,
            policy,
        ));
        Self {
            interviews,
            attempts,
            users,
            clock,
            pipeline,
        }
    }

    /// Start a fresh attempt or resume the user's in-progress one.
    ///
    /// Resumption wins over the attempt-count check, which makes start
    /// idempotent and safe to retry.
    pub async fn start_or_resume(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<StartOutcome, CoreError> {
        let interview = self
            .interviews
            .get(interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;

        let now = self.clock.now();
        if now < interview.start_time || now > interview.end_time {
            return Err(CoreError::InvalidTimeWindow(
                "outside the interview time window",
            ));
        }
        if interview.status != InterviewStatus::Active {
            return Err(CoreError::InvalidTimeWindow("interview is not active"));
        }

        if let Some(existing) = self
            .attempts
            .find_in_progress(interview_id, user_id)
            .await?
        {
            let index = existing.transcript.len();
            let question = interview
                .settings
                .question_pool
                .get(index)
                .cloned()
                .ok_or_else(|| {
                    CoreError::Store(format!(
                        "attempt {} transcript exceeds the question pool",
                        existing.id
                    ))
                })?;
            return Ok(StartOutcome {
                attempt_id: existing.id,
                question,
                resumed: true,
            });
        }

        let completed = self.attempts.count_completed(interview_id, user_id).await?;
        if completed >= u64::from(interview.settings.max_attempts) {
            return Err(CoreError::AttemptLimitExceeded(
                interview.settings.max_attempts,
            ));
        }

        let question = interview
            .settings
            .question_pool
            .first()
            .cloned()
            .ok_or_else(|| {
                CoreError::InvalidInput("interview has an empty question pool".into())
            })?;

        let attempt = Attempt::new(interview_id, user_id, now);
        let attempt_id = attempt.id;
        self.attempts.insert(attempt).await?;
        self.interviews
            .increment_participant_count(interview_id)
            .await?;

        tracing::info!(%attempt_id, %interview_id, %user_id, "attempt started");
        Ok(StartOutcome {
            attempt_id,
            question,
            resumed: false,
        })
    }

    /// Record one answer and either hand back the next question or complete
    /// the attempt and dispatch scoring.
    ///
    /// The submitted question must match the expected question at the
    /// attempt's current index; an arbitrary string is rejected rather than
    /// recorded.
    pub async fn submit_answer(
        &self,
        attempt_id: Uuid,
        user_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<SubmitOutcome, CoreError> {
        if question.trim().is_empty() || answer.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "question and answer are both required".into(),
            ));
        }

        let mut attempt = self
            .attempts
            .get(attempt_id)
            .await?
            .ok_or(CoreError::NotFound("attempt"))?;
        if attempt.user_id != user_id {
            return Err(CoreError::Forbidden("attempt belongs to another user"));
        }
        if attempt.status != AttemptStatus::InProgress {
            return Err(CoreError::AlreadyCompleted);
        }

        let interview = self
            .interviews
            .get(attempt.interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;

        match interview.settings.question_pool.get(attempt.transcript.len()) {
            Some(expected) if expected == question => {}
            _ => {
                return Err(CoreError::InvalidInput(
                    "submitted question does not match the expected question".into(),
                ))
            }
        }

        let expected_version = attempt.version;
        attempt.transcript.push(QaPair {
            question: question.to_string(),
            answer: answer.to_string(),
        });

        let answered = attempt.transcript.len();
        if answered < interview.question_limit() {
            let next = interview.settings.question_pool[answered].clone();
            self.attempts.update(attempt, expected_version).await?;
            Ok(SubmitOutcome::Next { question: next })
        } else {
            attempt.status = AttemptStatus::Completed;
            attempt.result.completed_at = Some(self.clock.now());
            self.attempts.update(attempt, expected_version).await?;

            tracing::info!(%attempt_id, "attempt completed, scoring dispatched");
            self.pipeline.dispatch(attempt_id);
            Ok(SubmitOutcome::Completed)
        }
    }

    /// Fetch an attempt, including its transcript and possibly partial
    /// result. Readable by the participant, the interview creator, and
    /// admins.
    pub async fn get_attempt(
        &self,
        attempt_id: Uuid,
        requester: Requester,
    ) -> Result<Attempt, CoreError> {
        let attempt = self
            .attempts
            .get(attempt_id)
            .await?
            .ok_or(CoreError::NotFound("attempt"))?;

        if requester.id == attempt.user_id || requester.role == Role::Admin {
            return Ok(attempt);
        }

        let interview = self
            .interviews
            .get(attempt.interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;
        if requester.id == interview.creator_id {
            Ok(attempt)
        } else {
            Err(CoreError::Forbidden(
                "only the participant, the interview creator, or an admin may view an attempt",
            ))
        }
    }

    /// One page of a user's attempts, newest first. `page` is 1-based.
    pub async fn list_user_attempts(
        &self,
        user_id: Uuid,
        page: usize,
        limit: usize,
    ) -> Result<AttemptPage, CoreError> {
        let page = page.max(1);
        let limit = limit.max(1);

        let mut attempts = self.attempts.list_for_user(user_id).await?;
        attempts.sort_by(|a, b| b.result.started_at.cmp(&a.result.started_at));

        let total = attempts.len();
        let total_pages = total.div_ceil(limit);
        let attempts = attempts
            .into_iter()
            .skip((page - 1) * limit)
            .take(limit)
            .collect();

        Ok(AttemptPage {
            attempts,
            total,
            page,
            total_pages,
        })
    }

    /// Ranked leaderboard over scored, completed attempts.
    pub async fn leaderboard(
        &self,
        interview_id: Uuid,
    ) -> Result<Vec<LeaderboardEntry>, CoreError> {
        self.interviews
            .get(interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;

        let completed = self.attempts.list_completed(interview_id).await?;
        let mut entries = Vec::new();
        for row in dashboard::rank(&completed) {
            let (username, nickname, avatar_url) = match self.users.display(row.user_id).await? {
                Some(d) => (d.username, d.nickname, d.avatar_url),
                None => (row.user_id.to_string(), None, None),
            };
            entries.push(LeaderboardEntry {
                attempt_id: row.attempt_id,
                user_id: row.user_id,
                username,
                nickname,
                avatar_url,
                overall_score: row.overall_score,
                completed_at: row.completed_at,
            });
        }
        Ok(entries)
    }

    /// Histogram of scored, completed attempts over the fixed buckets.
    pub async fn score_distribution(
        &self,
        interview_id: Uuid,
    ) -> Result<ScoreDistribution, CoreError> {
        self.interviews
            .get(interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;
        let completed = self.attempts.list_completed(interview_id).await?;
        Ok(dashboard::distribution(&completed))
    }

    /// Full dashboard read model: leaderboard, histogram, and totals.
    pub async fn dashboard(&self, interview_id: Uuid) -> Result<InterviewDashboard, CoreError> {
        let interview = self
            .interviews
            .get(interview_id)
            .await?
            .ok_or(CoreError::NotFound("interview"))?;

        let completed = self.attempts.list_completed(interview_id).await?;
        let leaderboard = self.leaderboard(interview_id).await?;

        Ok(InterviewDashboard {
            leaderboard,
            score_distribution: dashboard::distribution(&completed),
            total_participants: interview.participant_count,
            completed_attempts: completed.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryAttemptStore, InMemoryInterviewStore, InMemoryUserStore};
    use crate::model::{InterviewConfig, InterviewSettings, UserDisplay};
    use crate::traits::AssessmentRequest;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    struct FixedAssessor(&'static str);

    #[async_trait]
    impl Assessor for FixedAssessor {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn assess(&self, _request: &AssessmentRequest) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Fixture {
        engine: AttemptEngine,
        attempts: Arc<InMemoryAttemptStore>,
        interviews: Arc<InMemoryInterviewStore>,
        users: Arc<InMemoryUserStore>,
        interview_id: Uuid,
        creator_id: Uuid,
        now: DateTime<Utc>,
    }

    fn fixture(settings: InterviewSettings) -> Fixture {
        fixture_at(settings, InterviewStatus::Active, mid_window())
    }

    fn mid_window() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 15, 12, 0, 0).unwrap()
    }

    fn fixture_at(
        settings: InterviewSettings,
        status: InterviewStatus,
        now: DateTime<Utc>,
    ) -> Fixture {
        let interviews = Arc::new(InMemoryInterviewStore::new());
        let attempts = Arc::new(InMemoryAttemptStore::new());
        let users = Arc::new(InMemoryUserStore::new());
        let creator_id = Uuid::new_v4();

        let interview = InterviewConfig {
            id: Uuid::new_v4(),
            title: "Backend screen".into(),
            description: String::new(),
            creator_id,
            status,
            start_time: Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 3, 31, 0, 0, 0).unwrap(),
            participant_count: 0,
            settings,
        };
        let interview_id = interview.id;
        interviews.insert(interview);

        let engine = AttemptEngine::new(
            Arc::clone(&interviews) as _,
            Arc::clone(&attempts) as _,
            Arc::clone(&users) as _,
            Arc::new(FixedAssessor("Communication: 80\nOverall score: 80")),
            Arc::new(FixedClock(now)),
            ScoringPolicy::default(),
        );

        Fixture {
            engine,
            attempts,
            interviews,
            users,
            interview_id,
            creator_id,
            now,
        }
    }

    fn two_question_settings() -> InterviewSettings {
        InterviewSettings {
            max_attempts: 3,
            competency_dimensions: vec!["Communication".into()],
            questions_to_ask: 2,
            question_pool: vec!["q0".into(), "q1".into(), "q2".into()],
        }
    }

    #[tokio::test]
    async fn start_is_idempotent_before_any_answer() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let first = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        let second = f.engine.start_or_resume(f.interview_id, user).await.unwrap();

        assert!(!first.resumed);
        assert!(second.resumed);
        assert_eq!(first.attempt_id, second.attempt_id);
        assert_eq!(first.question, "q0");
        assert_eq!(second.question, "q0");

        // Only the fresh start counts a participant.
        let interview = f.interviews.get(f.interview_id).await.unwrap().unwrap();
        assert_eq!(interview.participant_count, 1);
    }

    #[tokio::test]
    async fn resume_returns_first_unanswered_question() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        let next = f
            .engine
            .submit_answer(start.attempt_id, user, "q0", "an answer")
            .await
            .unwrap();
        assert_eq!(
            next,
            SubmitOutcome::Next {
                question: "q1".into()
            }
        );

        let resumed = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        assert!(resumed.resumed);
        assert_eq!(resumed.question, "q1");
    }

    #[tokio::test]
    async fn final_answer_completes_and_timestamps_the_attempt() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q0", "a0")
            .await
            .unwrap();
        let outcome = f
            .engine
            .submit_answer(start.attempt_id, user, "q1", "a1")
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Completed);

        let attempt = f.attempts.get(start.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.status, AttemptStatus::Completed);
        assert_eq!(attempt.transcript.len(), 2);
        assert_eq!(attempt.result.completed_at, Some(f.now));
        assert_eq!(attempt.result.started_at, f.now);
    }

    #[tokio::test]
    async fn pool_length_caps_progression_without_error() {
        let f = fixture(InterviewSettings {
            max_attempts: 3,
            competency_dimensions: vec!["Communication".into()],
            questions_to_ask: 5,
            question_pool: vec!["q0".into(), "q1".into()],
        });
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q0", "a0")
            .await
            .unwrap();
        let outcome = f
            .engine
            .submit_answer(start.attempt_id, user, "q1", "a1")
            .await
            .unwrap();
        assert_eq!(outcome, SubmitOutcome::Completed);
    }

    #[tokio::test]
    async fn submit_to_completed_attempt_fails_without_mutation() {
        let f = fixture(InterviewSettings {
            max_attempts: 3,
            competency_dimensions: vec!["Communication".into()],
            questions_to_ask: 1,
            question_pool: vec!["q0".into(), "q1".into()],
        });
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q0", "a0")
            .await
            .unwrap();

        let err = f
            .engine
            .submit_answer(start.attempt_id, user, "q1", "late answer")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AlreadyCompleted));

        let attempt = f.attempts.get(start.attempt_id).await.unwrap().unwrap();
        assert_eq!(attempt.transcript.len(), 1);
    }

    #[tokio::test]
    async fn attempt_limit_applies_per_user() {
        let f = fixture(InterviewSettings {
            max_attempts: 1,
            competency_dimensions: vec!["Communication".into()],
            questions_to_ask: 1,
            question_pool: vec!["q0".into()],
        });
        let user = Uuid::new_v4();
        let other_user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q0", "a0")
            .await
            .unwrap();

        let err = f
            .engine
            .start_or_resume(f.interview_id, user)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::AttemptLimitExceeded(1)));

        // Another user's count is independent.
        assert!(f
            .engine
            .start_or_resume(f.interview_id, other_user)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn wrong_user_cannot_submit() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        let err = f
            .engine
            .submit_answer(start.attempt_id, Uuid::new_v4(), "q0", "a0")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Forbidden(_)));
    }

    #[tokio::test]
    async fn mismatched_question_is_rejected() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        let err = f
            .engine
            .submit_answer(start.attempt_id, user, "a question we never asked", "a0")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));

        let attempt = f.attempts.get(start.attempt_id).await.unwrap().unwrap();
        assert!(attempt.transcript.is_empty());
    }

    #[tokio::test]
    async fn blank_answer_is_rejected() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();

        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        let err = f
            .engine
            .submit_answer(start.attempt_id, user, "q0", "   ")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn start_outside_time_window_fails() {
        let after_end = Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap();
        let f = fixture_at(two_question_settings(), InterviewStatus::Active, after_end);

        let err = f
            .engine
            .start_or_resume(f.interview_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeWindow(_)));
    }

    #[tokio::test]
    async fn start_on_inactive_interview_fails() {
        let f = fixture_at(two_question_settings(), InterviewStatus::Draft, mid_window());

        let err = f
            .engine
            .start_or_resume(f.interview_id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidTimeWindow(_)));
    }

    #[tokio::test]
    async fn start_on_unknown_interview_fails() {
        let f = fixture(two_question_settings());
        let err = f
            .engine
            .start_or_resume(Uuid::new_v4(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound("interview")));
    }

    #[tokio::test]
    async fn get_attempt_authorization_rules() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();
        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();

        let participant = Requester {
            id: user,
            role: Role::User,
        };
        let creator = Requester {
            id: f.creator_id,
            role: Role::User,
        };
        let admin = Requester {
            id: Uuid::new_v4(),
            role: Role::Admin,
        };
        let stranger = Requester {
            id: Uuid::new_v4(),
            role: Role::User,
        };

        assert!(f.engine.get_attempt(start.attempt_id, participant).await.is_ok());
        assert!(f.engine.get_attempt(start.attempt_id, creator).await.is_ok());
        assert!(f.engine.get_attempt(start.attempt_id, admin).await.is_ok());
        assert!(matches!(
            f.engine.get_attempt(start.attempt_id, stranger).await,
            Err(CoreError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn user_attempt_history_paginates_newest_first() {
        let f = fixture(InterviewSettings {
            max_attempts: 10,
            competency_dimensions: vec!["Communication".into()],
            questions_to_ask: 1,
            question_pool: vec!["q0".into()],
        });
        let user = Uuid::new_v4();

        let mut ids = Vec::new();
        for i in 0..3 {
            let mut attempt = Attempt::new(f.interview_id, user, f.now + chrono::Duration::minutes(i));
            attempt.status = AttemptStatus::Completed;
            ids.push(attempt.id);
            f.attempts.insert(attempt).await.unwrap();
        }

        let page = f.engine.list_user_attempts(user, 1, 2).await.unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.attempts.len(), 2);
        // Newest (last started) first.
        assert_eq!(page.attempts[0].id, ids[2]);

        let last = f.engine.list_user_attempts(user, 2, 2).await.unwrap();
        assert_eq!(last.attempts.len(), 1);
        assert_eq!(last.attempts[0].id, ids[0]);
    }

    #[tokio::test]
    async fn leaderboard_resolves_display_and_orders_scores() {
        let f = fixture(two_question_settings());
        let scores = [95u8, 60, 82];
        for (i, score) in scores.iter().enumerate() {
            let user = Uuid::new_v4();
            f.users.insert(
                user,
                UserDisplay {
                    username: format!("user{i}"),
                    nickname: None,
                    avatar_url: None,
                },
            );
            let mut attempt = Attempt::new(f.interview_id, user, f.now);
            attempt.status = AttemptStatus::Completed;
            attempt.result.completed_at = Some(f.now + chrono::Duration::minutes(i as i64));
            attempt.result.overall_score = Some(*score);
            f.attempts.insert(attempt).await.unwrap();
        }

        let board = f.engine.leaderboard(f.interview_id).await.unwrap();
        let ordered: Vec<u8> = board.iter().map(|e| e.overall_score).collect();
        assert_eq!(ordered, vec![95, 82, 60]);
        assert_eq!(board[0].username, "user0");

        let dist = f.engine.score_distribution(f.interview_id).await.unwrap();
        assert_eq!(dist.from_90, 1);
        assert_eq!(dist.from_80, 1);
        assert_eq!(dist.from_60, 1);
        assert_eq!(dist.below_60, 0);
        assert_eq!(dist.from_70, 0);
    }

    #[tokio::test]
    async fn dashboard_reports_totals() {
        let f = fixture(two_question_settings());
        let user = Uuid::new_v4();
        let start = f.engine.start_or_resume(f.interview_id, user).await.unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q0", "a0")
            .await
            .unwrap();
        f.engine
            .submit_answer(start.attempt_id, user, "q1", "a1")
            .await
            .unwrap();

        let dash = f.engine.dashboard(f.interview_id).await.unwrap();
        assert_eq!(dash.total_participants, 1);
        assert_eq!(dash.completed_attempts, 1);
    }
}
