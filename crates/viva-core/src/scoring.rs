//! Asynchronous scoring pipeline.
//!
//! Launched when an attempt completes and never awaited by the submitting
//! request. The pipeline reloads the attempt, calls the assessment service
//! once, parses the free-text reply, and persists the report. Every failure
//! is contained here: it is logged and recorded in the attempt's
//! `scoring_status`, and the attempt keeps its completed state with an
//! unscored result.

use std::sync::Arc;

use uuid::Uuid;

use crate::assessment::{parse_assessment, ParsedAssessment, ScoringPolicy};
use crate::error::CoreError;
use crate::model::{AttemptStatus, ScoringStatus};
use crate::traits::{AssessmentRequest, Assessor, AttemptStore, InterviewStore};

/// Attempts re-made on a lost persistence race before giving up.
const PERSIST_RETRIES: u32 = 3;

/// Turns a completed transcript into a persisted score report.
pub struct ScoringPipeline {
    attempts: Arc<dyn AttemptStore>,
    interviews: Arc<dyn InterviewStore>,
    assessor: Arc<dyn Assessor>,
    policy: ScoringPolicy,
}

impl ScoringPipeline {
    pub fn new(
        attempts: Arc<dyn AttemptStore>,
        interviews: Arc<dyn InterviewStore>,
        assessor: Arc<dyn Assessor>,
        policy: ScoringPolicy,
    ) -> Self {
        Self {
            attempts,
            interviews,
            assessor,
            policy,
        }
    }

    /// Launch the pipeline for an attempt without awaiting it.
    pub fn dispatch(self: &Arc<Self>, attempt_id: Uuid) {
        let pipeline = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = pipeline.run(attempt_id).await {
                tracing::error!(%attempt_id, "scoring pipeline failed: {e}");
            }
        });
    }

    /// Run the pipeline for one attempt.
    ///
    /// Aborts silently if the attempt is missing, not completed, or already
    /// scored; those are expected races, not errors.
    pub async fn run(&self, attempt_id: Uuid) -> Result<(), CoreError> {
        let Some(attempt) = self.attempts.get(attempt_id).await? else {
            tracing::warn!(%attempt_id, "scoring skipped: attempt not found");
            return Ok(());
        };
        if attempt.status != AttemptStatus::Completed {
            tracing::warn!(%attempt_id, "scoring skipped: attempt not completed");
            return Ok(());
        }
        if attempt.is_scored() {
            tracing::debug!(%attempt_id, "scoring skipped: report already present");
            return Ok(());
        }

        let Some(interview) = self.interviews.get(attempt.interview_id).await? else {
            self.mark_failed(attempt_id).await;
            return Err(CoreError::Scoring(format!(
                "interview {} missing for attempt {attempt_id}",
                attempt.interview_id
            )));
        };

        let request = AssessmentRequest {
            dimensions: interview.settings.competency_dimensions.clone(),
            transcript: attempt.transcript.clone(),
        };

        // One call per completed attempt; no automatic retry.
        let reply = match self.assessor.assess(&request).await {
            Ok(reply) => reply,
            Err(e) => {
                self.mark_failed(attempt_id).await;
                return Err(CoreError::Scoring(format!(
                    "assessment call failed: {e:#}"
                )));
            }
        };

        let parsed = parse_assessment(&reply, &request.dimensions, &self.policy);
        self.persist(attempt_id, parsed).await?;

        tracing::info!(%attempt_id, "score report generated");
        Ok(())
    }

    /// Write the parsed report into the attempt, leaving timestamps intact.
    async fn persist(&self, attempt_id: Uuid, parsed: ParsedAssessment) -> Result<(), CoreError> {
        for _ in 0..PERSIST_RETRIES {
            let Some(mut attempt) = self.attempts.get(attempt_id).await? else {
                return Err(CoreError::Scoring(format!(
                    "attempt {attempt_id} vanished before report persistence"
                )));
            };
            let expected = attempt.version;
            attempt.result.overall_score = Some(parsed.overall_score);
            attempt.result.dimensional_scores = parsed.dimensional_scores.clone();
            attempt.result.comment = Some(parsed.comment.clone());
            attempt.scoring_status = ScoringStatus::Succeeded;

            match self.attempts.update(attempt, expected).await {
                Ok(()) => return Ok(()),
                Err(CoreError::Conflict(_)) => continue,
                Err(e) => return Err(e),
            }
        }
        self.mark_failed(attempt_id).await;
        Err(CoreError::Scoring(format!(
            "gave up persisting report for attempt {attempt_id} after repeated conflicts"
        )))
    }

    /// Best-effort terminal failure marker.
    async fn mark_failed(&self, attempt_id: Uuid) {
        for _ in 0..PERSIST_RETRIES {
            let Ok(Some(mut attempt)) = self.attempts.get(attempt_id).await else {
                return;
            };
            let expected = attempt.version;
            attempt.scoring_status = ScoringStatus::Failed;
            match self.attempts.update(attempt, expected).await {
                Ok(()) => return,
                Err(CoreError::Conflict(_)) => continue,
                Err(e) => {
                    tracing::warn!(%attempt_id, "could not record scoring failure: {e}");
                    return;
                }
            }
        }
        tracing::warn!(%attempt_id, "could not record scoring failure: repeated conflicts");
    }
}
