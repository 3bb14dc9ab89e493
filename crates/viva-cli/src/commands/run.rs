//! `viva run` — simulate attempts against an interview definition.
//!
//! Loads an interview and a set of scripted candidates, runs each candidate
//! through the full attempt lifecycle, waits for the background score
//! reports, and prints the dashboard.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use comfy_table::Table;
use serde::Deserialize;
use uuid::Uuid;

use viva_assessor::{create_assessor, load_config, MockAssessor};
use viva_core::assessment::ScoringPolicy;
use viva_core::engine::{AttemptEngine, SubmitOutcome};
use viva_core::memory::{InMemoryAttemptStore, InMemoryInterviewStore, InMemoryUserStore};
use viva_core::model::{Attempt, Requester, Role, ScoringStatus, UserDisplay};
use viva_core::parser::{parse_interview, validate_interview};
use viva_core::traits::{Assessor, SystemClock};

/// How long to wait for a background score report before giving up.
const REPORT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct CandidateFile {
    #[serde(default)]
    candidates: Vec<CandidateSpec>,
}

#[derive(Debug, Deserialize)]
struct CandidateSpec {
    username: String,
    #[serde(default)]
    nickname: Option<String>,
    answers: Vec<String>,
    /// Scripted evaluation the mock assessor returns for this candidate.
    #[serde(default)]
    reply: Option<String>,
}

pub async fn execute(
    interview_path: PathBuf,
    candidates_path: PathBuf,
    assessor_kind: String,
    config: Option<PathBuf>,
) -> Result<()> {
    let interview = parse_interview(&interview_path)?;
    for warning in validate_interview(&interview) {
        tracing::warn!("{}", warning.message);
    }

    let candidates = load_candidates(&candidates_path)?;
    if candidates.is_empty() {
        anyhow::bail!("no candidates defined in {}", candidates_path.display());
    }

    let assessor = build_assessor(&assessor_kind, &candidates, config.as_deref())?;

    let interviews = Arc::new(InMemoryInterviewStore::new());
    let attempts = Arc::new(InMemoryAttemptStore::new());
    let users = Arc::new(InMemoryUserStore::new());

    let interview_id = interview.id;
    interviews.insert(interview);

    let mut user_ids = Vec::new();
    for candidate in &candidates {
        let user_id = Uuid::new_v4();
        users.insert(
            user_id,
            UserDisplay {
                username: candidate.username.clone(),
                nickname: candidate.nickname.clone(),
                avatar_url: None,
            },
        );
        user_ids.push(user_id);
    }

    let engine = AttemptEngine::new(
        interviews,
        attempts,
        users,
        assessor,
        Arc::new(SystemClock),
        ScoringPolicy::default(),
    );

    let admin = Requester {
        id: Uuid::new_v4(),
        role: Role::Admin,
    };

    for (candidate, &user_id) in candidates.iter().zip(&user_ids) {
        if candidate.answers.is_empty() {
            anyhow::bail!("candidate '{}' has no answers", candidate.username);
        }

        println!("== {} ==", candidate.username);
        let start = engine.start_or_resume(interview_id, user_id).await?;
        let mut question = start.question;
        let mut index = 0usize;

        loop {
            let answer = &candidate.answers[index % candidate.answers.len()];
            println!("Q: {question}");
            println!("A: {answer}");
            match engine
                .submit_answer(start.attempt_id, user_id, &question, answer)
                .await?
            {
                SubmitOutcome::Next { question: next } => {
                    question = next;
                    index += 1;
                }
                SubmitOutcome::Completed => break,
            }
        }

        let attempt = await_report(&engine, start.attempt_id, admin).await?;
        print_report(&candidate.username, &attempt);
    }

    print_dashboard(&engine, interview_id).await?;
    Ok(())
}

fn load_candidates(path: &Path) -> Result<Vec<CandidateSpec>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read candidates file: {}", path.display()))?;
    let file: CandidateFile = toml::from_str(&content)
        .with_context(|| format!("failed to parse TOML: {}", path.display()))?;
    Ok(file.candidates)
}

fn build_assessor(
    kind: &str,
    candidates: &[CandidateSpec],
    config: Option<&Path>,
) -> Result<Arc<dyn Assessor>> {
    match kind {
        "mock" => {
            // Key scripted replies on each candidate's first answer so the
            // mock can tell candidates apart.
            let mut replies = HashMap::new();
            for candidate in candidates {
                if let (Some(reply), Some(first)) = (&candidate.reply, candidate.answers.first())
                {
                    replies.insert(first.clone(), reply.clone());
                }
            }
            Ok(Arc::new(MockAssessor::new(replies)))
        }
        "openai" => {
            let config = load_config(config)?;
            Ok(Arc::from(create_assessor(&config)?))
        }
        other => anyhow::bail!("unknown assessor backend: {other} (expected mock or openai)"),
    }
}

/// Poll until the attempt's scoring reaches a terminal status.
async fn await_report(
    engine: &AttemptEngine,
    attempt_id: Uuid,
    requester: Requester,
) -> Result<Attempt> {
    let deadline = Instant::now() + REPORT_TIMEOUT;
    loop {
        let attempt = engine.get_attempt(attempt_id, requester).await?;
        if attempt.scoring_status != ScoringStatus::Pending {
            return Ok(attempt);
        }
        if Instant::now() > deadline {
            tracing::warn!(%attempt_id, "score report still pending after timeout");
            return Ok(attempt);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

fn print_report(username: &str, attempt: &Attempt) {
    match attempt.scoring_status {
        ScoringStatus::Succeeded => {
            let mut table = Table::new();
            table.set_header(vec!["Dimension", "Score"]);
            for entry in &attempt.result.dimensional_scores {
                table.add_row(vec![entry.dimension.clone(), entry.score.to_string()]);
            }
            if let Some(overall) = attempt.result.overall_score {
                table.add_row(vec!["Overall".to_string(), overall.to_string()]);
            }
            println!("{table}");
            if let Some(comment) = &attempt.result.comment {
                if !comment.is_empty() {
                    println!("{comment}");
                }
            }
        }
        ScoringStatus::Failed => println!("Score report failed for {username}"),
        ScoringStatus::Pending => println!("Score report still pending for {username}"),
    }
    println!();
}

async fn print_dashboard(engine: &AttemptEngine, interview_id: Uuid) -> Result<()> {
    let dashboard = engine.dashboard(interview_id).await?;

    println!("Leaderboard");
    let mut board = Table::new();
    board.set_header(vec!["#", "Candidate", "Score", "Completed"]);
    for (rank, entry) in dashboard.leaderboard.iter().enumerate() {
        let completed = entry
            .completed_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default();
        board.add_row(vec![
            (rank + 1).to_string(),
            entry.username.clone(),
            entry.overall_score.to_string(),
            completed,
        ]);
    }
    println!("{board}");

    println!("Score distribution");
    let dist = &dashboard.score_distribution;
    let mut histogram = Table::new();
    histogram.set_header(vec!["Range", "Attempts"]);
    histogram.add_row(vec!["0-60".to_string(), dist.below_60.to_string()]);
    histogram.add_row(vec!["60-70".to_string(), dist.from_60.to_string()]);
    histogram.add_row(vec!["70-80".to_string(), dist.from_70.to_string()]);
    histogram.add_row(vec!["80-90".to_string(), dist.from_80.to_string()]);
    histogram.add_row(vec!["90-100".to_string(), dist.from_90.to_string()]);
    println!("{histogram}");

    println!(
        "{} participant(s), {} completed attempt(s)",
        dashboard.total_participants, dashboard.completed_attempts
    );
    Ok(())
}
