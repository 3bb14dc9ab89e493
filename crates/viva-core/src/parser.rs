//! TOML interview definition parser.
//!
//! Loads interview configurations from TOML files and validates them.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::model::{InterviewConfig, InterviewSettings, InterviewStatus};

/// Intermediate TOML structure for parsing interview definition files.
#[derive(Debug, Deserialize)]
struct TomlInterviewFile {
    interview: TomlInterview,
}

#[derive(Debug, Deserialize)]
struct TomlInterview {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default = "default_status")]
    status: String,
    start_time: String,
    end_time: String,
    #[serde(default)]
    settings: TomlSettings,
}

#[derive(Debug, Deserialize)]
struct TomlSettings {
    #[serde(default = "default_max_attempts")]
    max_attempts: u32,
    #[serde(default = "default_questions_to_ask")]
    questions_to_ask: usize,
    #[serde(default = "default_dimensions")]
    competency_dimensions: Vec<String>,
    #[serde(default)]
    question_pool: Vec<String>,
}

impl Default for TomlSettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            questions_to_ask: default_questions_to_ask(),
            competency_dimensions: default_dimensions(),
            question_pool: Vec::new(),
        }
    }
}

fn default_status() -> String {
    "active".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_questions_to_ask() -> usize {
    5
}

fn default_dimensions() -> Vec<String> {
    [
        "Logical Thinking",
        "Communication",
        "Teamwork",
        "Technical Depth",
        "Composure Under Pressure",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Parse a single TOML file into an `InterviewConfig`.
pub fn parse_interview(path: &Path) -> Result<InterviewConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read interview definition: {}", path.display()))?;

    parse_interview_str(&content, path)
}

/// Parse a TOML string into an `InterviewConfig` (useful for testing).
pub fn parse_interview_str(content: &str, source_path: &Path) -> Result<InterviewConfig> {
    let parsed: TomlInterviewFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let status: InterviewStatus = parsed
        .interview
        .status
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}", e))?;

    let start_time = parse_timestamp(&parsed.interview.start_time, "start_time")?;
    let end_time = parse_timestamp(&parsed.interview.end_time, "end_time")?;

    Ok(InterviewConfig {
        id: Uuid::new_v4(),
        title: parsed.interview.title,
        description: parsed.interview.description,
        creator_id: Uuid::new_v4(),
        status,
        start_time,
        end_time,
        participant_count: 0,
        settings: InterviewSettings {
            max_attempts: parsed.interview.settings.max_attempts,
            competency_dimensions: parsed.interview.settings.competency_dimensions,
            questions_to_ask: parsed.interview.settings.questions_to_ask,
            question_pool: parsed.interview.settings.question_pool,
        },
    })
}

fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("{field} is not an RFC 3339 timestamp: {value}"))
}

/// A warning from interview definition validation.
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub message: String,
}

/// Validate an interview definition for common issues.
pub fn validate_interview(interview: &InterviewConfig) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    if interview.settings.question_pool.is_empty() {
        warnings.push(ValidationWarning {
            message: "question pool is empty; attempts cannot be started".into(),
        });
    }

    if interview.settings.questions_to_ask > interview.settings.question_pool.len() {
        warnings.push(ValidationWarning {
            message: format!(
                "questions_to_ask ({}) exceeds the question pool ({}); the pool length caps each attempt",
                interview.settings.questions_to_ask,
                interview.settings.question_pool.len()
            ),
        });
    }

    if interview.settings.questions_to_ask == 0 {
        warnings.push(ValidationWarning {
            message: "questions_to_ask is zero".into(),
        });
    }

    if interview.settings.max_attempts == 0 {
        warnings.push(ValidationWarning {
            message: "max_attempts is zero; no user can ever complete an attempt".into(),
        });
    }

    if interview.settings.competency_dimensions.is_empty() {
        warnings.push(ValidationWarning {
            message: "no competency dimensions configured; reports will carry no axes".into(),
        });
    }

    if interview.end_time <= interview.start_time {
        warnings.push(ValidationWarning {
            message: "end_time is not after start_time".into(),
        });
    }

    for question in &interview.settings.question_pool {
        if question.trim().is_empty() {
            warnings.push(ValidationWarning {
                message: "question pool contains an empty question".into(),
            });
        }
    }

    warnings
}
