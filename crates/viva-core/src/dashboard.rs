//! Dashboard read aggregations: leaderboard ranking and score histogram.
//!
//! Pure functions over completed attempts; the engine layers user-display
//! lookup on top.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Attempt;

/// One ranked row before display metadata is attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedAttempt {
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub overall_score: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

/// A leaderboard row with resolved display identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub attempt_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub overall_score: u8,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counts of scored attempts per fixed score range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    #[serde(rename = "0-60")]
    pub below_60: u32,
    #[serde(rename = "60-70")]
    pub from_60: u32,
    #[serde(rename = "70-80")]
    pub from_70: u32,
    #[serde(rename = "80-90")]
    pub from_80: u32,
    #[serde(rename = "90-100")]
    pub from_90: u32,
}

/// Rank scored attempts descending by overall score. Ties break on earlier
/// `completed_at` first, so a score reached sooner outranks the same score
/// reached later.
pub fn rank(attempts: &[Attempt]) -> Vec<RankedAttempt> {
    let mut ranked: Vec<RankedAttempt> = attempts
        .iter()
        .filter_map(|a| {
            a.result.overall_score.map(|score| RankedAttempt {
                attempt_id: a.id,
                user_id: a.user_id,
                overall_score: score,
                completed_at: a.result.completed_at,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.overall_score
            .cmp(&a.overall_score)
            .then_with(|| a.completed_at.cmp(&b.completed_at))
    });
    ranked
}

/// Bucket scored attempts into the five fixed display ranges.
pub fn distribution(attempts: &[Attempt]) -> ScoreDistribution {
    let mut dist = ScoreDistribution::default();
    for attempt in attempts {
        let Some(score) = attempt.result.overall_score else {
            continue;
        };
        match score {
            0..=59 => dist.below_60 += 1,
            60..=69 => dist.from_60 += 1,
            70..=79 => dist.from_70 += 1,
            80..=89 => dist.from_80 += 1,
            _ => dist.from_90 += 1,
        }
    }
    dist
}
