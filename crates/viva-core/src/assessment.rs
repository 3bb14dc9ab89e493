//! Assessment prompt rendering and defensive reply parsing.
//!
//! The assessment service replies in free-form natural language, so score
//! extraction is heuristic: labeled integers where we can find them,
//! policy defaults where we cannot. Parsing never fails; a malformed reply
//! degrades to defaulted scores and a truncated comment.

use serde::{Deserialize, Serialize};

use crate::model::{DimensionScore, QaPair};
use crate::traits::AssessmentRequest;

/// Policy constants for score extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Score assigned to a dimension whose label is absent from the reply.
    pub default_dimension_score: u8,
    /// Character budget for the narrative comment.
    pub comment_budget: usize,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            default_dimension_score: 75,
            comment_budget: 500,
        }
    }
}

/// Structured scores extracted from a free-text reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAssessment {
    pub overall_score: u8,
    /// One entry per requested dimension, in request order.
    pub dimensional_scores: Vec<DimensionScore>,
    pub comment: String,
}

/// System and user messages for the assessment call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentPrompt {
    pub system: String,
    pub user: String,
}

/// Labels accepted for an explicit overall score.
const OVERALL_LABELS: &[&str] = &["overall score", "total score", "总体得分", "总分"];

/// Labels that introduce the narrative section of a long reply.
const COMMENT_LABELS: &[&str] = &[
    "comprehensive evaluation",
    "overall evaluation",
    "综合评价",
    "评语",
];

/// Render the system/user message pair for an assessment request.
pub fn render_prompt(request: &AssessmentRequest) -> AssessmentPrompt {
    let system = format!(
        "You are a professional interview assessor. Based on the candidate's \
         answers, evaluate their performance on the following competency \
         dimensions: {}. Score each dimension from 0 to 100 and give an \
         overall evaluation. Be objective and professional, and point out \
         both strengths and areas to improve.",
        request.dimensions.join(", ")
    );

    let transcript = request
        .transcript
        .iter()
        .map(|qa: &QaPair| format!("Question: {}\nAnswer: {}", qa.question, qa.answer))
        .collect::<Vec<_>>()
        .join("\n\n");

    let user = format!(
        "Here is the interview transcript, please assess it:\n\n{transcript}\n\n\
         Please provide:\n\
         1. A score for each dimension, one per line as \"<dimension>: <score>\" (0-100)\n\
         2. An overall score as \"Overall score: <score>\" (0-100)\n\
         3. A comprehensive evaluation of roughly 300 words, introduced as \
         \"Comprehensive evaluation:\""
    );

    AssessmentPrompt { system, user }
}

/// Parse a free-text assessment reply into bounded numeric scores and a
/// narrative comment.
///
/// Per-dimension scores come from `"<dimension>[:：] <integer>"` matches
/// (ASCII case-insensitive, full-width colon accepted); unmatched dimensions
/// fall back to the policy default so no dimension is ever left unscored.
/// The overall score prefers an explicit label and otherwise is the rounded
/// mean of the per-dimension scores, defaulted ones included.
pub fn parse_assessment(
    reply: &str,
    dimensions: &[String],
    policy: &ScoringPolicy,
) -> ParsedAssessment {
    let dimensional_scores: Vec<DimensionScore> = dimensions
        .iter()
        .map(|dimension| DimensionScore {
            dimension: dimension.clone(),
            score: labeled_score(reply, dimension)
                .map(clamp_score)
                .unwrap_or(policy.default_dimension_score),
        })
        .collect();

    let overall_score = OVERALL_LABELS
        .iter()
        .find_map(|label| labeled_score(reply, label))
        .map(clamp_score)
        .unwrap_or_else(|| mean_score(&dimensional_scores, policy.default_dimension_score));

    let comment = extract_comment(reply, policy.comment_budget);

    ParsedAssessment {
        overall_score,
        dimensional_scores,
        comment,
    }
}

fn clamp_score(raw: u32) -> u8 {
    raw.min(100) as u8
}

fn mean_score(scores: &[DimensionScore], default: u8) -> u8 {
    if scores.is_empty() {
        return default;
    }
    let sum: u32 = scores.iter().map(|d| u32::from(d.score)).sum();
    (sum as f64 / scores.len() as f64).round() as u8
}

/// Find `label` (ASCII case-insensitive) followed by an ASCII or full-width
/// colon and an integer, and return the first such integer.
fn labeled_score(reply: &str, label: &str) -> Option<u32> {
    for start in label_occurrences(reply, label) {
        if let Some(score) = integer_after_colon(&reply[start + label.len()..]) {
            return Some(score);
        }
    }
    None
}

/// Find `label` followed by a colon and return everything after it, or the
/// colon-less remainder if the label ends the line.
fn labeled_section<'a>(reply: &'a str, label: &str) -> Option<&'a str> {
    for start in label_occurrences(reply, label) {
        let rest = reply[start + label.len()..].trim_start_matches([' ', '\t']);
        if let Some(section) = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：')) {
            return Some(section);
        }
    }
    None
}

/// Byte offsets of ASCII case-insensitive occurrences of `label` in `reply`.
fn label_occurrences<'a>(reply: &'a str, label: &'a str) -> impl Iterator<Item = usize> + 'a {
    let needle = label.as_bytes();
    reply.char_indices().map(|(i, _)| i).filter(move |&i| {
        i + needle.len() <= reply.len()
            && reply.is_char_boundary(i + needle.len())
            && reply.as_bytes()[i..i + needle.len()].eq_ignore_ascii_case(needle)
    })
}

fn integer_after_colon(rest: &str) -> Option<u32> {
    let rest = rest.trim_start_matches([' ', '\t']);
    let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：'))?;
    let rest = rest.trim_start_matches([' ', '\t']);
    let digits: &str = &rest[..rest
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .count()];
    if digits.is_empty() {
        None
    } else {
        digits.parse().ok()
    }
}

/// Pick the narrative comment: the whole reply if it fits the budget, else a
/// labeled evaluation section, else the trailing slice of the reply.
fn extract_comment(reply: &str, budget: usize) -> String {
    if reply.chars().count() <= budget {
        return reply.trim().to_string();
    }

    for label in COMMENT_LABELS {
        if let Some(section) = labeled_section(reply, label) {
            return section.trim().to_string();
        }
    }

    tail_chars(reply, budget).trim().to_string()
}

/// The last `n` characters of `s`, on a UTF-8 boundary.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let start = s
        .char_indices()
        .rev()
        .nth(n - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    &s[start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn parse(reply: &str, dimensions: &[String]) -> ParsedAssessment {
        parse_assessment(reply, dimensions, &ScoringPolicy::default())
    }

    #[test]
    fn matched_and_defaulted_dimensions_average_into_overall() {
        let parsed = parse("逻辑思维：85", &dims(&["逻辑思维", "沟通能力"]));
        assert_eq!(parsed.dimensional_scores[0].score, 85);
        assert_eq!(parsed.dimensional_scores[1].score, 75);
        assert_eq!(parsed.overall_score, 80);
    }

    #[test]
    fn explicit_overall_label_wins_over_mean() {
        let reply = "Communication: 90\nTeamwork: 50\nOverall score: 72";
        let parsed = parse(reply, &dims(&["Communication", "Teamwork"]));
        assert_eq!(parsed.overall_score, 72);
    }

    #[test]
    fn total_score_label_also_accepted() {
        let parsed = parse("Total score: 64", &dims(&["Communication"]));
        assert_eq!(parsed.overall_score, 64);
    }

    #[test]
    fn dimension_match_is_case_insensitive() {
        let parsed = parse("COMMUNICATION: 88", &dims(&["Communication"]));
        assert_eq!(parsed.dimensional_scores[0].score, 88);
    }

    #[test]
    fn ascii_and_fullwidth_colons_both_match() {
        let parsed = parse(
            "Communication： 70\nTeamwork: 60",
            &dims(&["Communication", "Teamwork"]),
        );
        assert_eq!(parsed.dimensional_scores[0].score, 70);
        assert_eq!(parsed.dimensional_scores[1].score, 60);
    }

    #[test]
    fn scores_above_100_are_clamped() {
        let parsed = parse("Communication: 250\nOverall score: 999", &dims(&["Communication"]));
        assert_eq!(parsed.dimensional_scores[0].score, 100);
        assert_eq!(parsed.overall_score, 100);
    }

    #[test]
    fn label_without_number_falls_back_to_default() {
        let parsed = parse("Communication: excellent", &dims(&["Communication"]));
        assert_eq!(parsed.dimensional_scores[0].score, 75);
        assert_eq!(parsed.overall_score, 75);
    }

    #[test]
    fn empty_reply_defaults_everything() {
        let parsed = parse("", &dims(&["A", "B", "C"]));
        assert!(parsed.dimensional_scores.iter().all(|d| d.score == 75));
        assert_eq!(parsed.overall_score, 75);
        assert!(parsed.comment.is_empty());
    }

    #[test]
    fn short_reply_used_verbatim_as_comment() {
        let reply = "Solid answers throughout. Communication: 82";
        let parsed = parse(reply, &dims(&["Communication"]));
        assert_eq!(parsed.comment, reply);
    }

    #[test]
    fn long_reply_prefers_labeled_evaluation_section() {
        let padding = "x".repeat(600);
        let reply = format!("{padding}\nComprehensive evaluation: strong candidate overall.");
        let parsed = parse(&reply, &dims(&["Communication"]));
        assert_eq!(parsed.comment, "strong candidate overall.");
    }

    #[test]
    fn long_unlabeled_reply_truncates_to_trailing_budget() {
        let reply = "a".repeat(400) + &"b".repeat(400);
        let parsed = parse(&reply, &dims(&["Communication"]));
        assert_eq!(parsed.comment.chars().count(), 500);
        assert!(parsed.comment.ends_with('b'));
    }

    #[test]
    fn truncation_respects_multibyte_boundaries() {
        let reply = "评".repeat(800);
        let parsed = parse(&reply, &dims(&["沟通能力"]));
        assert_eq!(parsed.comment.chars().count(), 500);
    }

    #[test]
    fn prompt_carries_dimensions_and_transcript() {
        let request = AssessmentRequest {
            dimensions: dims(&["Communication", "Teamwork"]),
            transcript: vec![QaPair {
                question: "Tell me about a conflict you resolved.".into(),
                answer: "We disagreed on rollout order and I proposed a canary.".into(),
            }],
        };
        let prompt = render_prompt(&request);
        assert!(prompt.system.contains("Communication, Teamwork"));
        assert!(prompt.user.contains("Tell me about a conflict"));
        assert!(prompt.user.contains("canary"));
    }
}
