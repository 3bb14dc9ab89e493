//! Mock assessor for testing and offline simulation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use viva_core::traits::{AssessmentRequest, Assessor};

/// A mock assessment backend that returns configurable replies without any
/// network call.
///
/// Replies are matched by substring against the transcript's answers, so a
/// simulation can script a distinct evaluation per candidate.
pub struct MockAssessor {
    /// Map of answer substring -> reply text.
    replies: HashMap<String, String>,
    /// Reply used when nothing matches.
    default_reply: String,
    /// Number of calls made.
    call_count: AtomicU32,
    /// Last request received.
    last_request: Mutex<Option<AssessmentRequest>>,
}

impl MockAssessor {
    /// Create a mock with the given answer-substring -> reply mappings.
    pub fn new(replies: HashMap<String, String>) -> Self {
        Self {
            replies,
            default_reply: String::new(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Create a mock that always returns the same reply.
    pub fn with_fixed_reply(reply: &str) -> Self {
        Self {
            replies: HashMap::new(),
            default_reply: reply.to_string(),
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    /// Number of calls made to this assessor.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// The last request made to this assessor.
    pub fn last_request(&self) -> Option<AssessmentRequest> {
        self.last_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl Assessor for MockAssessor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_request.lock().unwrap() = Some(request.clone());

        let reply = self
            .replies
            .iter()
            .find(|(key, _)| {
                request
                    .transcript
                    .iter()
                    .any(|qa| qa.answer.contains(key.as_str()))
            })
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.default_reply.clone());

        Ok(reply)
    }
}
