//! OpenAI-compatible assessment backend.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use viva_core::assessment::render_prompt;
use viva_core::traits::{AssessmentRequest, Assessor};

use crate::error::AssessorError;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MAX_TOKENS: u32 = 1000;
const TEMPERATURE: f64 = 0.7;

/// Assessment backend speaking the OpenAI chat-completions protocol.
pub struct OpenAiAssessor {
    api_key: String,
    base_url: String,
    model: String,
    timeout_secs: u64,
    client: reqwest::Client,
}

impl OpenAiAssessor {
    pub fn new(api_key: &str, base_url: &str, model: Option<String>) -> Self {
        Self::with_timeout(api_key, base_url, model, DEFAULT_TIMEOUT_SECS)
    }

    pub fn with_timeout(
        api_key: &str,
        base_url: &str,
        model: Option<String>,
        timeout_secs: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs,
            client,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<ChatMessage>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait]
impl Assessor for OpenAiAssessor {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model))]
    async fn assess(&self, request: &AssessmentRequest) -> anyhow::Result<String> {
        let prompt = render_prompt(request);

        let body = ChatRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system,
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user,
                },
            ],
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AssessorError::Timeout(self.timeout_secs)
                } else {
                    AssessorError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(AssessorError::AuthenticationFailed(body).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(AssessorError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ChatResponse = response.json().await.map_err(|e| {
            AssessorError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            }
        })?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        Ok(content)
    }
}
