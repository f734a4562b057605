//! OpenAI Chat Completions API client.

use serde::Deserialize;
use serde_json::json;

use crate::error::AnalyzeError;

use super::MAX_COMPLETION_TOKENS;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: &str, model: &str) -> Self {
        Self::with_base_url(http, DEFAULT_BASE_URL, api_key, model)
    }

    /// Point the client at a different API root (used by tests).
    #[must_use]
    pub fn with_base_url(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        model: &str,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// Send one prompt and return the first choice's content.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Http`] on transport or status failures, or
    /// [`AnalyzeError::EmptyCompletion`] if the reply has no content.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response: ChatResponse = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_COMPLETION_TOKENS,
                "messages": [{ "role": "user", "content": prompt }],
                "response_format": { "type": "json_object" },
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(AnalyzeError::EmptyCompletion)
    }
}
