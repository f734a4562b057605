//! Anthropic Messages API client.

use serde::Deserialize;
use serde_json::json;

use crate::error::AnalyzeError;

use super::MAX_COMPLETION_TOKENS;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Clone)]
pub struct ClaudeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ClaudeClient {
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

    /// Send one prompt and return the first text block of the reply.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Http`] on transport or status failures, or
    /// [`AnalyzeError::EmptyCompletion`] if the reply has no text block.
    pub async fn generate(&self, prompt: &str) -> Result<String, AnalyzeError> {
        let url = format!("{}/v1/messages", self.base_url);
        let response: MessagesResponse = self
            .http
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": MAX_COMPLETION_TOKENS,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .map(|block| block.text)
            .ok_or(AnalyzeError::EmptyCompletion)
    }
}
