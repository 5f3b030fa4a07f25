//! Anthropic Messages API client over `reqwest`.

use super::TextModel;
use crate::error::{ManimateError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Text model backed by Claude.
pub struct AnthropicModel {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl AnthropicModel {
    /// Create a client using `ANTHROPIC_API_KEY` from the environment.
    pub fn from_env(model: &str, max_tokens: u32, temperature: f32, timeout: Duration) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                ManimateError::Config(
                    "ANTHROPIC_API_KEY not set. Set it with: export ANTHROPIC_API_KEY='sk-ant-...'"
                        .to_string(),
                )
            })?;
        Self::new(api_key, model, max_tokens, temperature, timeout)
    }

    /// Create a client with an explicit API key.
    pub fn new(
        api_key: String,
        model: &str,
        max_tokens: u32,
        temperature: f32,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ManimateError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }

    /// Point the client at a different API host.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn request_body(&self, system: &str, user: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": self.temperature,
            "system": system,
            "messages": [{ "role": "user", "content": user }],
        })
    }

    /// Concatenate the `text` blocks of a Messages API response.
    fn extract_text(response: &Value) -> Result<String> {
        if response.get("type").and_then(|t| t.as_str()) == Some("error") {
            let message = response
                .pointer("/error/message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown error");
            return Err(ManimateError::Transport(format!("Anthropic API error: {message}")));
        }

        let blocks = response
            .get("content")
            .and_then(|c| c.as_array())
            .ok_or_else(|| ManimateError::Transport("No content array in Anthropic response".into()))?;

        let text: String = blocks
            .iter()
            .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
            .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
            .collect();

        if text.trim().is_empty() {
            return Err(ManimateError::Transport("Empty response from Anthropic".into()));
        }
        Ok(text)
    }
}

#[async_trait]
impl TextModel for AnthropicModel {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let endpoint = format!("{}/v1/messages", self.base_url);
        debug!("POST {}", endpoint);

        let response = self
            .http
            .post(&endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.request_body(system, user))
            .send()
            .await
            .map_err(|e| ManimateError::Transport(format!("Anthropic request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ManimateError::Transport(format!("Anthropic response unreadable: {e}")))?;

        if !status.is_success() {
            let preview: String = body.chars().take(500).collect();
            return Err(ManimateError::Transport(format!(
                "Anthropic API returned {status}: {preview}"
            )));
        }

        let parsed: Value = serde_json::from_str(&body)
            .map_err(|e| ManimateError::Transport(format!("Invalid Anthropic response: {e}")))?;
        Self::extract_text(&parsed)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
