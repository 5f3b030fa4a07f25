//! OpenAI chat and vision clients.

use super::{TextModel, VisionModel};
use crate::error::{ManimateError, Result};
use crate::openai::create_client_with_timeout;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    ImageDetail, ImageUrlArgs,
};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, instrument};

type OpenAiClient = async_openai::Client<async_openai::config::OpenAIConfig>;

fn build_error(e: impl std::fmt::Display) -> ManimateError {
    ManimateError::Config(format!("Failed to build request: {}", e))
}

fn first_content(response: CreateChatCompletionResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ManimateError::Transport("Empty response from OpenAI".to_string()))
}

/// Text model backed by OpenAI chat completions.
pub struct OpenAiModel {
    client: OpenAiClient,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiModel {
    pub fn with_config(model: &str, max_tokens: u32, temperature: f32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(timeout)?,
            model: model.to_string(),
            max_tokens,
            temperature,
        })
    }
}

#[async_trait]
impl TextModel for OpenAiModel {
    #[instrument(skip(self, system, user), fields(model = %self.model))]
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system)
                .build()
                .map_err(build_error)?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user)
                .build()
                .map_err(build_error)?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(self.temperature)
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ManimateError::Transport(format!("{} API error: {}", self.model, e)))?;

        first_content(response)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Vision model backed by an OpenAI multimodal chat model.
pub struct OpenAiVisionModel {
    client: OpenAiClient,
    model: String,
    max_tokens: u32,
}

impl OpenAiVisionModel {
    pub fn with_config(model: &str, max_tokens: u32) -> Result<Self> {
        Ok(Self {
            client: create_client_with_timeout(Duration::from_secs(60))?,
            model: model.to_string(),
            max_tokens,
        })
    }
}

/// Encode PNG bytes as a `data:` URL.
pub(crate) fn png_data_url(png: &[u8]) -> String {
    format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    )
}

#[async_trait]
impl VisionModel for OpenAiVisionModel {
    #[instrument(skip(self, instruction, png), fields(model = %self.model, bytes = png.len()))]
    async fn analyze_image(&self, instruction: &str, png: &[u8]) -> Result<String> {
        debug!("Sending frame for visual analysis");

        let parts: Vec<ChatCompletionRequestUserMessageContentPart> = vec![
            ChatCompletionRequestMessageContentPartTextArgs::default()
                .text(instruction)
                .build()
                .map_err(build_error)?
                .into(),
            ChatCompletionRequestMessageContentPartImageArgs::default()
                .image_url(
                    ImageUrlArgs::default()
                        .url(png_data_url(png))
                        .detail(ImageDetail::Auto)
                        .build()
                        .map_err(build_error)?,
                )
                .build()
                .map_err(build_error)?
                .into(),
        ];

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(parts)
            .build()
            .map_err(build_error)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(vec![ChatCompletionRequestMessage::from(message)])
            .max_completion_tokens(self.max_tokens)
            .build()
            .map_err(build_error)?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| ManimateError::Transport(format!("{} vision error: {}", self.model, e)))?;

        first_content(response).map_err(|_| ManimateError::VisionAnalysis("Empty reply for frame".to_string()))
    }
}
