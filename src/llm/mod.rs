//! Remote model clients used by the generator and the visual inspector.
//!
//! Both roles are traits so that the pipeline receives its clients by
//! construction and tests can substitute in-memory fakes.

mod anthropic;
mod openai;

pub use anthropic::AnthropicModel;
pub use openai::{OpenAiModel, OpenAiVisionModel};

use crate::config::{GenerationProvider, GenerationSettings, QualitySettings};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// A text-generation model: one system prompt, one user prompt, free-text reply.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// Send a single prompt pair and return the raw reply text.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    /// Model identifier, for logging.
    fn model_name(&self) -> &str;
}

/// A vision-capable model that answers an instruction about one still image.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Analyze a PNG-encoded image and return the raw reply text.
    async fn analyze_image(&self, instruction: &str, png: &[u8]) -> Result<String>;
}

/// Build the configured text-generation client.
pub fn create_text_model(settings: &GenerationSettings) -> Result<Arc<dyn TextModel>> {
    let timeout = Duration::from_secs(settings.timeout_seconds);
    let model: Arc<dyn TextModel> = match settings.provider {
        GenerationProvider::Anthropic => Arc::new(AnthropicModel::from_env(
            &settings.model,
            settings.max_tokens,
            settings.temperature,
            timeout,
        )?),
        GenerationProvider::OpenAI => Arc::new(OpenAiModel::with_config(
            &settings.model,
            settings.max_tokens,
            settings.temperature,
            timeout,
        )?),
    };
    Ok(model)
}

/// Build the vision client used for frame analysis.
pub fn create_vision_model(settings: &QualitySettings) -> Result<Arc<dyn VisionModel>> {
    Ok(Arc::new(OpenAiVisionModel::with_config(
        &settings.vision_model,
        settings.vision_max_tokens,
    )?))
}
