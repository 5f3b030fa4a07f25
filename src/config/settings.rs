//! Configuration settings for Manimate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub generation: GenerationSettings,
    pub render: RenderSettings,
    pub quality: QualitySettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory that rendered animations are written to.
    pub output_dir: String,
    /// Directory for temporary files (generated scripts and extracted frames).
    pub temp_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            output_dir: "animations".to_string(),
            temp_dir: "/tmp/manimate".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Text-generation provider used to write Manim programs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    /// Anthropic Messages API (default).
    #[default]
    Anthropic,
    /// OpenAI chat completions.
    OpenAI,
}

impl std::str::FromStr for GenerationProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(GenerationProvider::Anthropic),
            "openai" | "gpt" => Ok(GenerationProvider::OpenAI),
            _ => Err(format!("Unknown generation provider: {}", s)),
        }
    }
}

impl std::fmt::Display for GenerationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationProvider::Anthropic => write!(f, "anthropic"),
            GenerationProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Program generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    /// Provider (anthropic, openai).
    pub provider: GenerationProvider,
    /// Model used to write Manim code.
    pub model: String,
    /// Maximum tokens in a generated program.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::Anthropic,
            model: "claude-3-5-sonnet-20241022".to_string(),
            max_tokens: 4000,
            temperature: 0.2,
            timeout_seconds: 120,
        }
    }
}

/// Manim render settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Render executable.
    pub command: String,
    /// Quality preset letter (l, m, h, p, k), passed as `-q<preset>`.
    pub quality: String,
    /// Pass `--disable_caching` to the renderer.
    pub disable_caching: bool,
    /// Maximum characters of renderer stderr kept as the failure reason.
    pub max_error_chars: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            command: "manim".to_string(),
            quality: "m".to_string(),
            disable_caching: true,
            max_error_chars: 2000,
        }
    }
}

/// Quality inspection thresholds and vision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualitySettings {
    /// Run the quality check after a successful render.
    pub enabled: bool,
    /// Run the vision-model frame analysis.
    pub visual_check: bool,
    /// Shortest acceptable video, in seconds.
    pub min_duration_seconds: f64,
    /// Longest acceptable video, in seconds.
    pub max_duration_seconds: f64,
    /// Upper bound of the duration range that earns a score bonus.
    pub bonus_max_duration_seconds: f64,
    /// Minimum width in pixels.
    pub min_width: u32,
    /// Minimum height in pixels.
    pub min_height: u32,
    /// Target frame rate.
    pub target_fps: f64,
    /// Size above which a file is flagged as large, in megabytes.
    pub max_file_size_mb: f64,
    /// Number of frames sampled for visual analysis.
    pub sample_frames: usize,
    /// Vision-capable model for frame analysis.
    pub vision_model: String,
    /// Maximum tokens per frame analysis.
    pub vision_max_tokens: u32,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            visual_check: true,
            min_duration_seconds: 3.0,
            max_duration_seconds: 300.0,
            bonus_max_duration_seconds: 60.0,
            min_width: 640,
            min_height: 480,
            target_fps: 30.0,
            max_file_size_mb: 100.0,
            sample_frames: 5,
            vision_model: "gpt-4o-mini".to_string(),
            vision_max_tokens: 300,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default configuration file.
    pub fn save(&self) -> crate::error::Result<()> {
        self.save_to(&Self::default_config_path())
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::ManimateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("manimate")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded output directory path.
    pub fn output_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.output_dir)
    }

    /// Get the expanded temp directory path.
    pub fn temp_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.temp_dir)
    }
}
