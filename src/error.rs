//! Error types for Manimate.

use thiserror::Error;

/// Library-level error type for Manimate operations.
#[derive(Error, Debug)]
pub enum ManimateError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Model transport error: {0}")]
    Transport(String),

    #[error("No renderable Scene class found in generated program for '{0}'")]
    NoEntryPoint(String),

    #[error("Render failed: {0}")]
    RenderFailure(String),

    #[error("Probe unavailable: {0}")]
    ProbeUnavailable(String),

    #[error("Visual analysis failed: {0}")]
    VisionAnalysis(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}

/// Result type alias for Manimate operations.
pub type Result<T> = std::result::Result<T, ManimateError>;
