//! Configuration module for Manimate.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GenerationPrompts, Prompts, VisionPrompts};
pub use settings::{
    GeneralSettings, GenerationProvider, GenerationSettings, PromptSettings, QualitySettings,
    RenderSettings, Settings,
};
