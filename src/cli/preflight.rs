//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::config::{GenerationProvider, Settings};
use crate::error::{ManimateError, Result};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Generation needs the model API key and the renderer.
    Generate,
    /// Full quality checks need ffprobe and ffmpeg.
    Check,
    /// Quick checks only stat files.
    QuickCheck,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation, settings: &Settings) -> Result<()> {
    match operation {
        Operation::Generate => {
            check_api_key(api_key_var(settings.generation.provider))?;
            check_tool(&settings.render.command)?;
        }
        Operation::Check => {
            check_tool("ffprobe")?;
            check_tool("ffmpeg")?;
        }
        Operation::QuickCheck => {}
    }
    Ok(())
}

/// Environment variable holding the key for a generation provider.
pub fn api_key_var(provider: GenerationProvider) -> &'static str {
    match provider {
        GenerationProvider::Anthropic => "ANTHROPIC_API_KEY",
        GenerationProvider::OpenAI => "OPENAI_API_KEY",
    }
}

fn check_api_key(var: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(ManimateError::Config(format!(
            "{var} is empty. Set it with: export {var}='...'"
        ))),
        Err(_) => Err(ManimateError::Config(format!(
            "{var} not set. Set it with: export {var}='...'"
        ))),
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), others use --version
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };
    match Command::new(name).arg(version_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(ManimateError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ManimateError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(ManimateError::ToolNotFound(format!("{}: {}", name, e))),
    }
}
