//! Renderer backed by the Manim command-line tool.

use super::{RenderResult, Renderer};
use crate::config::RenderSettings;
use crate::error::{ManimateError, Result};
use crate::generation::GeneratedProgram;
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

const SCENE_PATTERN: &str = r"(?m)^\s*class\s+([A-Za-z_]\w*)\s*\([^)]*Scene[^)]*\)\s*:";

/// Name of the first Scene subclass declared in `source`.
pub fn find_scene_name(source: &str) -> Option<&str> {
    let pattern = Regex::new(SCENE_PATTERN).ok()?;
    pattern.captures(source).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// At most `max_chars` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Renders programs by running `manim` in a subprocess.
pub struct ManimRenderer {
    command: String,
    quality: String,
    disable_caching: bool,
    max_error_chars: usize,
    output_dir: PathBuf,
    temp_dir: PathBuf,
}

impl ManimRenderer {
    pub fn new(settings: &RenderSettings, output_dir: PathBuf, temp_dir: PathBuf) -> Self {
        Self {
            command: settings.command.clone(),
            quality: settings.quality.clone(),
            disable_caching: settings.disable_caching,
            max_error_chars: settings.max_error_chars,
            output_dir,
            temp_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    async fn write_program(&self, source: &str) -> Result<tempfile::NamedTempFile> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let file = tempfile::Builder::new()
            .prefix("scene_")
            .suffix(".py")
            .tempfile_in(&self.temp_dir)?;
        tokio::fs::write(file.path(), source).await?;
        Ok(file)
    }
}

#[async_trait]
impl Renderer for ManimRenderer {
    #[instrument(skip(self, program), fields(concept = %program.concept))]
    async fn render(&self, program: &GeneratedProgram, output_name: &str) -> Result<RenderResult> {
        let scene = find_scene_name(&program.source)
            .ok_or_else(|| ManimateError::NoEntryPoint(program.concept.clone()))?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        // Removed on drop, whichever way this function returns.
        let script = self.write_program(&program.source).await?;
        let file_name = format!("{output_name}.mp4");

        let mut cmd = Command::new(&self.command);
        cmd.arg(format!("-q{}", self.quality));
        if self.disable_caching {
            cmd.arg("--disable_caching");
        }
        cmd.arg("--output_file").arg(&file_name)
            .arg("--media_dir").arg(&self.output_dir)
            .arg(script.path())
            .arg(scene)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        info!("Rendering scene {} to {}", scene, file_name);
        let started = Instant::now();
        let result = cmd.output().await;
        let elapsed = started.elapsed();

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManimateError::ToolNotFound(self.command.clone()));
            }
            Err(e) => {
                return Err(ManimateError::ToolFailed(format!("{} execution failed: {e}", self.command)));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let reason = if stderr.is_empty() {
                format!("{} exited with {}", self.command, output.status)
            } else {
                truncate_chars(stderr, self.max_error_chars).to_string()
            };
            warn!("Render failed after {:.1}s", elapsed.as_secs_f64());
            return Ok(RenderResult::failed(reason, elapsed));
        }

        let search_dir = self.output_dir.clone();
        let search_name = file_name.clone();
        let found = tokio::task::spawn_blocking(move || find_file(&search_dir, &search_name))
            .await
            .map_err(|e| ManimateError::ToolFailed(format!("Output search failed: {e}")))?;

        let Some(artifact) = found else {
            warn!("{} not found under {}", file_name, self.output_dir.display());
            return Ok(RenderResult::failed(
                format!(
                    "{} exited successfully but {} was not found under {}",
                    self.command,
                    file_name,
                    self.output_dir.display()
                ),
                elapsed,
            ));
        };

        debug!("Rendered {} in {:.1}s", artifact.display(), elapsed.as_secs_f64());
        Ok(RenderResult::succeeded(artifact, elapsed))
    }
}

/// Depth-first search for a file named `name` below `dir`.
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    let entries = std::fs::read_dir(dir).ok()?;
    let mut subdirs = Vec::new();

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_string_lossy() == name {
            return Some(path);
        }
    }

    subdirs.sort();
    subdirs.iter().find_map(|sub| find_file(sub, name))
}
