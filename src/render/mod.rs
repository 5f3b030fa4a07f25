//! Rendering generated programs into video files.

mod manim;

pub use manim::{find_scene_name, truncate_chars, ManimRenderer};

use crate::error::Result;
use crate::generation::GeneratedProgram;
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest concept-derived prefix of an output name.
const MAX_SLUG_CHARS: usize = 30;

/// Outcome of one render attempt.
///
/// An artifact path exists exactly when the render succeeded, and a failure
/// reason exactly when it did not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    success: bool,
    artifact_path: Option<PathBuf>,
    render_duration: Duration,
    failure_reason: Option<String>,
}

impl RenderResult {
    pub fn succeeded(artifact_path: PathBuf, render_duration: Duration) -> Self {
        Self {
            success: true,
            artifact_path: Some(artifact_path),
            render_duration,
            failure_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>, render_duration: Duration) -> Self {
        Self {
            success: false,
            artifact_path: None,
            render_duration,
            failure_reason: Some(reason.into()),
        }
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn artifact_path(&self) -> Option<&Path> {
        self.artifact_path.as_deref()
    }

    pub fn render_duration(&self) -> Duration {
        self.render_duration
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }
}

/// Turns a generated program into a video file.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `program` to `<output_name>.mp4`.
    ///
    /// A failed render is an `Ok` result with a failure reason; `Err` is kept
    /// for problems that retrying generation cannot fix.
    async fn render(&self, program: &GeneratedProgram, output_name: &str) -> Result<RenderResult>;
}

/// Output name for a concept: a lowercase slug plus a short unique suffix.
pub fn output_name_for(concept: &str) -> String {
    let slug: String = concept
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(MAX_SLUG_CHARS)
        .collect();
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "animation" } else { slug };

    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{}_{}", slug, &id[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_result_invariants() {
        let ok = RenderResult::succeeded(PathBuf::from("animations/a.mp4"), Duration::from_secs(3));
        assert!(ok.success());
        assert!(ok.artifact_path().is_some());
        assert!(ok.failure_reason().is_none());

        let failed = RenderResult::failed("SyntaxError", Duration::from_secs(1));
        assert!(!failed.success());
        assert!(failed.artifact_path().is_none());
        assert_eq!(failed.failure_reason(), Some("SyntaxError"));
    }

    #[test]
    fn test_output_name_for() {
        let name = output_name_for("The Derivative of sin(x) as a Limit of Secants");
        let (slug, suffix) = name.rsplit_once('_').unwrap();
        assert_eq!(slug, "the_derivative_of_sin_x__as_a");
        assert_eq!(suffix.len(), 8);

        assert!(output_name_for("!!!").starts_with("animation_"));
        assert_ne!(output_name_for("pi"), output_name_for("pi"));
    }
}
