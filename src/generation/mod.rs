//! Generation requests and generated programs.

mod generator;

pub use generator::{visual_elements, ArtifactGenerator};

#[cfg(test)]
pub(crate) use generator::tests::FakeTextModel;

use crate::error::{ManimateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Audience level for an animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityTier {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
    Expert,
}

impl FromStr for ComplexityTier {
    type Err = ManimateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(ComplexityTier::Beginner),
            "intermediate" => Ok(ComplexityTier::Intermediate),
            "advanced" => Ok(ComplexityTier::Advanced),
            "expert" => Ok(ComplexityTier::Expert),
            other => Err(ManimateError::InvalidRequest(format!(
                "Complexity must be one of beginner, intermediate, advanced, expert (got '{other}')"
            ))),
        }
    }
}

impl fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComplexityTier::Beginner => write!(f, "beginner"),
            ComplexityTier::Intermediate => write!(f, "intermediate"),
            ComplexityTier::Advanced => write!(f, "advanced"),
            ComplexityTier::Expert => write!(f, "expert"),
        }
    }
}

/// Styling hints forwarded to the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StyleDirectives {
    /// Role name to color, e.g. `primary -> BLUE`.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub color_scheme: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_style: Option<String>,
}

impl StyleDirectives {
    pub fn is_empty(&self) -> bool {
        self.color_scheme.is_empty() && self.pacing.is_none() && self.visual_style.is_none()
    }
}

/// A moment the animation should emphasize, in seconds from the start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMarker {
    pub time_seconds: f64,
    pub label: String,
}

impl FromStr for SyncMarker {
    type Err = ManimateError;

    /// Parse `TIME:LABEL`, e.g. `4.5:show tangent`.
    fn from_str(s: &str) -> Result<Self> {
        let (time, label) = s.split_once(':').ok_or_else(|| {
            ManimateError::InvalidRequest(format!("Sync marker must be TIME:LABEL, got '{s}'"))
        })?;
        let time_seconds = time
            .trim()
            .parse::<f64>()
            .map_err(|e| ManimateError::InvalidRequest(format!("Bad sync marker time '{time}': {e}")))?;
        Ok(SyncMarker {
            time_seconds,
            label: label.trim().to_string(),
        })
    }
}

/// Everything the generator needs to write one animation program.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    concept: String,
    complexity: ComplexityTier,
    script_context: Option<String>,
    target_duration: Option<f64>,
    style: StyleDirectives,
    sync_markers: Vec<SyncMarker>,
}

impl GenerationRequest {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            complexity: ComplexityTier::default(),
            script_context: None,
            target_duration: None,
            style: StyleDirectives::default(),
            sync_markers: Vec::new(),
        }
    }

    pub fn with_complexity(mut self, complexity: ComplexityTier) -> Self {
        self.complexity = complexity;
        self
    }

    pub fn with_script_context(mut self, script: impl Into<String>) -> Self {
        self.script_context = Some(script.into());
        self
    }

    pub fn with_target_duration(mut self, seconds: f64) -> Self {
        self.target_duration = Some(seconds);
        self
    }

    pub fn with_style(mut self, style: StyleDirectives) -> Self {
        self.style = style;
        self
    }

    pub fn with_sync_markers(mut self, markers: Vec<SyncMarker>) -> Self {
        self.sync_markers = markers;
        self
    }

    /// Reject requests that must never reach a model.
    pub fn validate(&self) -> Result<()> {
        if self.concept.trim().is_empty() {
            return Err(ManimateError::InvalidRequest("Concept must not be empty".into()));
        }
        if let Some(d) = self.target_duration {
            if !d.is_finite() || d < 0.0 {
                return Err(ManimateError::InvalidRequest(format!(
                    "Target duration must be a non-negative number of seconds, got {d}"
                )));
            }
        }
        if let Some(m) = self
            .sync_markers
            .iter()
            .find(|m| !m.time_seconds.is_finite() || m.time_seconds < 0.0)
        {
            return Err(ManimateError::InvalidRequest(format!(
                "Sync marker '{}' has invalid time {}",
                m.label, m.time_seconds
            )));
        }
        Ok(())
    }

    pub fn concept(&self) -> &str {
        &self.concept
    }

    pub fn complexity(&self) -> ComplexityTier {
        self.complexity
    }

    pub fn script_context(&self) -> Option<&str> {
        self.script_context.as_deref()
    }

    pub fn target_duration(&self) -> Option<f64> {
        self.target_duration
    }

    pub fn style(&self) -> &StyleDirectives {
        &self.style
    }

    pub fn sync_markers(&self) -> &[SyncMarker] {
        &self.sync_markers
    }
}

/// Program text produced by the model for a concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedProgram {
    pub source: String,
    pub concept: String,
}
