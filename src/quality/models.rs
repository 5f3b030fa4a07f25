//! Data models for quality inspection.

use crate::inspect::TechnicalMetrics;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Three-level ordinal attached to every detected issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// A layout or aesthetic defect reported by the vision model for one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AestheticFinding {
    /// Index of the sampled frame within the video stream.
    pub frame_index: u64,
    /// Element with the problem (title, y_axis_label, equation, ...).
    pub element: String,
    /// What is wrong with it.
    pub problem: String,
    pub severity: Severity,
    /// Suggested repositioning or styling fix.
    pub remedy: String,
}

/// Objective defects detected from probed metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TechnicalDefect {
    TooShort,
    TooLong,
    LowResolution,
    LowFramerate,
    LargeFile,
    /// No frame of the video could be read for visual analysis.
    FrameExtractionFailed,
}

impl TechnicalDefect {
    pub fn tag(&self) -> &'static str {
        match self {
            TechnicalDefect::TooShort => "duration_too_short",
            TechnicalDefect::TooLong => "duration_too_long",
            TechnicalDefect::LowResolution => "low_resolution",
            TechnicalDefect::LowFramerate => "low_framerate",
            TechnicalDefect::LargeFile => "large_file_size",
            TechnicalDefect::FrameExtractionFailed => "frame_extraction_failed",
        }
    }
}

/// What kind of defect a [`QualityIssue`] describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IssueKind {
    Technical { defect: TechnicalDefect },
    Aesthetic { finding: AestheticFinding },
}

/// A normalized technical or aesthetic defect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityIssue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub description: String,
    pub remedy: String,
}

impl QualityIssue {
    pub fn technical(defect: TechnicalDefect, severity: Severity, description: String, remedy: &str) -> Self {
        Self {
            kind: IssueKind::Technical { defect },
            severity,
            description,
            remedy: remedy.to_string(),
        }
    }

    /// Wrap a vision finding, keeping its severity and remedy.
    pub fn aesthetic(finding: AestheticFinding) -> Self {
        let description = format!(
            "Frame {}: {} - {}",
            finding.frame_index, finding.element, finding.problem
        );
        Self {
            severity: finding.severity,
            remedy: finding.remedy.clone(),
            description,
            kind: IssueKind::Aesthetic { finding },
        }
    }

    /// Stable tag such as `low_resolution` or `aesthetic_title`.
    pub fn tag(&self) -> String {
        match &self.kind {
            IssueKind::Technical { defect } => defect.tag().to_string(),
            IssueKind::Aesthetic { finding } => format!(
                "aesthetic_{}",
                finding.element.to_lowercase().replace(' ', "_")
            ),
        }
    }

    pub fn is_technical(&self) -> bool {
        matches!(self.kind, IssueKind::Technical { .. })
    }

    pub fn is_aesthetic(&self) -> bool {
        matches!(self.kind, IssueKind::Aesthetic { .. })
    }

    pub fn is_defect(&self, defect: TechnicalDefect) -> bool {
        matches!(self.kind, IssueKind::Technical { defect: d } if d == defect)
    }
}

/// Discrete quality label derived from the score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Poor,
    Acceptable,
    Good,
    Excellent,
}

impl QualityTier {
    /// Thresholds: 90 excellent, 70 good, 50 acceptable.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            QualityTier::Excellent
        } else if score >= 70.0 {
            QualityTier::Good
        } else if score >= 50.0 {
            QualityTier::Acceptable
        } else {
            QualityTier::Poor
        }
    }
}

impl std::fmt::Display for QualityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QualityTier::Excellent => write!(f, "excellent"),
            QualityTier::Good => write!(f, "good"),
            QualityTier::Acceptable => write!(f, "acceptable"),
            QualityTier::Poor => write!(f, "poor"),
        }
    }
}

/// Complete quality analysis of one rendered artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityReport {
    pub artifact: PathBuf,
    pub tier: QualityTier,
    pub score: f64,
    pub metrics: TechnicalMetrics,
    pub issues: Vec<QualityIssue>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl QualityReport {
    /// Issues at the given severity.
    pub fn issues_with(&self, severity: Severity) -> impl Iterator<Item = &QualityIssue> {
        self.issues.iter().filter(move |i| i.severity == severity)
    }
}
