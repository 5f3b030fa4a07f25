//! Technical inspection of rendered videos with ffprobe.

use crate::config::QualitySettings;
use crate::error::{ManimateError, Result};
use crate::quality::{QualityIssue, Severity, TechnicalDefect};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Objective properties of a rendered video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoMetrics {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub size_bytes: u64,
    pub codec: String,
    pub bitrate: u64,
    /// Frames in the video stream, counted or estimated from duration.
    pub frame_count: u64,
}

impl VideoMetrics {
    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / BYTES_PER_MB
    }
}

/// Probe outcome: metrics, or a marker saying why there are none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TechnicalMetrics {
    Probed(VideoMetrics),
    Unavailable { reason: String },
}

impl TechnicalMetrics {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        TechnicalMetrics::Unavailable { reason: reason.into() }
    }

    pub fn video(&self) -> Option<&VideoMetrics> {
        match self {
            TechnicalMetrics::Probed(m) => Some(m),
            TechnicalMetrics::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.video().is_some()
    }

    /// The probed metrics, or [`ManimateError::ProbeUnavailable`] with the reason.
    pub fn require(&self) -> Result<&VideoMetrics> {
        match self {
            TechnicalMetrics::Probed(m) => Ok(m),
            TechnicalMetrics::Unavailable { reason } => Err(ManimateError::ProbeUnavailable(reason.clone())),
        }
    }
}

/// Thresholds for technical defect detection and score bonuses.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityThresholds {
    pub min_duration: f64,
    pub max_duration: f64,
    pub bonus_max_duration: f64,
    pub min_width: u32,
    pub min_height: u32,
    pub target_fps: f64,
    pub max_size_mb: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self::from(&QualitySettings::default())
    }
}

impl From<&QualitySettings> for QualityThresholds {
    fn from(settings: &QualitySettings) -> Self {
        Self {
            min_duration: settings.min_duration_seconds,
            max_duration: settings.max_duration_seconds,
            bonus_max_duration: settings.bonus_max_duration_seconds,
            min_width: settings.min_width,
            min_height: settings.min_height,
            target_fps: settings.target_fps,
            max_size_mb: settings.max_file_size_mb,
        }
    }
}

/// Something that can measure a video file.
#[async_trait]
pub trait MetricsProbe: Send + Sync {
    /// Never fails: problems are reported as [`TechnicalMetrics::Unavailable`].
    async fn probe(&self, path: &Path) -> TechnicalMetrics;
}

/// [`MetricsProbe`] backed by the `ffprobe` command.
pub struct Ffprobe {
    program: String,
}

impl Ffprobe {
    pub fn new() -> Self {
        Self::with_program("ffprobe")
    }

    pub fn with_program(program: &str) -> Self {
        Self { program: program.to_string() }
    }
}

impl Default for Ffprobe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetricsProbe for Ffprobe {
    #[instrument(skip(self), fields(path = %path.display()))]
    async fn probe(&self, path: &Path) -> TechnicalMetrics {
        if !path.exists() {
            return TechnicalMetrics::unavailable("Video file not found");
        }

        let result = Command::new(&self.program)
            .arg("-v").arg("quiet")
            .arg("-print_format").arg("json")
            .arg("-show_format")
            .arg("-show_streams")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("{} not found, technical metrics unavailable", self.program);
                return TechnicalMetrics::unavailable(format!("{} not found", self.program));
            }
            Err(e) => {
                return TechnicalMetrics::unavailable(format!("{} failed to start: {e}", self.program));
            }
        };

        if !output.status.success() {
            warn!("{} could not read the file", self.program);
            return TechnicalMetrics::unavailable(format!("{} returned {}", self.program, output.status));
        }

        match parse_ffprobe_json(&String::from_utf8_lossy(&output.stdout)) {
            Ok(metrics) => {
                debug!(
                    "Probed {}x{} @ {:.2}fps, {:.1}s",
                    metrics.width, metrics.height, metrics.fps, metrics.duration_seconds
                );
                TechnicalMetrics::Probed(metrics)
            }
            Err(reason) => {
                warn!("Unparseable probe output: {}", reason);
                TechnicalMetrics::unavailable(reason)
            }
        }
    }
}

/// Parse a frame rate fraction such as `30000/1001`.
pub fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().unwrap_or(0.0);
            let den: f64 = den.trim().parse().unwrap_or(0.0);
            if den > 0.0 { num / den } else { 0.0 }
        }
        None => rate.trim().parse().unwrap_or(0.0),
    }
}

fn number_field(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::String(s) => s.parse().ok(),
        serde_json::Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

/// Extract [`VideoMetrics`] from ffprobe's JSON report.
pub fn parse_ffprobe_json(json: &str) -> std::result::Result<VideoMetrics, String> {
    let parsed: serde_json::Value =
        serde_json::from_str(json).map_err(|e| format!("Invalid ffprobe output: {e}"))?;

    let stream = parsed["streams"]
        .as_array()
        .and_then(|streams| streams.iter().find(|s| s["codec_type"] == "video"))
        .ok_or_else(|| "No video stream found".to_string())?;

    let format = &parsed["format"];
    let duration = number_field(&format["duration"])
        .or_else(|| number_field(&stream["duration"]))
        .unwrap_or(0.0);
    let fps = stream["r_frame_rate"]
        .as_str()
        .map(parse_frame_rate)
        .unwrap_or(0.0);
    let frame_count = number_field(&stream["nb_frames"])
        .map(|n| n as u64)
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoMetrics {
        duration_seconds: duration,
        width: stream["width"].as_u64().unwrap_or(0) as u32,
        height: stream["height"].as_u64().unwrap_or(0) as u32,
        fps,
        size_bytes: number_field(&format["size"]).unwrap_or(0.0) as u64,
        codec: stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
        bitrate: number_field(&format["bit_rate"]).unwrap_or(0.0) as u64,
        frame_count,
    })
}

/// Technical defects in probed metrics. Each rule is independent.
pub fn technical_issues(metrics: &TechnicalMetrics, thresholds: &QualityThresholds) -> Vec<QualityIssue> {
    let Some(m) = metrics.video() else {
        return Vec::new();
    };
    let mut issues = Vec::new();

    if m.duration_seconds < thresholds.min_duration {
        issues.push(QualityIssue::technical(
            TechnicalDefect::TooShort,
            Severity::High,
            format!(
                "Video is only {:.1}s, minimum recommended is {}s",
                m.duration_seconds, thresholds.min_duration
            ),
            "Extend animation with more content or slower pacing",
        ));
    } else if m.duration_seconds > thresholds.max_duration {
        issues.push(QualityIssue::technical(
            TechnicalDefect::TooLong,
            Severity::Medium,
            format!("Video is {:.1}s, which may be too long for engagement", m.duration_seconds),
            "Consider breaking into multiple shorter animations",
        ));
    }

    if m.width < thresholds.min_width || m.height < thresholds.min_height {
        issues.push(QualityIssue::technical(
            TechnicalDefect::LowResolution,
            Severity::High,
            format!(
                "Resolution {}x{} is below minimum {}x{}",
                m.width, m.height, thresholds.min_width, thresholds.min_height
            ),
            "Render at higher resolution for better quality",
        ));
    }

    if m.fps < thresholds.target_fps * 0.8 {
        issues.push(QualityIssue::technical(
            TechnicalDefect::LowFramerate,
            Severity::Medium,
            format!("Framerate {:.2} is below target {}", m.fps, thresholds.target_fps),
            "Render at 30fps for smooth playback",
        ));
    }

    if m.size_mb() > thresholds.max_size_mb {
        issues.push(QualityIssue::technical(
            TechnicalDefect::LargeFile,
            Severity::Low,
            format!("File size {:.1}MB may be too large for web delivery", m.size_mb()),
            "Consider compression or lower bitrate",
        ));
    }

    issues
}

#[cfg(test)]
pub(crate) fn metrics(duration: f64, width: u32, height: u32, fps: f64, size_mb: f64) -> TechnicalMetrics {
    TechnicalMetrics::Probed(VideoMetrics {
        duration_seconds: duration,
        width,
        height,
        fps,
        size_bytes: (size_mb * BYTES_PER_MB) as u64,
        codec: "h264".to_string(),
        bitrate: 0,
        frame_count: (duration * fps) as u64,
    })
}
