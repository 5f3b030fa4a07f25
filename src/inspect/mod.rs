//! Inspection of rendered animations.
//!
//! - `technical` probes objective properties (duration, resolution, frame rate, size).
//! - `visual` samples frames and asks a vision model for layout defects.
//!
//! Both are read-only and best-effort: they report problems as values rather
//! than errors, so a rendered video always gets a report.

mod technical;
mod visual;

pub use technical::{
    parse_ffprobe_json, parse_frame_rate, technical_issues, Ffprobe, MetricsProbe,
    QualityThresholds, TechnicalMetrics, VideoMetrics,
};
pub use visual::{sample_frame_indices, FfmpegFrames, FrameSource, VisualInspection, VisualInspector};

#[cfg(test)]
pub(crate) use technical::metrics as test_metrics;
#[cfg(test)]
pub(crate) use visual::tests::{FakeFrames, FakeVision};
