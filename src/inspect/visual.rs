//! Visual inspection: sample frames and ask a vision model about layout defects.

use crate::error::{ManimateError, Result};
use crate::llm::VisionModel;
use crate::model_output::parse_findings;
use crate::quality::{AestheticFinding, QualityIssue, Severity, TechnicalDefect};
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Frame indices to sample from a video with `total` frames.
///
/// First and last frame plus evenly spaced frames between them; never more
/// frames than exist, and one frame whenever the video has any.
pub fn sample_frame_indices(total: u64, wanted: usize) -> Vec<u64> {
    if total == 0 {
        return Vec::new();
    }

    let count = (wanted.max(1) as u64).min(total);
    if count == 1 {
        return vec![0];
    }

    (0..count).map(|i| i * (total - 1) / (count - 1)).collect()
}

/// Source of still frames from a video file.
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Number of frames in the video stream.
    async fn frame_count(&self, path: &Path) -> Result<u64>;

    /// PNG bytes of the frame at `index`.
    async fn extract_frame(&self, path: &Path, index: u64) -> Result<Vec<u8>>;
}

/// [`FrameSource`] using `ffprobe` to count and `ffmpeg` to extract frames.
///
/// Frames are written to short-lived PNG files under `temp_dir`.
pub struct FfmpegFrames {
    temp_dir: PathBuf,
}

impl FfmpegFrames {
    pub fn new(temp_dir: PathBuf) -> Self {
        Self { temp_dir }
    }
}

#[async_trait]
impl FrameSource for FfmpegFrames {
    async fn frame_count(&self, path: &Path) -> Result<u64> {
        let result = Command::new("ffprobe")
            .arg("-v").arg("error")
            .arg("-select_streams").arg("v:0")
            .arg("-count_packets")
            .arg("-show_entries").arg("stream=nb_read_packets")
            .arg("-of").arg("csv=p=0")
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match result {
            Ok(o) => o,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManimateError::ToolNotFound("ffprobe".into()));
            }
            Err(e) => return Err(ManimateError::ToolFailed(format!("ffprobe error: {e}"))),
        };

        if !output.status.success() {
            let err = String::from_utf8_lossy(&output.stderr);
            return Err(ManimateError::ToolFailed(format!("ffprobe frame count failed: {err}")));
        }

        String::from_utf8_lossy(&output.stdout)
            .trim()
            .trim_end_matches(',')
            .parse::<u64>()
            .map_err(|e| ManimateError::ToolFailed(format!("Unexpected frame count: {e}")))
    }

    async fn extract_frame(&self, path: &Path, index: u64) -> Result<Vec<u8>> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let frame_file = tempfile::Builder::new()
            .prefix("frame_")
            .suffix(".png")
            .tempfile_in(&self.temp_dir)?;

        let result = Command::new("ffmpeg")
            .arg("-v").arg("error")
            .arg("-i").arg(path)
            .arg("-vf").arg(format!("select=eq(n\\,{index})"))
            .arg("-vsync").arg("0")
            .arg("-frames:v").arg("1")
            .arg("-y")
            .arg(frame_file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await;

        match result {
            Ok(out) if out.status.success() => {}
            Ok(out) => {
                let err = String::from_utf8_lossy(&out.stderr);
                return Err(ManimateError::ToolFailed(format!("ffmpeg frame {index} failed: {err}")));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ManimateError::ToolNotFound("ffmpeg".into()));
            }
            Err(e) => return Err(ManimateError::ToolFailed(format!("ffmpeg error: {e}"))),
        }

        let bytes = tokio::fs::read(frame_file.path()).await?;
        if bytes.is_empty() {
            return Err(ManimateError::ToolFailed(format!("ffmpeg produced no image for frame {index}")));
        }
        Ok(bytes)
    }
}

/// What visual inspection of one video produced.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualInspection {
    /// Frames were analyzed. Empty when the model saw no problems.
    Analyzed(Vec<AestheticFinding>),
    /// Not a single frame could be read from the video.
    ExtractionFailed(String),
}

impl VisualInspection {
    pub fn findings(&self) -> &[AestheticFinding] {
        match self {
            VisualInspection::Analyzed(findings) => findings,
            VisualInspection::ExtractionFailed(_) => &[],
        }
    }

    /// Aesthetic findings as issues; an unreadable video is a technical defect.
    pub fn into_issues(self) -> Vec<QualityIssue> {
        match self {
            VisualInspection::Analyzed(findings) => {
                findings.into_iter().map(QualityIssue::aesthetic).collect()
            }
            VisualInspection::ExtractionFailed(reason) => vec![QualityIssue::technical(
                TechnicalDefect::FrameExtractionFailed,
                Severity::Medium,
                format!("Could not extract frames for visual analysis: {reason}"),
                "Check video file integrity",
            )],
        }
    }
}

/// Best-effort aesthetic inspection of a rendered video.
pub struct VisualInspector {
    frames: Arc<dyn FrameSource>,
    vision: Arc<dyn VisionModel>,
    instruction: String,
    sample_frames: usize,
}

impl VisualInspector {
    pub fn new(frames: Arc<dyn FrameSource>, vision: Arc<dyn VisionModel>, instruction: &str) -> Self {
        Self {
            frames,
            vision,
            instruction: instruction.to_string(),
            sample_frames: 5,
        }
    }

    pub fn with_sample_frames(mut self, sample_frames: usize) -> Self {
        self.sample_frames = sample_frames;
        self
    }

    /// Inspect sampled frames. Never fails; inspection problems are reported in the result.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn inspect(&self, path: &Path) -> VisualInspection {
        let total = match self.frames.frame_count(path).await {
            Ok(n) => n,
            Err(e) => {
                warn!("Could not count frames: {}", e);
                return VisualInspection::ExtractionFailed(e.to_string());
            }
        };

        let indices = sample_frame_indices(total, self.sample_frames);
        debug!("Sampling frames {:?} of {}", indices, total);

        let mut frames = Vec::with_capacity(indices.len());
        for index in indices {
            match self.frames.extract_frame(path, index).await {
                Ok(png) => frames.push((index, png)),
                Err(e) => warn!("Skipping frame {}: {}", index, e),
            }
        }

        if frames.is_empty() {
            return VisualInspection::ExtractionFailed(format!("none of {total} frame(s) could be read"));
        }

        let replies = join_all(
            frames
                .iter()
                .map(|(_, png)| self.vision.analyze_image(&self.instruction, png)),
        )
        .await;

        let mut findings = Vec::new();
        let mut failures = 0;
        for ((index, _), reply) in frames.iter().zip(replies) {
            match reply {
                Ok(text) => findings.extend(parse_findings(&text, *index)),
                Err(e) => {
                    warn!("Vision analysis of frame {} failed: {}", index, e);
                    failures += 1;
                }
            }
        }

        if failures == frames.len() {
            return VisualInspection::Analyzed(vec![analysis_failed()]);
        }

        info!("Visual inspection found {} issue(s) in {} frame(s)", findings.len(), frames.len());
        VisualInspection::Analyzed(findings)
    }
}

fn analysis_failed() -> AestheticFinding {
    AestheticFinding {
        frame_index: 0,
        element: "unknown".to_string(),
        problem: "Visual analysis failed".to_string(),
        severity: Severity::Low,
        remedy: "Manually review for overlapping elements and poor spacing".to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Fake video with a fixed number of frames; records extracted indices.
    pub(crate) struct FakeFrames {
        pub total: u64,
        pub extracted: Mutex<Vec<u64>>,
        unreadable: Vec<u64>,
    }

    impl FakeFrames {
        pub(crate) fn new(total: u64) -> Self {
            Self { total, extracted: Mutex::new(Vec::new()), unreadable: Vec::new() }
        }

        /// Extraction of these frame indices fails.
        pub(crate) fn with_unreadable(mut self, indices: Vec<u64>) -> Self {
            self.unreadable = indices;
            self
        }
    }

    #[async_trait]
    impl FrameSource for FakeFrames {
        async fn frame_count(&self, _path: &Path) -> Result<u64> {
            Ok(self.total)
        }

        async fn extract_frame(&self, _path: &Path, index: u64) -> Result<Vec<u8>> {
            self.extracted.lock().unwrap().push(index);
            if self.unreadable.contains(&index) {
                return Err(ManimateError::ToolFailed(format!("ffmpeg frame {index} failed")));
            }
            // The last byte identifies the frame.
            Ok(vec![0x89, b'P', b'N', b'G', index as u8])
        }
    }

    /// Vision model returning a fixed reply, or failing every call.
    pub(crate) struct FakeVision {
        pub reply: Option<String>,
        pub calls: AtomicUsize,
        failing_frames: Vec<u8>,
    }

    impl FakeVision {
        pub(crate) fn replying(reply: &str) -> Self {
            Self { reply: Some(reply.to_string()), calls: AtomicUsize::new(0), failing_frames: Vec::new() }
        }

        pub(crate) fn failing() -> Self {
            Self { reply: None, calls: AtomicUsize::new(0), failing_frames: Vec::new() }
        }

        /// Calls for frames whose image ends in one of `frames` fail.
        pub(crate) fn failing_on(mut self, frames: Vec<u8>) -> Self {
            self.failing_frames = frames;
            self
        }
    }

    #[async_trait]
    impl VisionModel for FakeVision {
        async fn analyze_image(&self, _instruction: &str, png: &[u8]) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if png.last().is_some_and(|b| self.failing_frames.contains(b)) {
                return Err(ManimateError::Transport("rate limited".into()));
            }
            self.reply
                .clone()
                .ok_or_else(|| ManimateError::Transport("rate limited".into()))
        }
    }

    struct BrokenFrames;

    #[async_trait]
    impl FrameSource for BrokenFrames {
        async fn frame_count(&self, _path: &Path) -> Result<u64> {
            Err(ManimateError::ToolNotFound("ffprobe".into()))
        }

        async fn extract_frame(&self, _path: &Path, _index: u64) -> Result<Vec<u8>> {
            unreachable!()
        }
    }

    fn inspector(frames: Arc<FakeFrames>, vision: Arc<FakeVision>) -> VisualInspector {
        VisualInspector::new(frames, vision, "check layout")
    }

    fn frame_indices(inspection: &VisualInspection) -> Vec<u64> {
        inspection.findings().iter().map(|f| f.frame_index).collect()
    }

    #[test]
    fn test_sample_indices_span_video() {
        assert_eq!(sample_frame_indices(900, 5), vec![0, 224, 449, 674, 899]);
        assert_eq!(sample_frame_indices(5, 5), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_frame_indices(3, 5), vec![0, 1, 2]);
        assert_eq!(sample_frame_indices(1, 5), vec![0]);
        assert_eq!(sample_frame_indices(0, 5), Vec::<u64>::new());
        assert_eq!(sample_frame_indices(10, 0), vec![0]);
    }

    #[tokio::test]
    async fn test_single_frame_video_samples_once() {
        let frames = Arc::new(FakeFrames::new(1));
        let vision = Arc::new(FakeVision::replying("No issues detected"));

        let inspection = inspector(frames.clone(), vision.clone())
            .inspect(Path::new("clip.mp4"))
            .await;

        assert_eq!(inspection, VisualInspection::Analyzed(Vec::new()));
        assert_eq!(*frames.extracted.lock().unwrap(), vec![0]);
        assert_eq!(vision.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_findings_from_every_frame() {
        let frames = Arc::new(FakeFrames::new(300));
        let vision = Arc::new(FakeVision::replying("title - overlaps the axes - move up"));

        let inspection = inspector(frames, vision.clone()).inspect(Path::new("clip.mp4")).await;
        let findings = inspection.findings();

        assert_eq!(vision.calls.load(Ordering::SeqCst), 5);
        assert_eq!(findings.len(), 5);
        assert!(findings.iter().all(|f| f.severity == Severity::High));
        assert_eq!(findings.last().map(|f| f.frame_index), Some(299));
    }

    #[tokio::test]
    async fn test_failed_vision_calls_skip_only_their_frames() {
        let frames = Arc::new(FakeFrames::new(5));
        let vision = Arc::new(
            FakeVision::replying("title - overlaps the axes - move up").failing_on(vec![1, 3]),
        );

        let inspection = inspector(frames, vision.clone()).inspect(Path::new("clip.mp4")).await;

        assert_eq!(vision.calls.load(Ordering::SeqCst), 5);
        assert_eq!(frame_indices(&inspection), vec![0, 2, 4]);
        assert!(inspection.findings().iter().all(|f| f.problem != "Visual analysis failed"));
    }

    #[tokio::test]
    async fn test_unreadable_frames_are_skipped() {
        let frames = Arc::new(FakeFrames::new(5).with_unreadable(vec![0, 4]));
        let vision = Arc::new(FakeVision::replying("equation - too close to the edge - shift left"));

        let inspection = inspector(frames.clone(), vision.clone())
            .inspect(Path::new("clip.mp4"))
            .await;

        assert_eq!(*frames.extracted.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(vision.calls.load(Ordering::SeqCst), 3);
        assert_eq!(frame_indices(&inspection), vec![1, 2, 3]);
        assert!(inspection.findings().iter().all(|f| f.severity == Severity::Medium));
    }

    #[tokio::test]
    async fn test_total_vision_failure_degrades_to_one_low_finding() {
        let frames = Arc::new(FakeFrames::new(120));
        let vision = Arc::new(FakeVision::failing());

        let inspection = inspector(frames, vision.clone()).inspect(Path::new("clip.mp4")).await;
        let findings = inspection.findings();

        assert_eq!(vision.calls.load(Ordering::SeqCst), 5);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Low);
        assert_eq!(findings[0].problem, "Visual analysis failed");
    }

    #[tokio::test]
    async fn test_unreadable_video_is_a_technical_defect() {
        let vision = Arc::new(FakeVision::replying("No issues detected"));
        let inspection = VisualInspector::new(Arc::new(BrokenFrames), vision.clone(), "check")
            .inspect(Path::new("clip.mp4"))
            .await;

        assert!(matches!(inspection, VisualInspection::ExtractionFailed(_)));
        assert!(inspection.findings().is_empty());
        assert_eq!(vision.calls.load(Ordering::SeqCst), 0);

        let issues = inspection.into_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_defect(TechnicalDefect::FrameExtractionFailed));
        assert_eq!(issues[0].severity, Severity::Medium);
        assert_eq!(issues[0].tag(), "frame_extraction_failed");
    }

    #[tokio::test]
    async fn test_no_readable_frame_is_an_extraction_failure() {
        let frames = Arc::new(FakeFrames::new(2).with_unreadable(vec![0, 1]));
        let vision = Arc::new(FakeVision::replying("No issues detected"));

        let inspection = inspector(frames, vision.clone()).inspect(Path::new("clip.mp4")).await;

        assert!(matches!(inspection, VisualInspection::ExtractionFailed(_)));
        assert_eq!(vision.calls.load(Ordering::SeqCst), 0);
    }
}
