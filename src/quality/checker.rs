//! Quality checks over rendered video files.

use super::{QualityIssue, QualityReport, QualityScorer};
use crate::inspect::{technical_issues, MetricsProbe, TechnicalMetrics, VisualInspection, VisualInspector};
use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Runs technical and visual inspection and produces a [`QualityReport`].
pub struct QualityChecker {
    probe: Arc<dyn MetricsProbe>,
    visual: Option<VisualInspector>,
    scorer: QualityScorer,
}

impl QualityChecker {
    pub fn new(probe: Arc<dyn MetricsProbe>, scorer: QualityScorer) -> Self {
        Self {
            probe,
            visual: None,
            scorer,
        }
    }

    /// Enable vision-model frame analysis.
    pub fn with_visual(mut self, visual: VisualInspector) -> Self {
        self.visual = Some(visual);
        self
    }

    /// Analyze a rendered video. Inspection failures degrade the report, never the call.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn check(&self, path: &Path) -> QualityReport {
        // Probe and frame analysis are independent reads of the same file.
        let (metrics, inspection) = tokio::join!(self.probe.probe(path), async {
            match &self.visual {
                Some(visual) => visual.inspect(path).await,
                None => VisualInspection::Analyzed(Vec::new()),
            }
        });

        if let TechnicalMetrics::Unavailable { reason } = &metrics {
            warn!("Technical metrics unavailable: {}", reason);
        }

        let mut issues: Vec<QualityIssue> = technical_issues(&metrics, self.scorer.thresholds());
        issues.extend(inspection.into_issues());

        let (score, tier) = self.scorer.score(&metrics, &issues);
        let recommendations = self.scorer.recommendations(&metrics, &issues);

        info!("Quality score {:.0} ({}), {} issue(s)", score, tier, issues.len());

        QualityReport {
            artifact: path.to_path_buf(),
            tier,
            score,
            metrics,
            issues,
            recommendations,
            timestamp: Utc::now(),
        }
    }
}

/// Outcome of a quick file-level check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuickStatus {
    Pass,
    Warning,
    Fail,
}

/// Fast validation without probing or model calls.
#[derive(Debug, Clone, Serialize)]
pub struct QuickCheck {
    pub status: QuickStatus,
    pub reason: Option<String>,
    pub size_mb: Option<f64>,
    pub recommendation: String,
}

const MIN_VALID_BYTES: u64 = 1000;

/// Check that the file exists and has a plausible size.
pub fn quick_check(path: &Path, max_size_mb: f64) -> QuickCheck {
    let size = match std::fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(_) => {
            return QuickCheck {
                status: QuickStatus::Fail,
                reason: Some("Video file not found".to_string()),
                size_mb: None,
                recommendation: "Check file path and ensure video was generated".to_string(),
            };
        }
    };
    let size_mb = size as f64 / (1024.0 * 1024.0);

    if size < MIN_VALID_BYTES {
        QuickCheck {
            status: QuickStatus::Fail,
            reason: Some("Video file too small, likely corrupted".to_string()),
            size_mb: Some(size_mb),
            recommendation: "Regenerate the animation".to_string(),
        }
    } else if size_mb > max_size_mb {
        QuickCheck {
            status: QuickStatus::Warning,
            reason: Some("Video file very large".to_string()),
            size_mb: Some(size_mb),
            recommendation: "Consider compression or shorter duration".to_string(),
        }
    } else {
        QuickCheck {
            status: QuickStatus::Pass,
            reason: None,
            size_mb: Some(size_mb),
            recommendation: "Video appears valid, run a full check for detailed analysis".to_string(),
        }
    }
}

/// Summary over several reports.
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    pub total_videos: usize,
    pub analyzed: usize,
    pub average_score: f64,
}

impl BatchSummary {
    pub fn from_reports(reports: &[QualityReport]) -> Self {
        let analyzed = reports.iter().filter(|r| r.metrics.is_available()).count();
        let scores: Vec<f64> = reports
            .iter()
            .filter(|r| r.metrics.is_available())
            .map(|r| r.score)
            .collect();
        let average_score = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f64>() / scores.len() as f64
        };

        Self {
            total_videos: reports.len(),
            analyzed,
            average_score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::{test_metrics, FakeFrames, FakeVision};
    use crate::quality::{QualityTier, Severity, TechnicalDefect};
    use async_trait::async_trait;

    struct FixedProbe(TechnicalMetrics);

    #[async_trait]
    impl MetricsProbe for FixedProbe {
        async fn probe(&self, _path: &Path) -> TechnicalMetrics {
            self.0.clone()
        }
    }

    fn checker(metrics: TechnicalMetrics) -> QualityChecker {
        QualityChecker::new(Arc::new(FixedProbe(metrics)), QualityScorer::default())
    }

    #[tokio::test]
    async fn test_clean_report() {
        let report = checker(test_metrics(30.0, 1280, 720, 30.0, 5.0))
            .check(Path::new("animations/clean.mp4"))
            .await;

        assert_eq!(report.score, 100.0);
        assert_eq!(report.tier, QualityTier::Excellent);
        assert!(report.issues.is_empty());
        assert_eq!(report.artifact, Path::new("animations/clean.mp4"));
    }

    #[tokio::test]
    async fn test_visual_findings_become_aesthetic_issues() {
        let visual = VisualInspector::new(
            Arc::new(FakeFrames::new(600)),
            Arc::new(FakeVision::replying("equation - covers the curve - move right")),
            "check",
        )
        .with_sample_frames(2);

        let report = checker(test_metrics(20.0, 1280, 720, 30.0, 5.0))
            .with_visual(visual)
            .check(Path::new("a.mp4"))
            .await;

        assert_eq!(report.issues.len(), 2);
        assert!(report.issues.iter().all(|i| i.is_aesthetic()));
        assert_eq!(report.issues_with(Severity::High).count(), 2);
        // 100 - 16 + 10 bonuses.
        assert_eq!(report.score, 94.0);
    }

    #[tokio::test]
    async fn test_unavailable_metrics_still_report() {
        let report = checker(TechnicalMetrics::unavailable("Video file not found"))
            .check(Path::new("missing.mp4"))
            .await;

        assert!(!report.metrics.is_available());
        assert!(report.issues.is_empty());
        assert_eq!(report.score, 20.0);
        assert_eq!(report.tier, QualityTier::Poor);
        assert!(report.recommendations.iter().any(|r| r.contains("unavailable")));
    }

    #[tokio::test]
    async fn test_unreadable_video_reports_extraction_defect() {
        let visual = VisualInspector::new(
            Arc::new(FakeFrames::new(0)),
            Arc::new(FakeVision::replying("No issues detected")),
            "check",
        );

        let report = checker(TechnicalMetrics::unavailable("moov atom not found"))
            .with_visual(visual)
            .check(Path::new("corrupt.mp4"))
            .await;

        assert_eq!(report.issues.len(), 1);
        assert!(report.issues[0].is_defect(TechnicalDefect::FrameExtractionFailed));
        assert_eq!(report.tier, QualityTier::Poor);
        assert_eq!(report.score, 20.0);
    }

    #[test]
    fn test_quick_check_statuses() {
        let dir = tempfile::tempdir().unwrap();

        let missing = quick_check(&dir.path().join("nope.mp4"), 100.0);
        assert_eq!(missing.status, QuickStatus::Fail);

        let tiny = dir.path().join("tiny.mp4");
        std::fs::write(&tiny, b"abc").unwrap();
        assert_eq!(quick_check(&tiny, 100.0).status, QuickStatus::Fail);

        let ok = dir.path().join("ok.mp4");
        std::fs::write(&ok, vec![0u8; 4096]).unwrap();
        assert_eq!(quick_check(&ok, 100.0).status, QuickStatus::Pass);
        assert_eq!(quick_check(&ok, 0.001).status, QuickStatus::Warning);
    }

    #[tokio::test]
    async fn test_batch_summary_averages_analyzed_reports() {
        let good = checker(test_metrics(30.0, 1280, 720, 30.0, 5.0)).check(Path::new("a.mp4")).await;
        let bad = checker(test_metrics(2.0, 400, 300, 15.0, 200.0)).check(Path::new("b.mp4")).await;
        let broken = checker(TechnicalMetrics::unavailable("x")).check(Path::new("c.mp4")).await;

        let summary = BatchSummary::from_reports(&[good, bad, broken]);
        assert_eq!(summary.total_videos, 3);
        assert_eq!(summary.analyzed, 2);
        assert_eq!(summary.average_score, 72.5);
    }
}
