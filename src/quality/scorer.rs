//! Quality scoring.

use super::{QualityIssue, QualityTier, Severity, TechnicalDefect};
use crate::inspect::{QualityThresholds, TechnicalMetrics};

const BASE_SCORE: f64 = 100.0;
const MIN_SCORE: f64 = 20.0;
const MAX_SCORE: f64 = 100.0;
const MAX_AESTHETIC_PENALTY: f64 = 40.0;
const BONUS: f64 = 5.0;

fn technical_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::High => 20.0,
        Severity::Medium => 10.0,
        Severity::Low => 5.0,
    }
}

fn aesthetic_penalty(severity: Severity) -> f64 {
    match severity {
        Severity::High => 8.0,
        Severity::Medium => 4.0,
        Severity::Low => 2.0,
    }
}

/// Combines technical metrics and issues into a score and tier.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    thresholds: QualityThresholds,
}

impl QualityScorer {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Score in [20, 100] and the tier it maps to.
    ///
    /// A video whose metrics could not be probed always scores the floor.
    pub fn score(&self, metrics: &TechnicalMetrics, issues: &[QualityIssue]) -> (f64, QualityTier) {
        if !metrics.is_available() {
            return (MIN_SCORE, QualityTier::from_score(MIN_SCORE));
        }

        let mut score = BASE_SCORE;

        score -= issues
            .iter()
            .filter(|i| i.is_technical())
            .map(|i| technical_penalty(i.severity))
            .sum::<f64>();

        let aesthetic: f64 = issues
            .iter()
            .filter(|i| i.is_aesthetic())
            .map(|i| aesthetic_penalty(i.severity))
            .sum();
        score -= aesthetic.min(MAX_AESTHETIC_PENALTY);

        if let Some(m) = metrics.video() {
            if (self.thresholds.min_duration..=self.thresholds.bonus_max_duration)
                .contains(&m.duration_seconds)
            {
                score += BONUS;
            }
            if m.fps >= self.thresholds.target_fps {
                score += BONUS;
            }
        }

        let score = score.clamp(MIN_SCORE, MAX_SCORE);
        (score, QualityTier::from_score(score))
    }

    /// Free-text improvement suggestions.
    pub fn recommendations(&self, metrics: &TechnicalMetrics, issues: &[QualityIssue]) -> Vec<String> {
        let mut recommendations = Vec::new();

        if metrics.video().is_some_and(|m| m.duration_seconds > 30.0) {
            recommendations.push("Consider adding chapter markers or visual breaks".to_string());
        }

        if issues.is_empty() {
            recommendations.push("Animation meets all quality standards!".to_string());
        } else {
            recommendations.push("Address the identified issues to improve quality".to_string());
        }

        if issues.iter().any(|i| i.is_defect(TechnicalDefect::TooShort)) {
            recommendations.push("Add more explanatory pauses between concepts".to_string());
        }

        if issues.iter().any(|i| i.is_aesthetic() && i.severity == Severity::High) {
            recommendations.push(
                "Reposition overlapping labels and titles; use next_to/to_edge with a larger buff"
                    .to_string(),
            );
        }

        if let TechnicalMetrics::Unavailable { reason } = metrics {
            recommendations.push(format!("Technical metrics unavailable ({reason}); verify the file plays"));
        }

        recommendations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspect::test_metrics as metrics;
    use crate::quality::AestheticFinding;

    fn technical(defect: TechnicalDefect, severity: Severity) -> QualityIssue {
        QualityIssue::technical(defect, severity, String::new(), "")
    }

    fn aesthetic(severity: Severity) -> QualityIssue {
        QualityIssue::aesthetic(AestheticFinding {
            frame_index: 0,
            element: "title".to_string(),
            problem: "overlaps".to_string(),
            severity,
            remedy: String::new(),
        })
    }

    #[test]
    fn test_clean_video_clamps_to_hundred() {
        let (score, tier) = QualityScorer::default().score(&metrics(30.0, 1280, 720, 30.0, 5.0), &[]);
        assert_eq!(score, 100.0);
        assert_eq!(tier, QualityTier::Excellent);
    }

    #[test]
    fn test_all_technical_defects() {
        let issues = vec![
            technical(TechnicalDefect::TooShort, Severity::High),
            technical(TechnicalDefect::LowResolution, Severity::High),
            technical(TechnicalDefect::LowFramerate, Severity::Medium),
            technical(TechnicalDefect::LargeFile, Severity::Low),
        ];
        let (score, tier) = QualityScorer::default().score(&metrics(2.0, 400, 300, 15.0, 200.0), &issues);
        assert_eq!(score, 45.0);
        assert_eq!(tier, QualityTier::Poor);
    }

    #[test]
    fn test_mixed_issues_with_bonuses() {
        let issues = vec![
            aesthetic(Severity::High),
            technical(TechnicalDefect::TooLong, Severity::Medium),
        ];
        let (score, tier) = QualityScorer::default().score(&metrics(20.0, 1280, 720, 30.0, 5.0), &issues);
        assert_eq!(score, 92.0);
        assert_eq!(tier, QualityTier::Excellent);
    }

    #[test]
    fn test_aesthetic_penalty_capped_at_forty() {
        let issues: Vec<_> = (0..10).map(|_| aesthetic(Severity::High)).collect();
        // No bonuses: duration 120s is past the bonus range and fps is below target.
        let (score, _) = QualityScorer::default().score(&metrics(120.0, 1280, 720, 25.0, 5.0), &issues);
        assert_eq!(score, 60.0);
    }

    #[test]
    fn test_score_never_below_floor() {
        let mut issues: Vec<_> = (0..10)
            .map(|_| technical(TechnicalDefect::LowResolution, Severity::High))
            .collect();
        issues.extend((0..10).map(|_| aesthetic(Severity::High)));

        let (score, tier) = QualityScorer::default().score(&metrics(1.0, 100, 100, 5.0, 500.0), &issues);
        assert_eq!(score, 20.0);
        assert_eq!(tier, QualityTier::Poor);
    }

    #[test]
    fn test_score_non_increasing_with_more_technical_issues() {
        let scorer = QualityScorer::default();
        let m = metrics(20.0, 1280, 720, 30.0, 5.0);
        let fixed_aesthetic = vec![aesthetic(Severity::Medium), aesthetic(Severity::Low)];

        let mut issues = fixed_aesthetic.clone();
        let mut previous = scorer.score(&m, &issues).0;
        for severity in [Severity::Low, Severity::Medium, Severity::High, Severity::High, Severity::High] {
            issues.push(technical(TechnicalDefect::LargeFile, severity));
            let (score, _) = scorer.score(&m, &issues);
            assert!(score <= previous);
            assert!((20.0..=100.0).contains(&score));
            previous = score;
        }
    }

    #[test]
    fn test_unavailable_metrics_score_the_floor() {
        let scorer = QualityScorer::default();
        let corrupt = TechnicalMetrics::unavailable("corrupt");

        assert_eq!(scorer.score(&corrupt, &[]), (20.0, QualityTier::Poor));
        assert_eq!(
            scorer.score(&corrupt, &[aesthetic(Severity::Medium)]),
            (20.0, QualityTier::Poor)
        );
    }

    #[test]
    fn test_frame_extraction_failure_costs_a_technical_penalty() {
        let issues = vec![technical(TechnicalDefect::FrameExtractionFailed, Severity::Medium)];
        // No bonuses: duration 120s is past the bonus range and fps is below target.
        let (score, tier) = QualityScorer::default().score(&metrics(120.0, 1280, 720, 25.0, 5.0), &issues);
        assert_eq!(score, 90.0);
        assert_eq!(tier, QualityTier::Excellent);
    }

    #[test]
    fn test_recommendations() {
        let scorer = QualityScorer::default();

        let clean = scorer.recommendations(&metrics(45.0, 1280, 720, 30.0, 5.0), &[]);
        assert_eq!(
            clean,
            vec![
                "Consider adding chapter markers or visual breaks",
                "Animation meets all quality standards!"
            ]
        );

        let short = scorer.recommendations(
            &metrics(2.0, 1280, 720, 30.0, 1.0),
            &[technical(TechnicalDefect::TooShort, Severity::High), aesthetic(Severity::High)],
        );
        assert!(short.contains(&"Add more explanatory pauses between concepts".to_string()));
        assert!(short.iter().any(|r| r.starts_with("Reposition overlapping")));
    }
}
