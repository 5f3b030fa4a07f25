//! Quality assessment of rendered animations.

mod checker;
mod models;
mod scorer;

pub use checker::{quick_check, BatchSummary, QualityChecker, QuickCheck, QuickStatus};
pub use models::{
    AestheticFinding, IssueKind, QualityIssue, QualityReport, QualityTier, Severity, TechnicalDefect,
};
pub use scorer::QualityScorer;
