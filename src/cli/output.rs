//! CLI output formatting utilities.

use crate::quality::{QualityIssue, QualityReport, QualityTier, Severity};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print a quality report.
    pub fn report(report: &QualityReport) {
        Output::header(&format!("Quality report: {}", report.artifact.display()));

        let tier = match report.tier {
            QualityTier::Excellent | QualityTier::Good => style(report.tier.to_string()).green(),
            QualityTier::Acceptable => style(report.tier.to_string()).yellow(),
            QualityTier::Poor => style(report.tier.to_string()).red(),
        };
        println!("  Score: {} ({})", style(format!("{:.0}/100", report.score)).bold(), tier);

        match report.metrics.require() {
            Ok(m) => {
                Output::kv("Duration", &format_duration(m.duration_seconds));
                Output::kv("Resolution", &format!("{}x{}", m.width, m.height));
                Output::kv("Frame rate", &format!("{:.2} fps", m.fps));
                Output::kv("Size", &format!("{:.1} MB ({})", m.size_mb(), m.codec));
            }
            Err(e) => Output::kv("Metrics", &e.to_string()),
        }

        if !report.issues.is_empty() {
            println!("\n  {}", style("Issues").bold());
            for issue in &report.issues {
                Output::issue(issue);
            }
        }

        if !report.recommendations.is_empty() {
            println!("\n  {}", style("Recommendations").bold());
            for rec in &report.recommendations {
                Output::list_item(rec);
            }
        }
    }

    fn issue(issue: &QualityIssue) {
        let marker = match issue.severity {
            Severity::High => style("high").red(),
            Severity::Medium => style("medium").yellow(),
            Severity::Low => style("low").dim(),
        };
        println!("  {} [{}] {}", style("*").cyan(), marker, issue.description);
        if !issue.remedy.is_empty() {
            println!("      {} {}", style("→").dim(), style(&issue.remedy).dim());
        }
    }

    /// Create a progress bar.
    pub fn progress_bar(len: u64, msg: &str) -> ProgressBar {
        let pb = ProgressBar::new(len);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb.set_message(msg.to_string());
        pb
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Format duration in seconds to a human-readable string.
pub(crate) fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let minutes = total_seconds / 60;
    let secs = total_seconds % 60;

    if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{:.1}s", seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(4.31), "4.3s");
        assert_eq!(format_duration(59.0), "59.0s");
        assert_eq!(format_duration(125.0), "2m 5s");
    }
}
