//! Check command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::inspect::{FfmpegFrames, Ffprobe, QualityThresholds, VisualInspector};
use crate::llm::create_vision_model;
use crate::quality::{quick_check, BatchSummary, QualityChecker, QualityScorer, QuickCheck, QuickStatus};
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;

/// Run the check command.
pub async fn run_check(videos: &[String], quick: bool, json: bool, settings: Settings) -> Result<()> {
    if quick {
        return run_quick(videos, json, &settings);
    }

    if let Err(e) = preflight::check(Operation::Check, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Use --quick for a file-level check without ffmpeg.");
        return Err(e.into());
    }

    let checker = build_checker(&settings)?;

    let progress = (!json && videos.len() > 1).then(|| Output::progress_bar(videos.len() as u64, "Checking"));
    let mut reports = Vec::with_capacity(videos.len());
    for video in videos {
        reports.push(checker.check(Path::new(video)).await);
        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let summary = (reports.len() > 1).then(|| BatchSummary::from_reports(&reports));

    if json {
        let value = serde_json::json!({
            "reports": reports,
            "summary": summary,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for report in &reports {
        Output::report(report);
    }
    if let Some(summary) = summary {
        Output::header("Batch summary");
        Output::kv("Videos", &summary.total_videos.to_string());
        Output::kv("Analyzed", &summary.analyzed.to_string());
        Output::kv("Average score", &format!("{:.1}", summary.average_score));
    }

    Ok(())
}

fn build_checker(settings: &Settings) -> Result<QualityChecker> {
    let scorer = QualityScorer::new(QualityThresholds::from(&settings.quality));
    let checker = QualityChecker::new(Arc::new(Ffprobe::new()), scorer);

    if !settings.quality.visual_check {
        return Ok(checker);
    }
    if !crate::openai::is_api_key_configured() {
        Output::warning("OPENAI_API_KEY not set, skipping visual inspection.");
        return Ok(checker);
    }

    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;
    let vision = create_vision_model(&settings.quality)?;
    Ok(checker.with_visual(
        VisualInspector::new(
            Arc::new(FfmpegFrames::new(settings.temp_dir())),
            vision,
            &prompts.vision.instruction,
        )
        .with_sample_frames(settings.quality.sample_frames),
    ))
}

fn run_quick(videos: &[String], json: bool, settings: &Settings) -> Result<()> {
    let checks: Vec<(&String, QuickCheck)> = videos
        .iter()
        .map(|v| (v, quick_check(Path::new(v), settings.quality.max_file_size_mb)))
        .collect();

    if json {
        let value: Vec<_> = checks
            .iter()
            .map(|(video, check)| serde_json::json!({ "video": video, "check": check }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (video, check) in &checks {
        let size = check.size_mb.map(|mb| format!(" ({:.1} MB)", mb)).unwrap_or_default();
        match check.status {
            QuickStatus::Pass => Output::success(&format!("{}{}", video, size)),
            QuickStatus::Warning => Output::warning(&format!(
                "{}{}: {}",
                video,
                size,
                check.reason.as_deref().unwrap_or("warning")
            )),
            QuickStatus::Fail => Output::error(&format!(
                "{}: {}",
                video,
                check.reason.as_deref().unwrap_or("failed")
            )),
        }
        Output::kv("Recommendation", &check.recommendation);
    }

    Ok(())
}
