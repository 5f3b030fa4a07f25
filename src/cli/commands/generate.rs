//! Generate command implementation.

use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::ManimateError;
use crate::generation::{ComplexityTier, GenerationRequest, StyleDirectives, SyncMarker};
use crate::pipeline::{PipelineOutcome, RegenerationController};
use crate::render::output_name_for;
use anyhow::{Context, Result};

/// Options collected from the command line.
#[derive(Debug, Default)]
pub struct GenerateOptions {
    pub complexity: String,
    pub script: Option<String>,
    pub duration: Option<f64>,
    pub color_scheme: Vec<String>,
    pub pacing: Option<String>,
    pub style: Option<String>,
    pub sync: Vec<String>,
    pub output_name: Option<String>,
    pub no_quality_check: bool,
    pub json: bool,
}

/// Run the generate command.
pub async fn run_generate(concept: &str, options: GenerateOptions, settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Generate, &settings) {
        Output::error(&format!("{}", e));
        Output::info("Run 'manimate doctor' for detailed diagnostics.");
        return Err(e.into());
    }

    let request = build_request(concept, &options)?;
    request.validate()?;

    let output_name = options
        .output_name
        .clone()
        .unwrap_or_else(|| output_name_for(concept));

    let controller = RegenerationController::from_settings(&settings)?
        .with_quality_check(settings.quality.enabled && !options.no_quality_check);

    let spinner = (!options.json).then(|| Output::spinner(&format!("Animating '{}'...", concept)));
    let result = controller.run(&request, &output_name).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = result?;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_outcome(&outcome);
    }

    if !outcome.success {
        return Err(ManimateError::RenderFailure(format!(
            "Animation for '{}' failed to render",
            outcome.concept
        ))
        .into());
    }
    Ok(())
}

fn build_request(concept: &str, options: &GenerateOptions) -> Result<GenerationRequest> {
    let complexity: ComplexityTier = options.complexity.parse()?;

    let mut style = StyleDirectives {
        pacing: options.pacing.clone(),
        visual_style: options.style.clone(),
        ..StyleDirectives::default()
    };
    for entry in &options.color_scheme {
        let (role, color) = entry
            .split_once('=')
            .with_context(|| format!("Color scheme entry must be ROLE=COLOR, got '{entry}'"))?;
        style.color_scheme.insert(role.trim().to_string(), color.trim().to_string());
    }

    let markers = options
        .sync
        .iter()
        .map(|s| s.parse::<SyncMarker>())
        .collect::<crate::error::Result<Vec<_>>>()?;

    let mut request = GenerationRequest::new(concept)
        .with_complexity(complexity)
        .with_style(style)
        .with_sync_markers(markers);
    if let Some(script) = &options.script {
        request = request.with_script_context(script.clone());
    }
    if let Some(duration) = options.duration {
        request = request.with_target_duration(duration);
    }
    Ok(request)
}

fn print_outcome(outcome: &PipelineOutcome) {
    if outcome.success {
        Output::success(&format!("Rendered '{}'", outcome.concept));
    } else {
        Output::error(&format!("Could not render '{}'", outcome.concept));
    }

    if let Some(path) = outcome.render.artifact_path() {
        Output::kv("Video", &path.display().to_string());
    }
    Output::kv("Attempts", &outcome.attempts.to_string());
    Output::kv(
        "Render time",
        &format_duration(outcome.render.render_duration().as_secs_f64()),
    );
    if !outcome.visual_elements.is_empty() {
        Output::kv("Elements", &outcome.visual_elements.join(", "));
    }
    for point in &outcome.sync_points {
        Output::list_item(&format!("{}s {} ({})", point.time, point.event, point.description));
    }

    if let Some(error) = &outcome.error {
        Output::header("Render error");
        println!("{}", error);
    }

    if let Some(report) = &outcome.report {
        Output::report(report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request_from_options() {
        let options = GenerateOptions {
            complexity: "advanced".into(),
            duration: Some(30.0),
            color_scheme: vec!["primary = BLUE".into()],
            sync: vec!["5:tangent".into()],
            ..GenerateOptions::default()
        };

        let request = build_request("derivatives", &options).unwrap();
        assert_eq!(request.complexity(), ComplexityTier::Advanced);
        assert_eq!(request.target_duration(), Some(30.0));
        assert_eq!(request.style().color_scheme.get("primary").map(String::as_str), Some("BLUE"));
        assert_eq!(request.sync_markers()[0].label, "tangent");
    }

    #[test]
    fn test_build_request_rejects_bad_input() {
        let bad_complexity = GenerateOptions { complexity: "genius".into(), ..GenerateOptions::default() };
        assert!(build_request("x", &bad_complexity).is_err());

        let bad_color = GenerateOptions {
            complexity: "beginner".into(),
            color_scheme: vec!["BLUE".into()],
            ..GenerateOptions::default()
        };
        assert!(build_request("x", &bad_color).is_err());
    }
}
