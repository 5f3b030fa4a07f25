//! The generate, render, inspect pipeline with a single repair retry.

use crate::config::{Prompts, Settings};
use crate::error::{ManimateError, Result};
use crate::generation::{visual_elements, ArtifactGenerator, GeneratedProgram, GenerationRequest};
use crate::inspect::{FfmpegFrames, Ffprobe, QualityThresholds, VisualInspector};
use crate::llm::{create_text_model, create_vision_model};
use crate::quality::{QualityChecker, QualityReport, QualityScorer};
use crate::render::{ManimRenderer, RenderResult, Renderer};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Where a pipeline run currently is.
#[derive(Debug)]
enum PipelineState {
    Generating,
    Rendering(GeneratedProgram),
    RenderFailed {
        program: GeneratedProgram,
        render: RenderResult,
    },
    Inspecting {
        program: GeneratedProgram,
        render: RenderResult,
    },
    Done(PipelineOutcome),
}

/// A requested sync marker as placed in the animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncPoint {
    pub time: f64,
    pub event: String,
    pub description: String,
}

/// Final result of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub success: bool,
    pub concept: String,
    /// The last program that was rendered.
    pub program: GeneratedProgram,
    pub render: RenderResult,
    /// Present only for a successful, inspected render.
    pub report: Option<QualityReport>,
    /// Generate and render cycles used (1 or 2).
    pub attempts: u32,
    pub visual_elements: Vec<String>,
    pub sync_points: Vec<SyncPoint>,
    pub error: Option<String>,
}

/// Drives generation, rendering and inspection, retrying once after a failed render.
pub struct RegenerationController {
    generator: ArtifactGenerator,
    renderer: Arc<dyn Renderer>,
    checker: Option<QualityChecker>,
    quality_check: bool,
}

impl RegenerationController {
    pub fn new(generator: ArtifactGenerator, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            generator,
            renderer,
            checker: None,
            quality_check: true,
        }
    }

    pub fn with_checker(mut self, checker: QualityChecker) -> Self {
        self.checker = Some(checker);
        self
    }

    /// Turn quality inspection on or off for subsequent runs.
    pub fn with_quality_check(mut self, enabled: bool) -> Self {
        self.quality_check = enabled;
        self
    }

    /// Build the production pipeline from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let model = create_text_model(&settings.generation)?;
        let renderer = Arc::new(ManimRenderer::new(
            &settings.render,
            settings.output_dir(),
            settings.temp_dir(),
        ));

        let scorer = QualityScorer::new(QualityThresholds::from(&settings.quality));
        let mut checker = QualityChecker::new(Arc::new(Ffprobe::new()), scorer);

        if settings.quality.visual_check {
            if crate::openai::is_api_key_configured() {
                let vision = create_vision_model(&settings.quality)?;
                checker = checker.with_visual(
                    VisualInspector::new(
                        Arc::new(FfmpegFrames::new(settings.temp_dir())),
                        vision,
                        &prompts.vision.instruction,
                    )
                    .with_sample_frames(settings.quality.sample_frames),
                );
            } else {
                warn!("OPENAI_API_KEY not set, skipping visual inspection");
            }
        }

        Ok(Self::new(ArtifactGenerator::new(model, prompts), renderer)
            .with_checker(checker)
            .with_quality_check(settings.quality.enabled))
    }

    /// Run one request to completion.
    ///
    /// Invalid requests, a first program without a scene and transport
    /// failures on the first generation are errors. Once a render has failed,
    /// every later failure ends in an outcome with `success == false`; there
    /// is at most one repair.
    #[instrument(skip(self, request), fields(concept = %request.concept()))]
    pub async fn run(&self, request: &GenerationRequest, output_name: &str) -> Result<PipelineOutcome> {
        let mut state = PipelineState::Generating;
        let mut retry_used = false;
        let mut attempts = 0;
        // First failed render, kept in case the repaired program cannot be rendered.
        let mut first_failure: Option<(GeneratedProgram, RenderResult, String)> = None;

        loop {
            state = match state {
                PipelineState::Generating => {
                    PipelineState::Rendering(self.generator.generate(request).await?)
                }

                PipelineState::Rendering(program) => {
                    let result = self.renderer.render(&program, output_name).await;
                    match (result, first_failure.take()) {
                        (Ok(render), _) => {
                            attempts += 1;
                            if render.success() {
                                PipelineState::Inspecting { program, render }
                            } else {
                                PipelineState::RenderFailed { program, render }
                            }
                        }
                        (Err(ManimateError::NoEntryPoint(_)), Some((failed, render, reason))) => {
                            warn!("Repaired program has no Scene, giving up");
                            let error = format!("{reason}\nRepaired program has no Scene");
                            PipelineState::Done(self.outcome(request, failed, render, None, attempts, Some(error)))
                        }
                        (Err(e), _) => return Err(e),
                    }
                }

                PipelineState::RenderFailed { program, render } => {
                    let reason = render
                        .failure_reason()
                        .unwrap_or("render failed without diagnostics")
                        .to_string();

                    if retry_used {
                        warn!("Render failed again, giving up");
                        PipelineState::Done(self.outcome(request, program, render, None, attempts, Some(reason)))
                    } else {
                        retry_used = true;
                        warn!("Render failed, requesting a fix");
                        let fix = self.generator.generate_fix(&program, &reason).await;
                        match fix {
                            Ok(fixed) => {
                                first_failure = Some((program, render, reason));
                                PipelineState::Rendering(fixed)
                            }
                            Err(ManimateError::Transport(e)) => {
                                warn!("Fix request failed: {}", e);
                                let error = format!("{reason}\nFix request failed: {e}");
                                PipelineState::Done(self.outcome(request, program, render, None, attempts, Some(error)))
                            }
                            Err(e) => return Err(e),
                        }
                    }
                }

                PipelineState::Inspecting { program, render } => {
                    let report = match (&self.checker, render.artifact_path()) {
                        (Some(checker), Some(path)) if self.quality_check => Some(checker.check(path).await),
                        _ => None,
                    };
                    PipelineState::Done(self.outcome(request, program, render, report, attempts, None))
                }

                PipelineState::Done(outcome) => {
                    info!(
                        "Pipeline finished: success={} after {} attempt(s)",
                        outcome.success, outcome.attempts
                    );
                    return Ok(outcome);
                }
            };
        }
    }

    fn outcome(
        &self,
        request: &GenerationRequest,
        program: GeneratedProgram,
        render: RenderResult,
        report: Option<QualityReport>,
        attempts: u32,
        error: Option<String>,
    ) -> PipelineOutcome {
        PipelineOutcome {
            success: render.success(),
            concept: request.concept().to_string(),
            visual_elements: visual_elements(&program),
            sync_points: sync_points(request),
            program,
            render,
            report,
            attempts,
            error,
        }
    }
}

fn sync_points(request: &GenerationRequest) -> Vec<SyncPoint> {
    request
        .sync_markers()
        .iter()
        .map(|m| SyncPoint {
            time: m.time_seconds,
            event: m.label.clone(),
            description: format!("Animation emphasis at {}s", m.time_seconds),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::{FakeTextModel, SyncMarker};
    use crate::inspect::{test_metrics, MetricsProbe, TechnicalMetrics};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    const PROGRAM: &str = "from manim import *\nclass Demo(Scene):\n    def construct(self):\n        self.play(Create(Circle()))\n";

    /// Renderer that fails the first `failures` calls and succeeds afterwards.
    struct FakeRenderer {
        failures: usize,
        calls: AtomicUsize,
    }

    impl FakeRenderer {
        fn failing(failures: usize) -> Self {
            Self { failures, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, program: &GeneratedProgram, output_name: &str) -> Result<RenderResult> {
            if crate::render::find_scene_name(&program.source).is_none() {
                return Err(ManimateError::NoEntryPoint(program.concept.clone()));
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                Ok(RenderResult::failed(format!("NameError on attempt {}", call + 1), Duration::ZERO))
            } else {
                Ok(RenderResult::succeeded(
                    PathBuf::from(format!("animations/{output_name}.mp4")),
                    Duration::from_secs(2),
                ))
            }
        }
    }

    struct FixedProbe;

    #[async_trait]
    impl MetricsProbe for FixedProbe {
        async fn probe(&self, _path: &Path) -> TechnicalMetrics {
            test_metrics(20.0, 1280, 720, 30.0, 4.0)
        }
    }

    fn controller(model: Arc<FakeTextModel>, renderer: Arc<FakeRenderer>) -> RegenerationController {
        let checker = QualityChecker::new(Arc::new(FixedProbe), QualityScorer::default());
        RegenerationController::new(ArtifactGenerator::new(model, Prompts::default()), renderer)
            .with_checker(checker)
    }

    #[tokio::test]
    async fn test_always_failing_render_retries_once() {
        let model = Arc::new(FakeTextModel::always(PROGRAM));
        let renderer = Arc::new(FakeRenderer::failing(usize::MAX));

        let outcome = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new("circles"), "circles")
            .await
            .unwrap();

        assert_eq!(model.call_count(), 2);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 2);
        assert!(!outcome.success);
        assert!(outcome.report.is_none());
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.concept, "circles");
        assert_eq!(outcome.error.as_deref(), Some("NameError on attempt 2"));
    }

    #[tokio::test]
    async fn test_fix_prompt_carries_render_error() {
        let model = Arc::new(FakeTextModel::always(PROGRAM));
        let renderer = Arc::new(FakeRenderer::failing(1));

        let outcome = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new("circles"), "circles")
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert!(outcome.report.is_some());
        let prompts = model.prompts.lock().unwrap();
        assert!(prompts[1].contains("NameError on attempt 1"));
    }

    #[tokio::test]
    async fn test_success_produces_report() {
        let model = Arc::new(FakeTextModel::always(PROGRAM));
        let renderer = Arc::new(FakeRenderer::failing(0));
        let request = GenerationRequest::new("circles").with_sync_markers(vec![SyncMarker {
            time_seconds: 3.0,
            label: "grow".into(),
        }]);

        let outcome = controller(model.clone(), renderer)
            .run(&request, "circles")
            .await
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(model.call_count(), 1);
        let report = outcome.report.unwrap();
        assert_eq!(report.score, 100.0);
        assert_eq!(report.artifact, PathBuf::from("animations/circles.mp4"));
        assert_eq!(outcome.visual_elements, vec!["circle"]);
        assert_eq!(
            outcome.sync_points,
            vec![SyncPoint {
                time: 3.0,
                event: "grow".into(),
                description: "Animation emphasis at 3s".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_quality_check_can_be_disabled() {
        let model = Arc::new(FakeTextModel::always(PROGRAM));
        let outcome = controller(model, Arc::new(FakeRenderer::failing(0)))
            .with_quality_check(false)
            .run(&GenerationRequest::new("circles"), "circles")
            .await
            .unwrap();

        assert!(outcome.success);
        assert!(outcome.report.is_none());
    }

    #[tokio::test]
    async fn test_missing_scene_propagates() {
        let model = Arc::new(FakeTextModel::always("print('hello')"));
        let renderer = Arc::new(FakeRenderer::failing(0));

        let result = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new("circles"), "circles")
            .await;

        assert!(matches!(result, Err(ManimateError::NoEntryPoint(_))));
        assert_eq!(model.call_count(), 1);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let model = Arc::new(FakeTextModel::always(PROGRAM));
        let renderer = Arc::new(FakeRenderer::failing(0));

        let result = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new(""), "x")
            .await;

        assert!(matches!(result, Err(ManimateError::InvalidRequest(_))));
        assert_eq!(model.call_count(), 0);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transport_failure_during_fix_finalizes() {
        let model = Arc::new(FakeTextModel::new(vec![
            Ok(PROGRAM.to_string()),
            Err(ManimateError::Transport("429 rate limited".into())),
        ]));
        let renderer = Arc::new(FakeRenderer::failing(usize::MAX));

        let outcome = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new("circles"), "circles")
            .await
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        let error = outcome.error.unwrap();
        assert!(error.contains("NameError on attempt 1"));
        assert!(error.contains("429 rate limited"));
    }

    #[tokio::test]
    async fn test_repaired_program_without_scene_finalizes() {
        let model = Arc::new(FakeTextModel::new(vec![
            Ok(PROGRAM.to_string()),
            Ok("Sorry, I cannot fix this.".to_string()),
        ]));
        let renderer = Arc::new(FakeRenderer::failing(usize::MAX));

        let outcome = controller(model.clone(), renderer.clone())
            .run(&GenerationRequest::new("circles"), "circles")
            .await
            .unwrap();

        assert!(!outcome.success);
        assert!(outcome.report.is_none());
        assert_eq!(model.call_count(), 2);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.program.source, PROGRAM.trim());
        let error = outcome.error.unwrap();
        assert!(error.contains("NameError on attempt 1"));
        assert!(error.contains("no Scene"));
    }
}
