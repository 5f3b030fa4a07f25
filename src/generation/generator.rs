//! Program generation with a text model.

use super::{GeneratedProgram, GenerationRequest};
use crate::config::Prompts;
use crate::error::Result;
use crate::llm::TextModel;
use crate::model_output::strip_code_fences;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Manim object kinds reported by [`visual_elements`].
const MANIM_OBJECTS: [&str; 20] = [
    "Circle", "Square", "Rectangle", "Line", "Arrow", "Dot", "MathTex", "Tex", "Text",
    "NumberPlane", "Axes", "Graph", "VGroup", "VMobject", "FunctionGraph",
    "ParametricFunction", "Vector", "Matrix", "Table", "Code",
];

/// Writes Manim programs for generation requests.
pub struct ArtifactGenerator {
    model: Arc<dyn TextModel>,
    prompts: Prompts,
}

impl ArtifactGenerator {
    pub fn new(model: Arc<dyn TextModel>, prompts: Prompts) -> Self {
        Self { model, prompts }
    }

    /// Generate a program for the request. Invalid requests make no model call.
    #[instrument(skip(self, request), fields(concept = %request.concept()))]
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedProgram> {
        request.validate()?;

        let prompt = self.user_prompt(request)?;
        debug!("Generation prompt:\n{}", prompt);

        info!("Generating program with {}", self.model.model_name());
        let reply = self.model.complete(&self.prompts.generation.system, &prompt).await?;

        Ok(GeneratedProgram {
            source: strip_code_fences(&reply),
            concept: request.concept().to_string(),
        })
    }

    /// Ask the model to repair a program that failed to render.
    #[instrument(skip(self, program, failure_reason), fields(concept = %program.concept))]
    pub async fn generate_fix(
        &self,
        program: &GeneratedProgram,
        failure_reason: &str,
    ) -> Result<GeneratedProgram> {
        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), program.concept.clone());
        vars.insert("error".to_string(), failure_reason.to_string());
        vars.insert("code".to_string(), program.source.clone());
        let prompt = self.prompts.render_with_custom(&self.prompts.generation.fix, &vars);

        info!("Requesting fix from {}", self.model.model_name());
        let reply = self.model.complete(&self.prompts.generation.system, &prompt).await?;

        Ok(GeneratedProgram {
            source: strip_code_fences(&reply),
            concept: program.concept.clone(),
        })
    }

    fn user_prompt(&self, request: &GenerationRequest) -> Result<String> {
        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), request.concept().to_string());
        vars.insert("complexity".to_string(), request.complexity().to_string());

        let mut parts = vec![self.prompts.render_with_custom(&self.prompts.generation.user, &vars)];

        if let Some(script) = request.script_context() {
            parts.push(format!("\nScript context: {script}"));
        }
        if let Some(duration) = request.target_duration() {
            parts.push(format!("\nTarget duration: {duration} seconds"));
        }
        if !request.style().is_empty() {
            parts.push(format!("\nStyle: {}", serde_json::to_string(request.style())?));
        }
        if !request.sync_markers().is_empty() {
            parts.push(format!(
                "\nSync points: {}",
                serde_json::to_string(request.sync_markers())?
            ));
        }

        Ok(parts.join("\n"))
    }
}

/// Manim object kinds and concept tags used by a program, sorted and de-duplicated.
pub fn visual_elements(program: &GeneratedProgram) -> Vec<String> {
    let mut elements = BTreeSet::new();

    for object in MANIM_OBJECTS {
        let word = format!(r"\b{object}\b");
        if Regex::new(&word).is_ok_and(|re| re.is_match(&program.source)) {
            elements.insert(object.to_lowercase());
        }
    }

    let lower = program.source.to_lowercase();
    if lower.contains("derivative") || lower.contains("tangent") {
        elements.insert("derivative_visualization".to_string());
    }
    if lower.contains("integral") {
        elements.insert("integral_visualization".to_string());
    }
    if lower.contains("limit") {
        elements.insert("limit_visualization".to_string());
    }

    elements.into_iter().collect()
}
