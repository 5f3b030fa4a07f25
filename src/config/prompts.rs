//! Prompt templates for Manimate.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const PLACEHOLDER_PATTERN: &str = r"\{\{(\w+)\}\}";

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub generation: GenerationPrompts,
    pub vision: VisionPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

/// Prompts for writing and repairing Manim programs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationPrompts {
    pub system: String,
    pub user: String,
    pub fix: String,
}

impl Default for GenerationPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are an expert Manim developer creating educational animations.

MANIM QUICK REFERENCE:
- Scene class: All animations inherit from Scene
- self.play(): Main animation method
- Create, Write, FadeIn, FadeOut: Basic animations
- Transform, ReplacementTransform: Morphing animations
- MathTex, Tex: LaTeX rendering
- NumberPlane, Axes: Coordinate systems
- Circle, Square, Rectangle, Line: Basic shapes
- VGroup: Group objects together
- self.wait(): Pause between animations

STYLE GUIDELINES:
- Use smooth transitions (run_time=1-2 seconds typically)
- Layer complexity gradually
- Use color to highlight important concepts
- Include helpful annotations and labels
- Keep titles, labels and equations from overlapping each other or the axes
- Keep all text inside the frame

CONTEXT INTEGRATION:
- Adapt pacing based on duration requirements
- Sync key moments with script narration
- Apply style directions to color schemes and transitions
- Create clear visual hierarchy

Generate clean, well-commented Manim code that renders successfully.
Define exactly one Scene subclass.
IMPORTANT: Always include 'from manim import *' at the top of your code."#
                .to_string(),

            user: r#"Create a Manim animation to visualize: {{concept}}
Audience level: {{complexity}}"#
                .to_string(),

            fix: r#"The following Manim code for "{{concept}}" failed to render with this error:

{{error}}

Code:
```python
{{code}}
```

Please fix it. Return the complete corrected program in a single python code block."#
                .to_string(),
        }
    }
}

/// Prompts for frame-level aesthetic analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionPrompts {
    pub instruction: String,
}

impl Default for VisionPrompts {
    fn default() -> Self {
        Self {
            instruction: r#"Analyze this mathematical animation frame for aesthetic issues:

LOOK FOR:
- Text overlapping with axes, graphs, or other mathematical objects
- Poor spacing between elements
- Titles positioned too high or low
- Y-axis labels overlapping with content
- Equations positioned awkwardly
- Text running off screen
- Unreadable or too-small text

For each issue found, specify:
1. What element has the problem (title, y_axis_label, equation, etc.)
2. What the problem is (overlaps with graph, too close to axes, etc.)
3. Suggested fix (move down 1-2 units, increase spacing, etc.)

Format each issue on its own line as:
element - problem - fix

If no issues: "No issues detected""#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let generation_path = custom_path.join("generation.toml");
            if generation_path.exists() {
                let content = std::fs::read_to_string(&generation_path)?;
                prompts.generation = toml::from_str(&content)?;
            }

            let vision_path = custom_path.join("vision.toml");
            if vision_path.exists() {
                let content = std::fs::read_to_string(&vision_path)?;
                prompts.vision = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    ///
    /// Substitution is a single pass: placeholders inside substituted values are
    /// left as they are. Unknown placeholders are kept verbatim.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let Ok(placeholder) = Regex::new(PLACEHOLDER_PATTERN) else {
            return template.to_string();
        };
        placeholder
            .replace_all(template, |caps: &Captures| match vars.get(&caps[1]) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            })
            .into_owned()
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.generation.system.contains("from manim import *"));
        assert!(prompts.generation.fix.contains("{{error}}"));
        assert!(prompts.vision.instruction.contains("element - problem - fix"));
    }

    #[test]
    fn test_render_template() {
        let template = "Visualize {{concept}} for {{complexity}} learners.";
        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), "eigenvectors".to_string());
        vars.insert("complexity".to_string(), "advanced".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(result, "Visualize eigenvectors for advanced learners.");
    }

    #[test]
    fn test_substituted_values_are_not_rendered_again() {
        let template = "Fix {{concept}}.\nError: {{error}}\nCode:\n{{code}}";
        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), "limits".to_string());
        vars.insert("error".to_string(), "KeyError: '{{code}}'".to_string());
        vars.insert("code".to_string(), "title = Tex(\"{{concept}} and {{error}}\")".to_string());

        let result = Prompts::render(template, &vars);
        assert_eq!(
            result,
            "Fix limits.\nError: KeyError: '{{code}}'\nCode:\ntitle = Tex(\"{{concept}} and {{error}}\")"
        );
    }

    #[test]
    fn test_unknown_placeholders_are_kept() {
        let result = Prompts::render("{{concept}} in {{language}}", &HashMap::new());
        assert_eq!(result, "{{concept}} in {{language}}");
    }

    #[test]
    fn test_provided_vars_override_custom() {
        let mut prompts = Prompts::default();
        prompts.variables.insert("concept".to_string(), "default".to_string());
        prompts.variables.insert("channel".to_string(), "Math Hour".to_string());

        let mut vars = HashMap::new();
        vars.insert("concept".to_string(), "limits".to_string());

        let result = prompts.render_with_custom("{{concept}} on {{channel}}", &vars);
        assert_eq!(result, "limits on Math Hour");
    }

    #[test]
    fn test_load_custom_vision_prompt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("vision.toml"),
            "instruction = \"Only check the title.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str(), None).unwrap();
        assert_eq!(prompts.vision.instruction, "Only check the title.");
        assert!(prompts.generation.system.contains("Manim"));
    }
}
