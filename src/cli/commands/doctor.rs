//! Doctor command - report whether rendering and inspection can run here.

use crate::cli::preflight::api_key_var;
use crate::cli::Output;
use crate::config::Settings;
use console::style;
use std::path::Path;
use std::process::Command;

#[derive(Debug, PartialEq)]
enum Status {
    Ok,
    /// Usable, with a hint on what is degraded.
    Warning(String),
    /// Blocks rendering or inspection; carries the fix.
    Error(String),
}

#[derive(Debug)]
struct Check {
    name: String,
    detail: String,
    status: Status,
}

impl Check {
    fn new(name: &str, detail: impl Into<String>, status: Status) -> Self {
        Self {
            name: name.to_string(),
            detail: detail.into(),
            status,
        }
    }

    fn print(&self) {
        let (icon, hint) = match &self.status {
            Status::Ok => (style("✓").green(), None),
            Status::Warning(hint) => (style("!").yellow(), Some(hint)),
            Status::Error(hint) => (style("✗").red(), Some(hint)),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.detail);
        if let Some(hint) = hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostics. Fails when anything needed to render is missing.
pub fn run_doctor(settings: &Settings, config_path: &Path) -> anyhow::Result<()> {
    Output::header("Manimate Doctor");

    let sections = [
        ("Rendering", vec![tool_check(&settings.render.command, "--version")]),
        (
            "Inspection",
            vec![tool_check("ffprobe", "-version"), tool_check("ffmpeg", "-version")],
        ),
        ("API keys", api_key_checks(settings)),
        (
            "Files",
            vec![
                output_check(&settings.output_dir()),
                temp_check(&settings.temp_dir()),
                config_check(config_path),
            ],
        ),
    ];

    for (title, checks) in &sections {
        println!("\n{}", style(title).bold());
        for check in checks {
            check.print();
        }
    }
    println!();

    let checks = sections.iter().flat_map(|(_, checks)| checks);
    let errors = checks.clone().filter(|c| matches!(c.status, Status::Error(_))).count();
    let warnings = checks.filter(|c| matches!(c.status, Status::Warning(_))).count();

    if errors > 0 {
        anyhow::bail!("{} check(s) failed, fix them before rendering", errors);
    }
    if warnings > 0 {
        Output::warning(&format!("Ready to render, with {} warning(s).", warnings));
    } else {
        Output::success("Ready to render and inspect animations.");
    }
    Ok(())
}

/// Run `<tool> <version_arg>` and report the first line of its output.
fn tool_check(tool: &str, version_arg: &str) -> Check {
    let hint = install_hint(tool).to_string();
    match Command::new(tool).arg(version_arg).output() {
        Ok(output) if output.status.success() => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let version = stdout.lines().next().unwrap_or("installed").trim();
            Check::new(tool, version.chars().take(50).collect::<String>(), Status::Ok)
        }
        Ok(output) => Check::new(tool, format!("exited with {}", output.status), Status::Error(hint)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Check::new(tool, "not found", Status::Error(hint))
        }
        Err(e) => Check::new(tool, format!("error: {}", e), Status::Error(hint)),
    }
}

fn install_hint(tool: &str) -> &'static str {
    match tool {
        "ffmpeg" | "ffprobe" if cfg!(target_os = "macos") => "Install with: brew install ffmpeg",
        "ffmpeg" | "ffprobe" => "Install with: sudo apt install ffmpeg (or your package manager)",
        _ if cfg!(target_os = "macos") => "Install with: brew install py3cairo ffmpeg && pip install manim",
        _ => "Install with: pip install manim (see https://docs.manim.community)",
    }
}

/// The generation provider's key, plus the OpenAI key when frames are sent to the vision model.
fn api_key_checks(settings: &Settings) -> Vec<Check> {
    let generation_var = api_key_var(settings.generation.provider);
    let mut checks = vec![key_check(generation_var, "needed to generate programs", true)];

    if settings.quality.visual_check && generation_var != "OPENAI_API_KEY" {
        checks.push(key_check("OPENAI_API_KEY", "visual inspection will be skipped", false));
    }
    checks
}

fn key_check(var: &str, missing: &str, required: bool) -> Check {
    let set_hint = format!("Set with: export {}='...'", var);
    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Check::new(var, "configured", Status::Ok),
        _ if required => Check::new(var, format!("not set, {}", missing), Status::Error(set_hint)),
        _ => Check::new(var, format!("not set, {}", missing), Status::Warning(set_hint)),
    }
}

fn output_check(dir: &Path) -> Check {
    if dir.is_dir() {
        Check::new(
            "Output directory",
            format!("{} ({} rendered video(s))", dir.display(), count_videos(dir)),
            Status::Ok,
        )
    } else {
        Check::new(
            "Output directory",
            format!("{} (created on first render)", dir.display()),
            Status::Ok,
        )
    }
}

fn temp_check(dir: &Path) -> Check {
    match std::fs::metadata(dir) {
        Ok(meta) if meta.permissions().readonly() => Check::new(
            "Temp directory",
            format!("{} is read-only", dir.display()),
            Status::Error("Point general.temp_dir at a writable directory".to_string()),
        ),
        _ => Check::new("Temp directory", dir.display().to_string(), Status::Ok),
    }
}

fn config_check(config_path: &Path) -> Check {
    if config_path.exists() {
        Check::new("Config file", config_path.display().to_string(), Status::Ok)
    } else {
        Check::new(
            "Config file",
            format!("{} not found, using defaults", config_path.display()),
            Status::Warning("Create it with: manimate config edit".to_string()),
        )
    }
}

/// Number of `.mp4` files below `dir`, including Manim's nested media folders.
fn count_videos(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .flatten()
        .map(|entry| {
            let path = entry.path();
            if path.is_dir() {
                count_videos(&path)
            } else {
                usize::from(path.extension().is_some_and(|ext| ext == "mp4"))
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenerationProvider;

    #[test]
    fn test_missing_tool_is_error() {
        let check = tool_check("definitely-not-a-real-tool-xyz", "--version");
        assert!(matches!(check.status, Status::Error(_)));
        assert_eq!(check.detail, "not found");
    }

    #[test]
    fn test_missing_key_severity() {
        let optional = key_check("MANIMATE_TEST_UNSET_KEY_XYZ", "skipped", false);
        assert!(matches!(optional.status, Status::Warning(_)));

        let required = key_check("MANIMATE_TEST_UNSET_KEY_XYZ", "needed", true);
        assert!(matches!(required.status, Status::Error(_)));
    }

    #[test]
    fn test_vision_key_checked_only_with_visual_inspection() {
        let mut settings = Settings::default();
        settings.generation.provider = GenerationProvider::Anthropic;

        settings.quality.visual_check = true;
        let names: Vec<_> = api_key_checks(&settings).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ANTHROPIC_API_KEY", "OPENAI_API_KEY"]);

        settings.quality.visual_check = false;
        let names: Vec<_> = api_key_checks(&settings).into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["ANTHROPIC_API_KEY"]);
    }

    #[test]
    fn test_count_videos_recurses() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("videos/scene_x/720p30");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("a.mp4"), b"video").unwrap();
        std::fs::write(nested.join("b.mp4"), b"video").unwrap();
        std::fs::write(nested.join("scene_x.py"), b"code").unwrap();

        assert_eq!(count_videos(dir.path()), 2);
        assert_eq!(count_videos(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_missing_config_file_is_warning() {
        let dir = tempfile::tempdir().unwrap();
        let check = config_check(&dir.path().join("config.toml"));
        assert!(matches!(check.status, Status::Warning(_)));
        assert!(check.detail.contains("using defaults"));
    }
}
