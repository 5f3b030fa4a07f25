//! CLI module for Manimate.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Manimate - generate, render and quality-check Manim animations
///
/// Writes a Manim program for a concept with a language model, renders it,
/// and scores the video from ffprobe metrics and vision-model frame review.
#[derive(Parser, Debug)]
#[command(name = "manimate")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate and render an animation for a concept
    Generate {
        /// Concept to visualize (e.g. "derivative as the slope of a tangent")
        concept: String,

        /// Audience level (beginner, intermediate, advanced, expert)
        #[arg(long, default_value = "intermediate")]
        complexity: String,

        /// Narration script the animation should follow
        #[arg(long)]
        script: Option<String>,

        /// Target duration in seconds
        #[arg(short, long)]
        duration: Option<f64>,

        /// Color assignments as ROLE=COLOR (repeatable)
        #[arg(long = "color-scheme", value_name = "ROLE=COLOR")]
        color_scheme: Vec<String>,

        /// Pacing hint (e.g. slow, moderate, fast)
        #[arg(long)]
        pacing: Option<String>,

        /// Visual style hint (e.g. minimal, 3blue1brown)
        #[arg(long)]
        style: Option<String>,

        /// Sync marker as TIME:LABEL (repeatable)
        #[arg(long = "sync", value_name = "TIME:LABEL")]
        sync: Vec<String>,

        /// Output file name without extension (default: derived from the concept)
        #[arg(short, long)]
        output_name: Option<String>,

        /// Skip quality inspection after rendering
        #[arg(long)]
        no_quality_check: bool,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check the quality of rendered videos
    Check {
        /// Video files to check
        #[arg(required = true)]
        videos: Vec<String>,

        /// Only check that files exist and have a plausible size
        #[arg(short, long)]
        quick: bool,

        /// Print reports as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check system requirements and configuration
    Doctor,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_generate() {
        let cli = Cli::try_parse_from([
            "manimate", "-v", "generate", "limits", "--complexity", "beginner",
            "--sync", "2:intro", "--sync", "8.5:epsilon", "--color-scheme", "primary=BLUE",
            "--no-quality-check",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 1);
        match cli.command {
            Commands::Generate { concept, complexity, sync, color_scheme, no_quality_check, json, .. } => {
                assert_eq!(concept, "limits");
                assert_eq!(complexity, "beginner");
                assert_eq!(sync, vec!["2:intro", "8.5:epsilon"]);
                assert_eq!(color_scheme, vec!["primary=BLUE"]);
                assert!(no_quality_check);
                assert!(!json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_check_requires_videos() {
        assert!(Cli::try_parse_from(["manimate", "check"]).is_err());
        assert!(Cli::try_parse_from(["manimate", "check", "a.mp4", "b.mp4", "--quick"]).is_ok());
    }
}
