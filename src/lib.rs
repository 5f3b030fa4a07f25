//! Manimate - generate, render and quality-check Manim animations
//!
//! Turns a concept into an educational animation: a language model writes a
//! Manim program, the Manim CLI renders it, and the video is scored from
//! ffprobe metrics and a vision model's review of sampled frames. A failed
//! render is fed back to the model for one repair attempt.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Text and vision model clients
//! - `generation` - Generation requests and the program generator
//! - `render` - Rendering programs with the Manim CLI
//! - `inspect` - Technical (ffprobe) and visual (frame sampling) inspection
//! - `quality` - Issues, scoring and quality reports
//! - `pipeline` - The generate, render, inspect loop with a single retry
//!
//! # Example
//!
//! ```rust,no_run
//! use manimate::config::Settings;
//! use manimate::generation::GenerationRequest;
//! use manimate::pipeline::RegenerationController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let controller = RegenerationController::from_settings(&settings)?;
//!
//!     let request = GenerationRequest::new("the derivative as the slope of a tangent");
//!     let outcome = controller.run(&request, "derivative").await?;
//!     if let Some(report) = outcome.report {
//!         println!("Scored {:.0} ({})", report.score, report.tier);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod generation;
pub mod inspect;
pub mod llm;
pub mod model_output;
pub mod openai;
pub mod pipeline;
pub mod quality;
pub mod render;

pub use error::{ManimateError, Result};
