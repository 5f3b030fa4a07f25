//! Manimate CLI entry point.

use anyhow::Result;
use clap::Parser;
use manimate::cli::{commands, Cli, Commands};
use manimate::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = match &cli.config {
        Some(path) => Settings::expand_path(path),
        None => Settings::default_config_path(),
    };
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging: -v flags override the configured level
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("manimate={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // Execute command
    match &cli.command {
        Commands::Generate {
            concept,
            complexity,
            script,
            duration,
            color_scheme,
            pacing,
            style,
            sync,
            output_name,
            no_quality_check,
            json,
        } => {
            let options = commands::GenerateOptions {
                complexity: complexity.clone(),
                script: script.clone(),
                duration: *duration,
                color_scheme: color_scheme.clone(),
                pacing: pacing.clone(),
                style: style.clone(),
                sync: sync.clone(),
                output_name: output_name.clone(),
                no_quality_check: *no_quality_check,
                json: *json,
            };
            commands::run_generate(concept, options, settings).await?;
        }

        Commands::Check { videos, quick, json } => {
            commands::run_check(videos, *quick, *json, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path.clone())?;
        }
    }

    Ok(())
}
