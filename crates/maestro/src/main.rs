//! Maestro CLI binary.
//!
//! This binary provides command-line access to Maestro's functionality:
//! - Execute pipelines from TOML files (live or replayed)
//! - Validate pipeline configuration without executing

use clap::Parser;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use cli::{Cli, Commands, RetryOverrides, check_pipeline, run_pipeline};

    // Load .env for provider credentials, if present
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize tracing
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    // Execute the requested command
    match cli.command {
        Commands::Run {
            pipeline,
            project_root,
            story,
            replay,
            no_retry,
            max_retries,
            backoff_ms,
        } => {
            let overrides = RetryOverrides {
                no_retry,
                max_retries,
                backoff_ms,
            };
            let clean = run_pipeline(&pipeline, project_root, story, replay, overrides).await?;
            if !clean {
                std::process::exit(1);
            }
        }

        Commands::Check {
            pipeline,
            project_root,
        } => {
            check_pipeline(&pipeline, project_root).await?;
        }
    }

    Ok(())
}
