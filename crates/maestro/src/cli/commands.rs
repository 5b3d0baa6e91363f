//! CLI command definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Maestro - deterministic multi-step LLM pipeline orchestration
#[derive(Parser, Debug)]
#[command(name = "maestro")]
#[command(about = "Deterministic multi-step LLM pipeline orchestration", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a pipeline from a TOML file
    Run {
        /// Path to the pipeline TOML file
        pipeline: PathBuf,

        /// Root directory relative references resolve against
        /// (default: the pipeline file's directory)
        #[arg(long)]
        project_root: Option<PathBuf>,

        /// Write the pipeline story as JSONL to this path
        #[arg(long)]
        story: Option<PathBuf>,

        /// Replay provider responses from a JSON file instead of calling
        /// real providers
        #[arg(long)]
        replay: Option<PathBuf>,

        /// Disable transient-failure retries
        #[arg(long)]
        no_retry: bool,

        /// Override the maximum retry attempts
        #[arg(long)]
        max_retries: Option<usize>,

        /// Override the initial backoff delay in milliseconds
        #[arg(long)]
        backoff_ms: Option<u64>,
    },

    /// Validate a pipeline configuration without executing it
    Check {
        /// Path to the pipeline TOML file
        pipeline: PathBuf,

        /// Root directory relative references resolve against
        #[arg(long)]
        project_root: Option<PathBuf>,
    },
}
