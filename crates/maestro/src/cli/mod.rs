//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the
//! maestro binary.

mod commands;
mod run;

pub use commands::{Cli, Commands};
pub use run::{RetryOverrides, check_pipeline, run_pipeline};
