//! Maestro - deterministic LLM pipeline orchestration.
//!
//! Maestro drives multi-step interactions with LLM providers from
//! declarative TOML definitions: it resolves a prompt profile, merges
//! external context, invokes a provider through a retrying gateway, parses
//! a structured action response, executes a bounded vocabulary of actions,
//! and, on validation failure, arbitrates a rerun over a fixed strategy
//! of alternative attempts. Every transition lands in an append-only
//! pipeline story, so any execution can be reconstructed after the fact.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use maestro::{LoadedPipeline, PipelineConfig, PipelineRunner, ProviderGateway};
//! use maestro::OpenAiClient;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> maestro::MaestroResult<()> {
//!     let config = PipelineConfig::from_file("pipeline.toml")?;
//!     let pipeline = LoadedPipeline::load(".", config)?;
//!     let gateway =
//!         ProviderGateway::new().with_driver("openai", Arc::new(OpenAiClient::new()?));
//!
//!     let mut runner = PipelineRunner::new(pipeline, gateway);
//!     let report = runner.run().await?;
//!     println!("{} run(s) succeeded", report.succeeded());
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]

pub use maestro_core::{
    ActionKind, ActionRecord, Message, ProviderRequest, RawResponse, Role, StoryEntry, StoryEvent,
};
pub use maestro_error::{MaestroError, MaestroErrorKind, MaestroResult};
pub use maestro_interface::{PipelineReport, ProviderDriver, RunReport, TerminalState};
pub use maestro_models::{GeminiClient, OpenAiClient, ScriptedDriver, ScriptedReply};
pub use maestro_pipeline::{
    ContextAggregator, ContextPool, LoadedPipeline, PipelineConfig, PipelineRunner, PipelineStory,
    ProfileDefinition, ProviderGateway, RetryPolicy, RunDefinition, RunExecutor, StrategyArbiter,
    StrategyDefinition,
};
