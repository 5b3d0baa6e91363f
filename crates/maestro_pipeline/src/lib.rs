//! Control core for the Maestro orchestration engine.
//!
//! This crate drives one pipeline execution end to end: it loads the
//! declarative pipeline/profile/strategy definitions, merges external
//! context, renders prompts, calls providers through a retrying gateway,
//! parses structured action responses, executes the bounded action
//! vocabulary, and arbitrates strategy-based reruns, appending every
//! transition to the pipeline story.
//!
//! Execution is strictly sequential: runs, attempts, and actions
//! each execute one at a time in declared order, which is what makes the
//! story log and the file-system side effects reproducible.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod actions;
mod config;
mod context;
mod executor;
mod gateway;
mod parser;
mod pipeline;
mod profile;
mod story;
mod strategy;

pub use actions::{ActionEngine, EngineSignal};
pub use config::{IoLogSettings, PipelineConfig, RetryPolicy, RunDefinition};
pub use context::{ContextAggregator, ContextPool};
pub use executor::{AttemptState, PhaseOutcome, RunExecution, RunExecutor, RunPhase};
pub use gateway::ProviderGateway;
pub use parser::parse_actions;
pub use pipeline::{LoadedPipeline, PipelineRunner, PipelineState};
pub use profile::{MessageTemplate, ProfileDefinition, RenderInputs};
pub use story::{IoLogger, PipelineStory};
pub use strategy::{Arbitration, AttemptOverride, StrategyArbiter, StrategyDefinition};
