//! Error types for the Maestro orchestration engine.
//!
//! This crate provides the foundation error types used throughout the Maestro
//! workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error
//! handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use maestro_error::{MaestroResult, ConfigError};
//!
//! fn load_pipeline() -> MaestroResult<String> {
//!     Err(ConfigError::new("runs list is empty"))?
//! }
//!
//! match load_pipeline() {
//!     Ok(name) => println!("Loaded: {}", name),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod action;
mod config;
mod context;
mod error;
mod json;
mod provider;
mod response;
mod story;
mod strategy;

pub use action::{ActionError, ActionErrorKind};
pub use config::ConfigError;
pub use context::{ContextError, ContextErrorKind};
pub use error::{MaestroError, MaestroErrorKind, MaestroResult};
pub use json::JsonError;
pub use provider::{ProviderError, ProviderErrorKind, RetryableError};
pub use response::{ResponseError, ResponseErrorKind};
pub use story::StoryError;
pub use strategy::{StrategyError, StrategyErrorKind};
