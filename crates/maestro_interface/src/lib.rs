//! Trait definitions and execution report types for Maestro.
//!
//! This crate holds the seams between the control core and its
//! collaborators: the [`ProviderDriver`] capability trait every provider
//! adapter implements, and the report types the pipeline hands back to
//! callers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod report;
mod traits;

pub use report::{PipelineReport, RunReport, TerminalState};
pub use traits::ProviderDriver;
