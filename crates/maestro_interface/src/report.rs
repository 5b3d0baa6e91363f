//! Execution report types.
//!
//! These are the shapes the pipeline runner hands back to callers: one
//! record per run with its terminal state and the attempt count consumed.

use serde::{Deserialize, Serialize};

/// Terminal state of a run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TerminalState {
    /// The run succeeded; the pipeline advances
    Continuing,
    /// The run requested a pipeline halt
    Breaking,
    /// The run failed with no recovery path (no strategy, or exhausted)
    Failed,
}

/// Result record for a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Name of the run
    pub run_name: String,
    /// Terminal state the run reached
    pub state: TerminalState,
    /// Attempts consumed (1 = succeeded on the run's own profile)
    pub attempts: usize,
}

/// Aggregated result for a pipeline execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineReport {
    /// Per-run reports in execution order; runs never reached are absent
    pub runs: Vec<RunReport>,
    /// True when a break action halted the pipeline early
    pub halted: bool,
}

impl PipelineReport {
    /// Number of runs that reached `Continuing`.
    pub fn succeeded(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.state == TerminalState::Continuing)
            .count()
    }

    /// Number of runs that reached `Failed`.
    pub fn failed(&self) -> usize {
        self.runs
            .iter()
            .filter(|r| r.state == TerminalState::Failed)
            .count()
    }
}
