//! Story entries for the pipeline audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Event kinds recorded in the pipeline story.
///
/// Every state transition the engine makes lands here; the ordered sequence
/// of entries is the reconstructable decision path for a pipeline execution.
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
pub enum StoryEvent {
    /// A run began executing
    RunStarted,
    /// An attempt began (zeroth attempt uses the run's own profile)
    AttemptStarted,
    /// Context files were merged into the prompt
    ContextMerged,
    /// The gateway dispatched a provider call
    ProviderCalled,
    /// The gateway retried a transient provider failure
    ProviderRetried,
    /// The provider call failed terminally for this attempt
    ProviderFailed,
    /// The response parsed into an action list
    ResponseParsed,
    /// An action executed to completion
    ActionCompleted,
    /// An action was denied by the allow-list
    ActionDenied,
    /// A validator check passed
    ValidatorPassed,
    /// A validator check failed
    ValidatorFailed,
    /// The response requested a rerun
    RerunRequested,
    /// The arbiter selected a strategy attempt override
    StrategyApplied,
    /// The strategy ran out of attempts
    StrategyExhausted,
    /// An error was recorded against the attempt
    ErrorRecorded,
    /// The run reached a terminal state
    RunFinished,
    /// A break action halted the pipeline
    PipelineHalted,
}

/// One immutable record in the append-only pipeline story.
///
/// # Examples
///
/// ```
/// use maestro_core::{StoryEntry, StoryEvent};
///
/// let entry = StoryEntry::now("codegen", 0, StoryEvent::RunStarted, "profile=default");
/// assert_eq!(entry.run, "codegen");
/// assert_eq!(entry.stable_line(), "codegen[0] run_started profile=default");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryEntry {
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
    /// Name of the run the event belongs to
    pub run: String,
    /// Attempt index within the run (0-based)
    pub attempt: usize,
    /// What happened
    pub event: StoryEvent,
    /// Free-form detail (error messages, action outcomes, override summaries)
    pub detail: String,
    /// Raw request/response payload, captured only when IO logging is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
}

impl StoryEntry {
    /// Create an entry stamped with the current time.
    pub fn now(
        run: impl Into<String>,
        attempt: usize,
        event: StoryEvent,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            run: run.into(),
            attempt,
            event,
            detail: detail.into(),
            payload: None,
        }
    }

    /// Attach a raw payload to the entry.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Timestamp-free rendering used for reproducibility comparisons.
    ///
    /// Two executions over identical inputs must produce identical stable
    /// lines, entry for entry.
    pub fn stable_line(&self) -> String {
        format!("{}[{}] {} {}", self.run, self.attempt, self.event, self.detail)
    }
}
