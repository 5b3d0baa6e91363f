//! The closed action vocabulary and per-response action records.

use serde::{Deserialize, Serialize};

/// The closed vocabulary of actions a model response may request.
///
/// The vocabulary is a sum type rather than an open string registry so that
/// dispatch is exhaustive at compile time; an unrecognized tag is rejected
/// at configuration load or response parse, never silently at dispatch.
///
/// `trigger_retry` accepts `rerun` as a wire alias.
///
/// # Examples
///
/// ```
/// use maestro_core::ActionKind;
/// use std::str::FromStr;
///
/// assert_eq!(ActionKind::from_str("file_write").unwrap(), ActionKind::FileWrite);
/// assert_eq!(ActionKind::from_str("rerun").unwrap(), ActionKind::TriggerRetry);
/// assert_eq!(ActionKind::TriggerRetry.to_string(), "trigger_retry");
/// assert!(ActionKind::from_str("compile").is_err());
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    /// Write content to a target path
    FileWrite,
    /// Read a file into the shared context pool
    FileRead,
    /// Run a named check against current state/output
    Validator,
    /// Proceed to the next action or run
    Continue,
    /// Halt the whole pipeline at the next action boundary
    Break,
    /// Request strategy arbitration for the next attempt
    #[serde(alias = "rerun")]
    #[strum(to_string = "trigger_retry", serialize = "rerun")]
    TriggerRetry,
}

/// A single structured instruction decoded from a provider response.
///
/// Records are produced fresh per response and never persisted beyond the
/// pipeline story. `position` is the index within the response's action
/// array and defines execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The action type
    pub kind: ActionKind,
    /// Parameter mapping from the response
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Index within the response's action array
    pub position: usize,
}

impl ActionRecord {
    /// Fetch a string parameter, trimmed, rejecting empty values.
    pub fn param_str(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Fetch a raw parameter value.
    pub fn param(&self, name: &str) -> Option<&serde_json::Value> {
        self.params.get(name)
    }
}
