//! Action execution error types.

/// Specific error conditions for action execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ActionErrorKind {
    /// Action type is outside the run's allow-list
    #[display("Action '{}' is not permitted. Allowed: [{}]", action, allowed)]
    NotPermitted {
        /// The denied action type
        action: String,
        /// Comma-joined allow-list for the run
        allowed: String,
    },
    /// A required parameter is absent
    #[display("Action '{}' missing required param '{}'", action, param)]
    MissingParam {
        /// The action type
        action: String,
        /// The missing parameter name
        param: String,
    },
    /// A parameter is present but unusable
    #[display("Action '{}' param '{}' is invalid: {}", action, param, message)]
    InvalidParam {
        /// The action type
        action: String,
        /// The offending parameter name
        param: String,
        /// What was wrong with it
        message: String,
    },
    /// Filesystem operation failed
    #[display("Action I/O failed for '{}': {}", path, message)]
    Io {
        /// Path involved in the operation
        path: String,
        /// Underlying I/O message
        message: String,
    },
    /// A read targeted a path outside the workspace root
    #[display("Refusing to read outside the workspace root: {}", _0)]
    EscapesRoot(String),
    /// A validator check reported failure
    #[display("Validator check '{}' failed: {}", check, detail)]
    ValidatorFailed {
        /// Name of the check that ran
        check: String,
        /// Failure detail
        detail: String,
    },
    /// A validator action named a check that does not exist
    #[display("Unknown validator check '{}'", _0)]
    UnknownCheck(String),
}

/// Error type for action execution.
///
/// A `NotPermitted` error aborts the remaining actions in the current
/// response; the attempt is treated as failed and is eligible for rerun.
///
/// # Examples
///
/// ```
/// use maestro_error::{ActionError, ActionErrorKind};
///
/// let err = ActionError::new(ActionErrorKind::NotPermitted {
///     action: "file_write".into(),
///     allowed: "continue, validator".into(),
/// });
/// assert!(format!("{}", err).contains("not permitted"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Action Error: {} at line {} in {}", kind, line, file)]
pub struct ActionError {
    /// The specific error condition
    pub kind: ActionErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ActionError {
    /// Create a new ActionError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ActionErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
