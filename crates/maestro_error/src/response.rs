//! Response shape error types.

/// Specific error conditions for response parsing.
///
/// All variants describe a model-output defect, not a transport defect, so
/// each is a validation-class failure eligible for strategy-based rerun.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ResponseErrorKind {
    /// Response content is not valid JSON
    #[display("Response content is not valid JSON: {}", _0)]
    NotJson(String),
    /// Response content is not a JSON object
    #[display("Response content is not a JSON object")]
    NotObject,
    /// Transport envelope has an empty choices list
    #[display("Response envelope contains no choices")]
    EmptyChoices,
    /// Transport envelope choice carries no message content
    #[display("Response envelope choice carries no message content")]
    MissingContent,
    /// Top-level 'agent' object is missing or not an object
    #[display("Response missing required object 'agent'")]
    MissingAgent,
    /// 'agent.actions' is missing or not a list
    #[display("'agent.actions' must be a list")]
    MissingActions,
    /// 'agent.actions' is an empty list
    #[display("'agent.actions' must be a non-empty list")]
    EmptyActions,
    /// A single action entry is malformed
    #[display("agent.actions[{}] is malformed: {}", position, message)]
    BadAction {
        /// Index of the action within the response array
        position: usize,
        /// What was wrong with it
        message: String,
    },
    /// An action names a type outside the closed vocabulary
    #[display("agent.actions[{}] has unknown type '{}'", position, name)]
    UnknownActionType {
        /// Index of the action within the response array
        position: usize,
        /// The unrecognized type tag
        name: String,
    },
}

/// Error type for response parsing.
///
/// # Examples
///
/// ```
/// use maestro_error::{ResponseError, ResponseErrorKind};
///
/// let err = ResponseError::new(ResponseErrorKind::EmptyActions);
/// assert!(format!("{}", err).contains("non-empty"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Response Error: {} at line {} in {}", kind, line, file)]
pub struct ResponseError {
    /// The specific error condition
    pub kind: ResponseErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ResponseError {
    /// Create a new ResponseError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ResponseErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
