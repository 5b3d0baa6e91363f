//! Context aggregation error types.

/// Specific error conditions for context loading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ContextErrorKind {
    /// A referenced context source does not exist
    #[display("Context source not found: {}", _0)]
    MissingSource(String),
    /// A referenced context source exists but could not be read
    #[display("Context source unreadable: {}: {}", path, message)]
    Unreadable {
        /// Path to the unreadable source
        path: String,
        /// Underlying I/O message
        message: String,
    },
}

/// Error type for context aggregation.
///
/// A context error is fatal to the enclosing attempt and is never retried:
/// a missing file is not transient, and proceeding with partial context
/// would break determinism.
///
/// # Examples
///
/// ```
/// use maestro_error::{ContextError, ContextErrorKind};
///
/// let err = ContextError::new(ContextErrorKind::MissingSource("notes.md".into()));
/// assert!(format!("{}", err).contains("notes.md"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Context Error: {} at line {} in {}", kind, line, file)]
pub struct ContextError {
    /// The specific error condition
    pub kind: ContextErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl ContextError {
    /// Create a new ContextError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ContextErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
