//! Pipeline story persistence error types.

/// Story persistence error with source location.
///
/// Raised when the append-only story log or a raw request/response capture
/// cannot be written to disk.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Story Error: {} at line {} in {}", message, line, file)]
pub struct StoryError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl StoryError {
    /// Create a new StoryError with the given message at the current location.
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
