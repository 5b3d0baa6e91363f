//! Configuration error types.

/// Configuration error with source location.
///
/// Raised while loading pipeline, profile, or strategy definitions. A
/// configuration error is fatal: it aborts the load before any run executes.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Configuration Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// Error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_error::ConfigError;
    ///
    /// let err = ConfigError::new("run 'codegen' references unknown action 'compile'");
    /// assert!(err.message.contains("unknown action"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }

    /// Convenience constructor for a profile or strategy reference that
    /// failed to resolve.
    ///
    /// # Examples
    ///
    /// ```
    /// use maestro_error::ConfigError;
    ///
    /// let err = ConfigError::reference("profile", "profiles/codegen.toml", "file not found");
    /// assert!(err.message.starts_with("profile 'profiles/codegen.toml'"));
    /// ```
    #[track_caller]
    pub fn reference(
        kind: &str,
        reference: impl std::fmt::Display,
        detail: impl std::fmt::Display,
    ) -> Self {
        Self::new(format!("{kind} '{reference}': {detail}"))
    }
}
