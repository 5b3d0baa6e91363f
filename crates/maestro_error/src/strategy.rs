//! Strategy arbitration error types.

/// Specific error conditions for strategy arbitration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StrategyErrorKind {
    /// All attempts were consumed, or no strategy was configured
    #[display("Strategy exhausted after {} attempt(s)", consumed)]
    Exhausted {
        /// Attempts consumed before exhaustion (including the zeroth)
        consumed: usize,
    },
    /// A run requested a rerun but declared no strategy
    #[display("Run '{}' requested a rerun but declares no strategy", _0)]
    NoStrategy(String),
}

/// Error type for strategy arbitration.
///
/// Exhaustion marks the run `Failed`; pipeline policy decides whether that
/// halts the pipeline or is logged and skipped.
///
/// # Examples
///
/// ```
/// use maestro_error::{StrategyError, StrategyErrorKind};
///
/// let err = StrategyError::new(StrategyErrorKind::Exhausted { consumed: 3 });
/// assert!(format!("{}", err).contains("3 attempt"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Strategy Error: {} at line {} in {}", kind, line, file)]
pub struct StrategyError {
    /// The specific error condition
    pub kind: StrategyErrorKind,
    /// Line number where the error occurred
    pub line: u32,
    /// Source file where the error occurred
    pub file: &'static str,
}

impl StrategyError {
    /// Create a new StrategyError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StrategyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
