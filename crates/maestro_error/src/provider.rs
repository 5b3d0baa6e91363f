//! Provider error types and retry classification.

/// Specific error conditions for provider calls.
///
/// Every failure is classified as transient (retried by the gateway with
/// capped exponential backoff) or fatal (propagated immediately). The
/// classification lives here, next to the variants, so adapters and the
/// gateway cannot drift apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ProviderErrorKind {
    /// Request timed out at the transport layer
    #[display("Provider request timed out")]
    Timeout,
    /// Provider signalled a rate limit (HTTP 429 or equivalent)
    #[display("Provider rate limit hit: {}", _0)]
    RateLimited(String),
    /// Server-side failure (5xx-class)
    #[display("Provider server error (HTTP {}): {}", status, message)]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message
        message: String,
    },
    /// Network-layer failure (connection refused, DNS, TLS)
    #[display("Provider network error: {}", _0)]
    Network(String),
    /// Authentication failure (missing or rejected credentials)
    #[display("Provider authentication failed: {}", _0)]
    Auth(String),
    /// The provider rejected the request as malformed
    #[display("Provider rejected request as malformed: {}", _0)]
    MalformedRequest(String),
    /// The requested model is unknown to the provider
    #[display("Unknown model '{}'", _0)]
    UnknownModel(String),
    /// No driver is registered for the requested provider id
    #[display("Unknown provider '{}'", _0)]
    UnknownProvider(String),
    /// Transient retries were exhausted without a successful response
    #[display("Provider unavailable after {} attempts", attempts)]
    Unavailable {
        /// Total call attempts made (initial call plus retries)
        attempts: usize,
    },
    /// Provider returned a payload the adapter could not interpret
    #[display("Provider response unusable: {}", _0)]
    BadPayload(String),
}

impl ProviderErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::Timeout
                | ProviderErrorKind::RateLimited(_)
                | ProviderErrorKind::ServerError { .. }
                | ProviderErrorKind::Network(_)
        )
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    pub fn retry_strategy_params(&self) -> (u64, usize, u64) {
        match self {
            ProviderErrorKind::RateLimited(_) => (5000, 3, 40),
            ProviderErrorKind::ServerError { status: 503, .. } => (2000, 5, 60),
            ProviderErrorKind::ServerError { .. } => (1000, 3, 8),
            ProviderErrorKind::Timeout => (2000, 4, 30),
            ProviderErrorKind::Network(_) => (2000, 5, 60),
            _ => (2000, 5, 60),
        }
    }
}

/// Provider error with source location tracking.
///
/// # Examples
///
/// ```
/// use maestro_error::{ProviderError, ProviderErrorKind};
///
/// let err = ProviderError::new(ProviderErrorKind::UnknownProvider("acme".into()));
/// assert!(format!("{}", err).contains("acme"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Provider Error: {} at line {} in {}", kind, line, file)]
pub struct ProviderError {
    /// The kind of error that occurred
    pub kind: ProviderErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ProviderError {
    /// Create a new ProviderError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ProviderErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit), or
/// network timeouts should return true. Permanent errors like 401
/// (unauthorized) or 400 (bad request) should return false.
///
/// # Examples
///
/// ```
/// use maestro_error::{ProviderError, ProviderErrorKind, RetryableError};
///
/// let err = ProviderError::new(ProviderErrorKind::ServerError {
///     status: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, retries, max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(retries, 5);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters for this error.
    ///
    /// Returns `(initial_backoff_ms, max_retries, max_delay_secs)`.
    /// Default implementation returns standard parameters.
    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        (2000, 5, 60)
    }
}

impl RetryableError for ProviderError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    fn retry_strategy_params(&self) -> (u64, usize, u64) {
        self.kind.retry_strategy_params()
    }
}
