//! Top-level error wrapper types.

use crate::{
    ActionError, ConfigError, ContextError, JsonError, ProviderError, ResponseError, StoryError,
    StrategyError,
};

/// This is the foundation error enum. Every Maestro crate converts its
/// domain errors into one of these variants.
///
/// # Examples
///
/// ```
/// use maestro_error::{MaestroError, ConfigError};
///
/// let cfg_err = ConfigError::new("missing profile reference");
/// let err: MaestroError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum MaestroErrorKind {
    /// Configuration error (fatal at load time)
    #[from(ConfigError)]
    Config(ConfigError),
    /// Context aggregation error (fatal to the attempt)
    #[from(ContextError)]
    Context(ContextError),
    /// Provider call error (transient or fatal per its kind)
    #[from(ProviderError)]
    Provider(ProviderError),
    /// Response shape error (rerun-eligible)
    #[from(ResponseError)]
    Response(ResponseError),
    /// Action execution error
    #[from(ActionError)]
    Action(ActionError),
    /// Strategy arbitration error
    #[from(StrategyError)]
    Strategy(StrategyError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Story persistence error
    #[from(StoryError)]
    Story(StoryError),
}

/// Maestro error with kind discrimination.
///
/// # Examples
///
/// ```
/// use maestro_error::{MaestroResult, ConfigError};
///
/// fn might_fail() -> MaestroResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Maestro Error: {}", _0)]
pub struct MaestroError(Box<MaestroErrorKind>);

impl MaestroError {
    /// Create a new error from a kind.
    pub fn new(kind: MaestroErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &MaestroErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to MaestroErrorKind
impl<T> From<T> for MaestroError
where
    T: Into<MaestroErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Maestro operations.
///
/// # Examples
///
/// ```
/// use maestro_error::{MaestroResult, JsonError};
///
/// fn decode() -> MaestroResult<String> {
///     Err(JsonError::new("unexpected end of input"))?
/// }
/// ```
pub type MaestroResult<T> = std::result::Result<T, MaestroError>;
