//! Request and response types for provider calls.

use crate::Message;
use serde::{Deserialize, Serialize};

/// A fully rendered provider request.
///
/// This is the uniform shape the gateway hands to whichever driver is
/// selected for the attempt; adapters translate it into their own wire
/// format.
///
/// # Examples
///
/// ```
/// use maestro_core::{Message, ProviderRequest, Role};
///
/// let request = ProviderRequest::builder()
///     .model("gpt-4o".to_string())
///     .messages(vec![Message::new(Role::User, "Hello!")])
///     .temperature(Some(0.0))
///     .build()
///     .unwrap();
///
/// assert_eq!(request.messages.len(), 1);
/// ```
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Default, derive_builder::Builder,
)]
#[builder(default)]
pub struct ProviderRequest {
    /// Model identifier to use
    pub model: String,
    /// The rendered conversation messages
    pub messages: Vec<Message>,
    /// Sampling temperature (0.0 to 1.0)
    pub temperature: Option<f32>,
    /// Nucleus sampling parameter
    pub top_p: Option<f32>,
    /// Maximum number of tokens to generate
    pub max_tokens: Option<u32>,
    /// Expected response shape descriptor, passed through to providers that
    /// support constrained output
    pub response_shape: Option<serde_json::Value>,
}

impl ProviderRequest {
    /// Start building a request.
    pub fn builder() -> ProviderRequestBuilder {
        ProviderRequestBuilder::default()
    }
}

/// The raw payload a driver returned, before shape validation.
///
/// Drivers may return the canonical action envelope directly or wrap it in
/// a chat-completions transport envelope; the response parser handles both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    /// The payload as returned by the provider
    pub payload: serde_json::Value,
}

impl RawResponse {
    /// Wrap a JSON payload.
    pub fn new(payload: serde_json::Value) -> Self {
        Self { payload }
    }
}

impl From<serde_json::Value> for RawResponse {
    fn from(payload: serde_json::Value) -> Self {
        Self { payload }
    }
}
