//! OpenAI-compatible chat completions adapter.

use async_trait::async_trait;
use maestro_core::{ProviderRequest, RawResponse};
use maestro_error::{MaestroResult, ProviderError, ProviderErrorKind};
use maestro_interface::ProviderDriver;
use serde_json::json;
use std::env;
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat completion endpoints.
///
/// Reads the API key from `OPENAI_API_KEY`; `OPENAI_BASE_URL` overrides the
/// endpoint for compatible gateways. Returns the provider's response
/// envelope untouched; the engine's parser unwraps
/// `choices[0].message.content`.
///
/// # Example
///
/// ```no_run
/// use maestro_models::OpenAiClient;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OpenAiClient::new()?;
/// # Ok(())
/// # }
/// ```
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a new client from environment configuration.
    #[instrument(name = "openai_client_new")]
    pub fn new() -> MaestroResult<Self> {
        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::new(ProviderErrorKind::Auth(
                "OPENAI_API_KEY environment variable not set".to_string(),
            ))
        })?;
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        })
    }

    /// Build the chat-completions payload from a uniform request.
    fn build_payload(req: &ProviderRequest) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = req
            .messages
            .iter()
            .map(|m| json!({ "role": m.role, "content": m.content }))
            .collect();

        let mut payload = json!({
            "model": req.model,
            "messages": messages,
        });
        let obj = payload.as_object_mut().expect("payload is an object");
        if let Some(t) = req.temperature {
            obj.insert("temperature".into(), json!(t));
        }
        if let Some(p) = req.top_p {
            obj.insert("top_p".into(), json!(p));
        }
        if let Some(m) = req.max_tokens {
            obj.insert("max_tokens".into(), json!(m));
        }
        if req.response_shape.is_some() {
            // Constrained-output hint; the engine validates the envelope
            // itself, so json_object mode is enough here.
            obj.insert("response_format".into(), json!({ "type": "json_object" }));
        }
        payload
    }
}

#[async_trait]
impl ProviderDriver for OpenAiClient {
    #[instrument(skip(self, req), fields(model = %req.model))]
    async fn invoke(&self, req: &ProviderRequest) -> MaestroResult<RawResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = Self::build_payload(req);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(crate::classify_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(crate::classify_status(status.as_u16(), body).into());
        }

        let value: serde_json::Value = response.json().await.map_err(|e| {
            ProviderError::new(ProviderErrorKind::BadPayload(e.to_string()))
        })?;

        tracing::debug!(status = status.as_u16(), "chat completion received");
        Ok(RawResponse::new(value))
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
