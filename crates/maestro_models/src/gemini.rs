//! Google Gemini REST adapter.

use async_trait::async_trait;
use maestro_core::{ProviderRequest, RawResponse, Role};
use maestro_error::{MaestroResult, ProviderError, ProviderErrorKind};
use maestro_interface::ProviderDriver;
use serde_json::json;
use std::env;
use tracing::instrument;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Client for the Gemini `generateContent` REST endpoint.
///
/// Gemini has no native multi-message chat payload in this mode, so the
/// rendered conversation is flattened: the first system message becomes the
/// `system_instruction`, the rest are concatenated with role labels into a
/// single prompt. The reply text is re-wrapped in a chat-completions
/// envelope so the engine's parser sees one transport shape regardless of
/// vendor.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a new client from environment configuration.
    ///
    /// Reads the API key from `GEMINI_API_KEY`.
    #[instrument(name = "gemini_client_new")]
    pub fn new() -> MaestroResult<Self> {
        let api_key = env::var("GEMINI_API_KEY").map_err(|_| {
            ProviderError::new(ProviderErrorKind::Auth(
                "GEMINI_API_KEY environment variable not set".to_string(),
            ))
        })?;
        let base_url =
            env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
            base_url,
        })
    }

    /// Split the conversation into a system instruction and a flat prompt.
    fn flatten_messages(req: &ProviderRequest) -> (Option<String>, String) {
        let mut system_instruction = None;
        let mut parts = Vec::new();

        for msg in &req.messages {
            if msg.role == Role::System && system_instruction.is_none() {
                system_instruction = Some(msg.content.clone());
                continue;
            }
            parts.push(format!(
                "{}: {}",
                msg.role.to_string().to_uppercase(),
                msg.content
            ));
        }

        let mut prompt = parts.join("\n\n").trim().to_string();
        if prompt.is_empty() {
            // generateContent rejects empty contents
            prompt = "USER: (empty prompt)".to_string();
        }
        (system_instruction, prompt)
    }

    fn build_payload(req: &ProviderRequest) -> serde_json::Value {
        let (system_instruction, prompt) = Self::flatten_messages(req);

        let mut generation_config = json!({});
        let cfg = generation_config.as_object_mut().expect("object");
        if let Some(t) = req.temperature {
            cfg.insert("temperature".into(), json!(t));
        }
        if let Some(p) = req.top_p {
            cfg.insert("topP".into(), json!(p));
        }
        if let Some(m) = req.max_tokens {
            cfg.insert("maxOutputTokens".into(), json!(m));
        }
        if req.response_shape.is_some() {
            cfg.insert("responseMimeType".into(), json!("application/json"));
        }

        let mut payload = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });
        if let Some(system) = system_instruction {
            payload.as_object_mut().expect("object").insert(
                "systemInstruction".into(),
                json!({ "parts": [{ "text": system }] }),
            );
        }
        payload
    }

    /// Extract the reply text and re-wrap it as a chat-completions envelope.
    fn wrap_reply(value: &serde_json::Value) -> MaestroResult<RawResponse> {
        let text = value
            .pointer("/candidates/0/content/parts/0/text")
            .and_then(|t| t.as_str())
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::BadPayload(
                    "response carries no candidate text".to_string(),
                ))
            })?;

        // Keep the content a JSON object when the model complied, raw text
        // otherwise; the parser reports the shape error either way.
        let content: serde_json::Value = serde_json::from_str(text)
            .unwrap_or_else(|_| json!({ "content": text }));

        Ok(RawResponse::new(json!({
            "choices": [{ "message": { "content": content } }]
        })))
    }
}

#[async_trait]
impl ProviderDriver for GeminiClient {
    #[instrument(skip(self, req), fields(model = %req.model))]
    async fn invoke(&self, req: &ProviderRequest) -> MaestroResult<RawResponse> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, req.model, self.api_key
        );
        let payload = Self::build_payload(req);

        let response = self
            .http
            .post(&url)
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

        tracing::debug!(status = status.as_u16(), "generateContent received");
        Self::wrap_reply(&value)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_core::Message;

    fn request(messages: Vec<Message>) -> ProviderRequest {
        ProviderRequest {
            model: "gemini-2.0-flash".into(),
            messages,
            ..Default::default()
        }
    }

    #[test]
    fn first_system_message_becomes_instruction() {
        let req = request(vec![
            Message::new(Role::System, "You are terse."),
            Message::new(Role::User, "hello"),
        ]);
        let (system, prompt) = GeminiClient::flatten_messages(&req);
        assert_eq!(system.as_deref(), Some("You are terse."));
        assert_eq!(prompt, "USER: hello");
    }

    #[test]
    fn empty_conversation_gets_a_placeholder_prompt() {
        let req = request(vec![Message::new(Role::System, "rules")]);
        let (_, prompt) = GeminiClient::flatten_messages(&req);
        assert_eq!(prompt, "USER: (empty prompt)");
    }

    #[test]
    fn reply_text_is_rewrapped_as_chat_envelope() {
        let reply = json!({
            "candidates": [{ "content": { "parts": [{
                "text": "{\"agent\":{\"actions\":[{\"type\":\"continue\",\"params\":{}}]}}"
            }] } }]
        });
        let wrapped = GeminiClient::wrap_reply(&reply).unwrap();
        assert!(
            wrapped.payload["choices"][0]["message"]["content"]["agent"]["actions"].is_array()
        );
    }
}
