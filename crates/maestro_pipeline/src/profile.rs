//! Prompt profiles: provider binding, generation parameters, and templates.

use maestro_core::{Message, Role};
use maestro_error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use tracing::instrument;

/// One message template with unresolved placeholders.
///
/// Supported placeholders: `${agent_input}`, `${context_block}`,
/// `${task_description}`, `${rules_block}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, derive_getters::Getters)]
pub struct MessageTemplate {
    /// Role the rendered message is sent as
    role: Role,
    /// Template text
    content: String,
}

/// A prompt profile binding a provider, a model, generation parameters, and
/// an ordered list of message templates.
///
/// Immutable once loaded; attempt overrides select a different profile
/// rather than mutating this one.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct ProfileDefinition {
    /// Provider identifier the gateway resolves a driver for
    provider: String,
    /// Model identifier
    model: String,
    /// Sampling temperature
    temperature: Option<f32>,
    /// Nucleus sampling parameter
    top_p: Option<f32>,
    /// Output token cap
    max_tokens: Option<u32>,
    /// Ordered message templates
    messages: Vec<MessageTemplate>,
    /// Expected response shape descriptor, forwarded to providers that
    /// support constrained output
    response_shape: Option<serde_json::Value>,
}

/// The values substituted into a profile's templates for one attempt.
#[derive(Debug, Clone, Default)]
pub struct RenderInputs {
    /// Structured agent input, serialized into `${agent_input}`
    pub agent_input: serde_json::Value,
    /// Merged context block for `${context_block}`
    pub context_block: String,
    /// Task description for `${task_description}`
    pub task_description: String,
    /// Rules block for `${rules_block}`
    pub rules_block: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlProfile {
    provider: String,
    model: String,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    #[serde(default)]
    messages: Vec<MessageTemplate>,
    response_shape: Option<toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlProfileFile {
    profile: TomlProfile,
}

impl ProfileDefinition {
    /// Load a profile from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, the TOML is
    /// invalid, or the profile declares no messages.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse a profile from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: TomlProfileFile =
            toml::from_str(s).map_err(|e| ConfigError::new(format!("parse profile: {e}")))?;
        let toml_profile = file.profile;

        if toml_profile.provider.trim().is_empty() {
            return Err(ConfigError::new("profile.provider must not be empty"));
        }
        if toml_profile.model.trim().is_empty() {
            return Err(ConfigError::new("profile.model must not be empty"));
        }
        if toml_profile.messages.is_empty() {
            return Err(ConfigError::new("profile declares no messages"));
        }

        let response_shape = toml_profile
            .response_shape
            .map(|v| {
                serde_json::to_value(v)
                    .map_err(|e| ConfigError::new(format!("profile.response_shape: {e}")))
            })
            .transpose()?;

        Ok(Self {
            provider: toml_profile.provider,
            model: toml_profile.model,
            temperature: toml_profile.temperature,
            top_p: toml_profile.top_p,
            max_tokens: toml_profile.max_tokens,
            messages: toml_profile.messages,
            response_shape,
        })
    }

    /// Render the templates into concrete messages for one attempt.
    ///
    /// Substitution is plain text replacement; a placeholder the inputs do
    /// not cover renders as its replacement value ("" for absent blocks),
    /// never as the literal placeholder.
    pub fn render(&self, inputs: &RenderInputs) -> Vec<Message> {
        let agent_input =
            serde_json::to_string(&inputs.agent_input).unwrap_or_else(|_| "{}".to_string());

        self.messages
            .iter()
            .map(|template| {
                let content = template
                    .content
                    .replace("${agent_input}", &agent_input)
                    .replace("${context_block}", &inputs.context_block)
                    .replace("${task_description}", &inputs.task_description)
                    .replace("${rules_block}", &inputs.rules_block);
                Message::new(*template.role(), content)
            })
            .collect()
    }
}
