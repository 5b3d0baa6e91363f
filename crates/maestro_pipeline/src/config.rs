//! Pipeline configuration: TOML deserialization and validated domain types.
//!
//! Configuration is loaded through intermediate `Toml*` structs and
//! converted into immutable domain types, with every cross-reference
//! checked up front. A bad configuration never reaches execution.

use maestro_core::ActionKind;
use maestro_error::ConfigError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::instrument;

/// Transient-failure retry policy for provider calls.
///
/// Applied inside the gateway, so retry semantics are provider-call-scoped,
/// not attempt-scoped. A limit of zero disables retries entirely.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, derive_getters::Getters)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial call
    pub(crate) limit: usize,
    /// Initial backoff delay in milliseconds
    pub(crate) backoff_ms: u64,
    /// Cap applied to any single backoff delay, in seconds
    pub(crate) max_delay_secs: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            limit: 3,
            backoff_ms: 500,
            max_delay_secs: 60,
        }
    }
}

impl RetryPolicy {
    /// Create a policy from explicit parameters.
    pub fn new(limit: usize, backoff_ms: u64, max_delay_secs: u64) -> Self {
        Self {
            limit,
            backoff_ms,
            max_delay_secs,
        }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            limit: 0,
            ..Self::default()
        }
    }

    /// Derive a policy with a different retry limit.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Derive a policy with a different initial backoff.
    pub fn with_backoff_ms(mut self, backoff_ms: u64) -> Self {
        self.backoff_ms = backoff_ms;
        self
    }
}

/// Settings for raw request/response capture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, derive_getters::Getters)]
#[serde(default)]
pub struct IoLogSettings {
    /// Whether captures are written at all
    pub(crate) enabled: bool,
    /// Directory for capture files, relative to the project root
    pub(crate) dir: PathBuf,
}

impl Default for IoLogSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            dir: PathBuf::from("logs/io"),
        }
    }
}

/// One named unit of pipeline work.
///
/// Immutable once loaded; strategy overrides derive ephemeral attempt
/// configurations rather than mutating this.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct RunDefinition {
    /// Unique name within the pipeline
    name: String,
    /// Profile file reference
    profile: PathBuf,
    /// Ordered context file references
    context_files: Vec<PathBuf>,
    /// Target path used by write actions when the agent supplies none
    target_path: Option<PathBuf>,
    /// Closed, non-empty allow-list of action kinds
    allowed_actions: Vec<ActionKind>,
    /// Optional strategy file reference
    strategy: Option<PathBuf>,
    /// Optional task description injected into the agent input
    task_description: Option<String>,
    /// Optional per-run retry override
    retry: Option<RetryPolicy>,
}

impl RunDefinition {
    /// Whether an action kind is on this run's allow-list.
    pub fn is_allowed(&self, kind: ActionKind) -> bool {
        self.allowed_actions.contains(&kind)
    }

    /// Comma-joined allow-list for error messages and prompts.
    pub fn allowed_list(&self) -> String {
        self.allowed_actions
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The parsed, validated content of a pipeline configuration file.
#[derive(Debug, Clone, PartialEq, derive_getters::Getters)]
pub struct PipelineConfig {
    /// Pipeline name
    name: String,
    /// Whether a failed run halts the pipeline (default: log and continue)
    halt_on_failure: bool,
    /// Global retry policy for provider calls
    retry: RetryPolicy,
    /// Raw request/response capture settings
    io_log: IoLogSettings,
    /// Ordered run definitions
    runs: Vec<RunDefinition>,
}

// ---------------------------------------------------------------------------
// TOML intermediates
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct TomlPipeline {
    name: String,
    #[serde(default)]
    halt_on_failure: bool,
    #[serde(default)]
    retry: RetryPolicy,
    #[serde(default)]
    io_log: IoLogSettings,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlRun {
    name: String,
    profile: PathBuf,
    #[serde(default)]
    context_files: Vec<PathBuf>,
    target_path: Option<PathBuf>,
    allowed_actions: Vec<String>,
    strategy: Option<PathBuf>,
    task_description: Option<String>,
    retry: Option<RetryPolicy>,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlPipelineFile {
    pipeline: TomlPipeline,
    #[serde(default, rename = "run")]
    runs: Vec<TomlRun>,
}

impl PipelineConfig {
    /// Load a pipeline configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, the TOML is
    /// invalid, or validation fails (duplicate run names, empty or unknown
    /// allow-lists, no runs).
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse a pipeline configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: TomlPipelineFile =
            toml::from_str(s).map_err(|e| ConfigError::new(format!("parse pipeline: {e}")))?;

        let mut runs = Vec::with_capacity(file.runs.len());
        for toml_run in &file.runs {
            runs.push(convert_run(toml_run)?);
        }

        let config = Self {
            name: file.pipeline.name,
            halt_on_failure: file.pipeline.halt_on_failure,
            retry: file.pipeline.retry,
            io_log: file.pipeline.io_log,
            runs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Replace the retry policy pipeline-wide.
    ///
    /// Clears per-run overrides as well; used by CLI retry flags, which
    /// apply to every provider call of the invocation.
    pub fn override_retry(&mut self, policy: RetryPolicy) {
        self.retry = policy;
        for run in &mut self.runs {
            run.retry = None;
        }
    }

    /// Validate the configuration invariants.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::new("pipeline.name must not be empty"));
        }
        if self.runs.is_empty() {
            return Err(ConfigError::new("pipeline declares no runs"));
        }
        let mut seen = std::collections::HashSet::new();
        for run in &self.runs {
            if run.name.trim().is_empty() {
                return Err(ConfigError::new("run.name must not be empty"));
            }
            if !seen.insert(run.name.as_str()) {
                return Err(ConfigError::new(format!("duplicate run name '{}'", run.name)));
            }
        }
        Ok(())
    }
}

fn convert_run(toml_run: &TomlRun) -> Result<RunDefinition, ConfigError> {
    if toml_run.allowed_actions.is_empty() {
        return Err(ConfigError::new(format!(
            "run '{}' has an empty allowed_actions list",
            toml_run.name
        )));
    }

    // An unrecognized action name is a fatal configuration error, not a
    // runtime skip.
    let mut allowed = Vec::with_capacity(toml_run.allowed_actions.len());
    for tag in &toml_run.allowed_actions {
        let kind = ActionKind::from_str(tag).map_err(|_| {
            ConfigError::new(format!(
                "run '{}' references unknown action '{}'",
                toml_run.name, tag
            ))
        })?;
        if !allowed.contains(&kind) {
            allowed.push(kind);
        }
    }

    Ok(RunDefinition {
        name: toml_run.name.clone(),
        profile: toml_run.profile.clone(),
        context_files: toml_run.context_files.clone(),
        target_path: toml_run.target_path.clone(),
        allowed_actions: allowed,
        strategy: toml_run.strategy.clone(),
        task_description: toml_run.task_description.clone(),
        retry: toml_run.retry.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [pipeline]
        name = "demo"

        [[run]]
        name = "codegen"
        profile = "profiles/codegen.toml"
        allowed_actions = ["file_write", "continue"]
    "#;

    #[test]
    fn minimal_pipeline_parses() {
        let config = PipelineConfig::from_toml_str(MINIMAL).unwrap();
        assert_eq!(config.name(), "demo");
        assert!(!config.halt_on_failure());
        assert_eq!(config.runs().len(), 1);
        assert_eq!(*config.retry().limit(), 3);
        let run = &config.runs()[0];
        assert!(run.is_allowed(ActionKind::FileWrite));
        assert!(!run.is_allowed(ActionKind::Break));
    }

    #[test]
    fn unknown_action_is_a_fatal_config_error() {
        let toml = r#"
            [pipeline]
            name = "demo"

            [[run]]
            name = "codegen"
            profile = "p.toml"
            allowed_actions = ["compile"]
        "#;
        let err = PipelineConfig::from_toml_str(toml).unwrap_err();
        assert!(err.message.contains("unknown action 'compile'"));
    }

    #[test]
    fn empty_allow_list_is_rejected() {
        let toml = r#"
            [pipeline]
            name = "demo"

            [[run]]
            name = "codegen"
            profile = "p.toml"
            allowed_actions = []
        "#;
        let err = PipelineConfig::from_toml_str(toml).unwrap_err();
        assert!(err.message.contains("empty allowed_actions"));
    }

    #[test]
    fn duplicate_run_names_are_rejected() {
        let toml = r#"
            [pipeline]
            name = "demo"

            [[run]]
            name = "codegen"
            profile = "p.toml"
            allowed_actions = ["continue"]

            [[run]]
            name = "codegen"
            profile = "q.toml"
            allowed_actions = ["continue"]
        "#;
        let err = PipelineConfig::from_toml_str(toml).unwrap_err();
        assert!(err.message.contains("duplicate run name"));
    }

    #[test]
    fn rerun_alias_is_accepted_in_allow_lists() {
        let toml = r#"
            [pipeline]
            name = "demo"

            [[run]]
            name = "validate"
            profile = "p.toml"
            allowed_actions = ["validator", "rerun"]
        "#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert!(config.runs()[0].is_allowed(ActionKind::TriggerRetry));
    }

    #[test]
    fn per_run_retry_overrides_parse() {
        let toml = r#"
            [pipeline]
            name = "demo"
            [pipeline.retry]
            limit = 5

            [[run]]
            name = "codegen"
            profile = "p.toml"
            allowed_actions = ["continue"]
            [run.retry]
            limit = 1
            backoff_ms = 100
        "#;
        let config = PipelineConfig::from_toml_str(toml).unwrap();
        assert_eq!(*config.retry().limit(), 5);
        let run_retry = config.runs()[0].retry().as_ref().unwrap();
        assert_eq!(*run_retry.limit(), 1);
        assert_eq!(*run_retry.backoff_ms(), 100);
    }
}
