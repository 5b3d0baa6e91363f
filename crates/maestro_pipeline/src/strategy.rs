//! Rerun strategies: ordered attempt overrides and the arbiter.

use crate::executor::AttemptState;
use maestro_error::{ConfigError, StrategyError, StrategyErrorKind};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// One attempt's override bundle.
///
/// Every field is optional; the engine falls back to the run's own
/// configuration for anything an override leaves unset. Overrides derive an
/// ephemeral attempt configuration; the original run and profile
/// definitions are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, derive_getters::Getters)]
pub struct AttemptOverride {
    /// Replacement profile file reference
    pub(crate) profile: Option<PathBuf>,
    /// Replacement provider identifier
    pub(crate) provider: Option<String>,
    /// Replacement context file list
    pub(crate) context_files: Option<Vec<PathBuf>>,
}

impl AttemptOverride {
    /// Short human-readable summary for story entries.
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(profile) = &self.profile {
            parts.push(format!("profile={}", profile.display()));
        }
        if let Some(provider) = &self.provider {
            parts.push(format!("provider={provider}"));
        }
        if let Some(files) = &self.context_files {
            parts.push(format!("context_files={}", files.len()));
        }
        if parts.is_empty() {
            "no overrides".to_string()
        } else {
            parts.join(" ")
        }
    }
}

/// An ordered fallback plan consulted when an attempt needs a rerun.
///
/// The attempt order is fixed at configuration time; position is the
/// implicit index used as tie-break and exhaustion counter.
#[derive(Debug, Clone, PartialEq, Eq, derive_getters::Getters)]
pub struct StrategyDefinition {
    /// Strategy name
    name: String,
    /// Ordered attempt overrides
    attempts: Vec<AttemptOverride>,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlStrategy {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct TomlStrategyFile {
    strategy: TomlStrategy,
    #[serde(default, rename = "attempt")]
    attempts: Vec<AttemptOverride>,
}

impl StrategyDefinition {
    /// Load a strategy from a TOML file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("read {}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse a strategy from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for unreadable/invalid TOML or an empty
    /// attempt list. A strategy that can never arbitrate is a
    /// configuration mistake.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let file: TomlStrategyFile =
            toml::from_str(s).map_err(|e| ConfigError::new(format!("parse strategy: {e}")))?;
        if file.attempts.is_empty() {
            return Err(ConfigError::new(format!(
                "strategy '{}' declares no attempts",
                file.strategy.name
            )));
        }
        Ok(Self {
            name: file.strategy.name,
            attempts: file.attempts,
        })
    }
}

/// Result of consulting the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arbitration {
    /// Use this override bundle for the next attempt
    Next(AttemptOverride),
    /// All attempts are consumed (or no strategy exists)
    Exhausted,
}

/// Selects the next attempt override when a rerun is requested.
///
/// Selection is a pure index walk: the attempt at the state's cursor is
/// returned and the cursor advances. No randomness and no provider feedback
/// influence selection, so identical inputs always walk the same attempt
/// sequence in the same order.
#[derive(Debug, Clone)]
pub struct StrategyArbiter {
    attempts: Vec<AttemptOverride>,
}

impl StrategyArbiter {
    /// Build an arbiter over an optional strategy.
    ///
    /// A run without a strategy gets an arbiter that is exhausted from the
    /// start: the first rerun request fails the run.
    pub fn new(definition: Option<&StrategyDefinition>) -> Self {
        Self {
            attempts: definition.map(|d| d.attempts().clone()).unwrap_or_default(),
        }
    }

    /// Attempt budget for the enclosing run: one per override, plus the
    /// zeroth attempt on the run's own profile.
    pub fn max_attempts(&self) -> usize {
        self.attempts.len() + 1
    }

    /// Select the override for the next attempt, advancing the cursor.
    pub fn next_attempt(&self, state: &mut AttemptState) -> Arbitration {
        match self.attempts.get(state.strategy_cursor) {
            Some(attempt) => {
                state.strategy_cursor += 1;
                Arbitration::Next(attempt.clone())
            }
            None => Arbitration::Exhausted,
        }
    }

    /// The error surfaced when arbitration is exhausted.
    ///
    /// A run that never had a strategy gets the more specific message.
    pub fn exhausted_error(&self, run: &str, state: &AttemptState) -> StrategyError {
        if self.attempts.is_empty() {
            StrategyError::new(StrategyErrorKind::NoStrategy(run.to_string()))
        } else {
            StrategyError::new(StrategyErrorKind::Exhausted {
                consumed: state.index + 1,
            })
        }
    }
}
