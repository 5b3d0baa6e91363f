//! Context aggregation and the shared cross-run context pool.

use maestro_error::{ContextError, ContextErrorKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Merges external reference files into a single context block.
///
/// Files are concatenated in list order with explicit provenance headers so
/// the boundary of every source is recoverable from the merged text. Any
/// missing or unreadable source fails the merge: proceeding with partial
/// context would break determinism.
#[derive(Debug, Clone)]
pub struct ContextAggregator {
    project_root: PathBuf,
}

impl ContextAggregator {
    /// Create an aggregator resolving relative references against a root.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
        }
    }

    /// Resolve a reference against the project root.
    fn resolve(&self, reference: &Path) -> PathBuf {
        if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            self.project_root.join(reference)
        }
    }

    /// Merge the referenced files into one context block.
    ///
    /// An empty reference list merges to an empty block.
    ///
    /// # Errors
    ///
    /// Returns a [`ContextError`] if any referenced source is missing or
    /// unreadable; the enclosing attempt cannot proceed.
    #[instrument(skip(self), fields(files = references.len()))]
    pub fn merge(&self, references: &[PathBuf]) -> Result<String, ContextError> {
        let mut blocks = Vec::with_capacity(references.len());

        for reference in references {
            let path = self.resolve(reference);
            if !path.exists() {
                return Err(ContextError::new(ContextErrorKind::MissingSource(
                    reference.display().to_string(),
                )));
            }
            let raw = std::fs::read_to_string(&path).map_err(|e| {
                ContextError::new(ContextErrorKind::Unreadable {
                    path: reference.display().to_string(),
                    message: e.to_string(),
                })
            })?;

            blocks.push(format!(
                "=== CONTEXT FILE: {} ===\n{}\n",
                reference.display(),
                raw.trim()
            ));
        }

        debug!(blocks = blocks.len(), "context merged");
        Ok(blocks.join("\n\n"))
    }
}

/// The shared variable pool populated by prior runs' outputs.
///
/// Owned exclusively by the pipeline runner and passed by reference into
/// each run; `file_read` actions insert entries, later prompts receive a
/// snapshot through the agent input. Keys iterate in sorted order so the
/// snapshot is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextPool {
    entries: BTreeMap<String, String>,
}

impl ContextPool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        debug!(key = %key, "context pool updated");
        self.entries.insert(key, value.into());
    }

    /// Look up an entry.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Whether a key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the pool as a JSON object, keys in sorted order.
    pub fn as_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect(),
        )
    }
}
