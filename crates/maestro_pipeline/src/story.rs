//! The pipeline story: an append-only audit trail.

use crate::IoLogSettings;
use maestro_core::{StoryEntry, StoryEvent};
use maestro_error::StoryError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The ordered, append-only audit trail for one pipeline execution.
///
/// Every component records its transitions here through the runner; the
/// entry sequence is the reconstructable decision path. Entries are held in
/// memory and can be persisted as JSONL once the pipeline finishes.
///
/// # Examples
///
/// ```
/// use maestro_pipeline::PipelineStory;
/// use maestro_core::{StoryEntry, StoryEvent};
///
/// let mut story = PipelineStory::new();
/// story.record(StoryEntry::now("codegen", 0, StoryEvent::RunStarted, ""));
/// assert_eq!(story.entries().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct PipelineStory {
    entries: Vec<StoryEntry>,
}

impl PipelineStory {
    /// Create an empty story.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry. Entries are never mutated or removed afterwards.
    pub fn record(&mut self, entry: StoryEntry) {
        debug!(
            run = %entry.run,
            attempt = entry.attempt,
            event = %entry.event,
            detail = %entry.detail,
            "story"
        );
        self.entries.push(entry);
    }

    /// All entries in append order.
    pub fn entries(&self) -> &[StoryEntry] {
        &self.entries
    }

    /// Entries belonging to one run.
    pub fn entries_for(&self, run: &str) -> impl Iterator<Item = &StoryEntry> {
        self.entries.iter().filter(move |e| e.run == run)
    }

    /// Count entries with a given event kind.
    pub fn count_event(&self, event: StoryEvent) -> usize {
        self.entries.iter().filter(|e| e.event == event).count()
    }

    /// Timestamp-free rendering of the whole story, one line per entry.
    ///
    /// Two executions over identical inputs must produce identical output
    /// here; this is the reproducibility contract tests compare against.
    pub fn stable_lines(&self) -> Vec<String> {
        self.entries.iter().map(StoryEntry::stable_line).collect()
    }

    /// Persist the story as JSONL.
    pub fn save(&self, path: &Path) -> Result<(), StoryError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoryError::new(format!("create {}: {e}", parent.display())))?;
        }
        let mut out = String::new();
        for entry in &self.entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| StoryError::new(format!("serialize story entry: {e}")))?;
            out.push_str(&line);
            out.push('\n');
        }
        std::fs::write(path, out)
            .map_err(|e| StoryError::new(format!("write {}: {e}", path.display())))
    }
}

/// Writes raw request/response payloads alongside the story.
///
/// File naming follows `{run_name}__{attempt}__{request|response}.json`
/// under the configured directory. Disabled loggers are no-ops. Write
/// failures are reported to the caller, which logs and continues; a broken
/// capture must not fail the attempt that produced it.
#[derive(Debug, Clone)]
pub struct IoLogger {
    settings: IoLogSettings,
    base_dir: PathBuf,
}

impl IoLogger {
    /// Create a logger rooted at the project directory.
    pub fn new(project_root: &Path, settings: IoLogSettings) -> Self {
        let base_dir = if settings.dir().is_absolute() {
            settings.dir().clone()
        } else {
            project_root.join(settings.dir())
        };
        Self { settings, base_dir }
    }

    /// Whether captures are written at all.
    pub fn enabled(&self) -> bool {
        *self.settings.enabled()
    }

    /// Capture a request payload.
    pub fn write_request(
        &self,
        run: &str,
        attempt: usize,
        payload: &serde_json::Value,
    ) -> Result<(), StoryError> {
        self.write(run, attempt, "request", payload)
    }

    /// Capture a response payload.
    pub fn write_response(
        &self,
        run: &str,
        attempt: usize,
        payload: &serde_json::Value,
    ) -> Result<(), StoryError> {
        self.write(run, attempt, "response", payload)
    }

    fn write(
        &self,
        run: &str,
        attempt: usize,
        side: &str,
        payload: &serde_json::Value,
    ) -> Result<(), StoryError> {
        if !self.enabled() {
            return Ok(());
        }
        std::fs::create_dir_all(&self.base_dir)
            .map_err(|e| StoryError::new(format!("create {}: {e}", self.base_dir.display())))?;
        let path = self.base_dir.join(format!("{run}__{attempt}__{side}.json"));
        let body = serde_json::to_string_pretty(payload)
            .map_err(|e| StoryError::new(format!("serialize {side} capture: {e}")))?;
        std::fs::write(&path, body)
            .map_err(|e| StoryError::new(format!("write {}: {e}", path.display())))?;
        debug!(path = %path.display(), "io capture saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_lines_track_append_order() {
        let mut story = PipelineStory::new();
        story.record(StoryEntry::now("a", 0, StoryEvent::RunStarted, ""));
        story.record(StoryEntry::now("a", 0, StoryEvent::RunFinished, "continuing"));
        assert_eq!(
            story.stable_lines(),
            vec![
                "a[0] run_started ".to_string(),
                "a[0] run_finished continuing".to_string(),
            ]
        );
    }

    #[test]
    fn disabled_io_logger_writes_nothing() {
        let logger = IoLogger::new(Path::new("/nonexistent"), IoLogSettings::default());
        assert!(!logger.enabled());
        // Would fail on the unwritable root if it tried to write.
        logger
            .write_request("r", 0, &serde_json::json!({}))
            .unwrap();
    }
}
