//! The action engine: allow-list enforcement and the built-in handlers.

use crate::{ContextPool, PipelineStory, RunDefinition};
use maestro_core::{ActionKind, ActionRecord, StoryEntry, StoryEvent};
use maestro_error::{ActionError, ActionErrorKind, MaestroResult};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// Control signal produced by executing one response's action list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSignal {
    /// All actions completed; the run proceeds
    Continue,
    /// A break action fired; the pipeline halts at this boundary
    Break {
        /// Optional reason supplied by the response
        reason: Option<String>,
    },
    /// A trigger_retry/rerun action fired; consult the strategy arbiter
    Rerun {
        /// Optional reason supplied by the response
        reason: Option<String>,
    },
    /// A validator check failed; propagates upward into rerun arbitration
    ValidatorFailed {
        /// The check that ran
        check: String,
        /// Failure detail
        detail: String,
    },
}

/// Executes a response's actions in array order against the current state.
///
/// Before dispatch, every action is checked against the run's allow-list; a
/// disallowed type aborts the remaining actions in the response.
/// Determinism requires stopping, not skipping: downstream actions that
/// rely on a forbidden action's side effect must never run on stale state.
/// Each action's outcome is recorded in the story before the next begins.
#[derive(Debug)]
pub struct ActionEngine<'a> {
    project_root: &'a Path,
    run: &'a RunDefinition,
}

impl<'a> ActionEngine<'a> {
    /// Create an engine for one run.
    pub fn new(project_root: &'a Path, run: &'a RunDefinition) -> Self {
        Self { project_root, run }
    }

    /// Execute all actions, stopping at the first control signal or error.
    #[instrument(skip_all, fields(run = %self.run.name(), actions = actions.len()))]
    pub fn execute_all(
        &self,
        actions: &[ActionRecord],
        pool: &mut ContextPool,
        story: &mut PipelineStory,
        attempt: usize,
    ) -> MaestroResult<EngineSignal> {
        for action in actions {
            if !self.run.is_allowed(action.kind) {
                story.record(StoryEntry::now(
                    self.run.name(),
                    attempt,
                    StoryEvent::ActionDenied,
                    format!("{} not in allow-list [{}]", action.kind, self.run.allowed_list()),
                ));
                return Err(ActionError::new(ActionErrorKind::NotPermitted {
                    action: action.kind.to_string(),
                    allowed: self.run.allowed_list(),
                })
                .into());
            }

            match action.kind {
                ActionKind::FileWrite => {
                    let path = self.file_write(action)?;
                    story.record(StoryEntry::now(
                        self.run.name(),
                        attempt,
                        StoryEvent::ActionCompleted,
                        format!("file_write {}", path.display()),
                    ));
                }
                ActionKind::FileRead => {
                    let key = self.file_read(action, pool)?;
                    story.record(StoryEntry::now(
                        self.run.name(),
                        attempt,
                        StoryEvent::ActionCompleted,
                        format!("file_read -> pool['{key}']"),
                    ));
                }
                ActionKind::Validator => {
                    let check = action.param_str("check").ok_or_else(|| {
                        ActionError::new(ActionErrorKind::MissingParam {
                            action: "validator".to_string(),
                            param: "check".to_string(),
                        })
                    })?;
                    match self.validate(check, action, pool)? {
                        Ok(()) => {
                            story.record(StoryEntry::now(
                                self.run.name(),
                                attempt,
                                StoryEvent::ValidatorPassed,
                                check.to_string(),
                            ));
                        }
                        Err(detail) => {
                            story.record(StoryEntry::now(
                                self.run.name(),
                                attempt,
                                StoryEvent::ValidatorFailed,
                                format!("{check}: {detail}"),
                            ));
                            return Ok(EngineSignal::ValidatorFailed {
                                check: check.to_string(),
                                detail,
                            });
                        }
                    }
                }
                ActionKind::Continue => {
                    story.record(StoryEntry::now(
                        self.run.name(),
                        attempt,
                        StoryEvent::ActionCompleted,
                        "continue",
                    ));
                }
                ActionKind::Break => {
                    let reason = action.param_str("reason").map(str::to_string);
                    info!(run = %self.run.name(), ?reason, "break requested");
                    story.record(StoryEntry::now(
                        self.run.name(),
                        attempt,
                        StoryEvent::ActionCompleted,
                        format!(
                            "break: {}",
                            reason.as_deref().unwrap_or("no reason provided")
                        ),
                    ));
                    return Ok(EngineSignal::Break { reason });
                }
                ActionKind::TriggerRetry => {
                    let reason = action.param_str("reason").map(str::to_string);
                    story.record(StoryEntry::now(
                        self.run.name(),
                        attempt,
                        StoryEvent::RerunRequested,
                        reason.clone().unwrap_or_else(|| "no reason provided".into()),
                    ));
                    return Ok(EngineSignal::Rerun { reason });
                }
            }
        }

        Ok(EngineSignal::Continue)
    }

    /// Write `params.content` to the effective target path.
    ///
    /// The run's `target_path` is the source of truth; the agent-suggested
    /// `params.target_path` is the fallback. Re-running the same action with
    /// the same params yields the same on-disk content.
    fn file_write(&self, action: &ActionRecord) -> Result<PathBuf, ActionError> {
        let content = action
            .param("content")
            .or_else(|| action.param("code"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                ActionError::new(ActionErrorKind::MissingParam {
                    action: "file_write".to_string(),
                    param: "content".to_string(),
                })
            })?;

        let target = self
            .run
            .target_path()
            .clone()
            .or_else(|| action.param_str("target_path").map(PathBuf::from))
            .ok_or_else(|| {
                ActionError::new(ActionErrorKind::MissingParam {
                    action: "file_write".to_string(),
                    param: "target_path".to_string(),
                })
            })?;

        let path = self.resolve(&target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ActionError::new(ActionErrorKind::Io {
                    path: parent.display().to_string(),
                    message: e.to_string(),
                })
            })?;
        }
        std::fs::write(&path, content).map_err(|e| {
            ActionError::new(ActionErrorKind::Io {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        })?;
        Ok(target)
    }

    /// Read a file into the shared pool under a named key.
    fn file_read(&self, action: &ActionRecord, pool: &mut ContextPool) -> Result<String, ActionError> {
        let reference = action
            .param_str("path")
            .or_else(|| action.param_str("target_path"))
            .ok_or_else(|| {
                ActionError::new(ActionErrorKind::MissingParam {
                    action: "file_read".to_string(),
                    param: "path".to_string(),
                })
            })?;

        let path = self.resolve(Path::new(reference));
        let root = self.project_root.canonicalize().map_err(|e| {
            ActionError::new(ActionErrorKind::Io {
                path: self.project_root.display().to_string(),
                message: e.to_string(),
            })
        })?;
        let full = path.canonicalize().map_err(|e| {
            ActionError::new(ActionErrorKind::Io {
                path: reference.to_string(),
                message: e.to_string(),
            })
        })?;
        if !full.starts_with(&root) {
            return Err(ActionError::new(ActionErrorKind::EscapesRoot(
                reference.to_string(),
            )));
        }

        let content = std::fs::read_to_string(&full).map_err(|e| {
            ActionError::new(ActionErrorKind::Io {
                path: reference.to_string(),
                message: e.to_string(),
            })
        })?;

        let key = action
            .param_str("key")
            .unwrap_or(reference)
            .to_string();
        pool.insert(key.clone(), content);
        Ok(key)
    }

    /// Run one named check. The outer error is a malformed action; the
    /// inner result is the verdict.
    fn validate(
        &self,
        check: &str,
        action: &ActionRecord,
        pool: &ContextPool,
    ) -> Result<Result<(), String>, ActionError> {
        let target = || -> Result<PathBuf, ActionError> {
            self.run.target_path().clone().ok_or_else(|| {
                ActionError::new(ActionErrorKind::InvalidParam {
                    action: "validator".to_string(),
                    param: "check".to_string(),
                    message: format!("check '{check}' requires the run to declare a target_path"),
                })
            })
        };

        // Verdict details quote the as-written target reference, not the
        // resolved absolute path, so story lines stay root-independent.
        let verdict = match check {
            "target_exists" => {
                let rel = target()?;
                if self.resolve(&rel).exists() {
                    Ok(())
                } else {
                    Err(format!("target '{}' does not exist", rel.display()))
                }
            }
            "non_empty" => {
                let rel = target()?;
                match std::fs::read_to_string(self.resolve(&rel)) {
                    Ok(content) if !content.trim().is_empty() => Ok(()),
                    Ok(_) => Err(format!("target '{}' is empty", rel.display())),
                    Err(e) => Err(format!("target '{}' unreadable: {e}", rel.display())),
                }
            }
            "valid_json" => {
                let rel = target()?;
                match std::fs::read_to_string(self.resolve(&rel)) {
                    Ok(content) => match serde_json::from_str::<serde_json::Value>(&content) {
                        Ok(_) => Ok(()),
                        Err(e) => Err(format!("target is not valid JSON: {e}")),
                    },
                    Err(e) => Err(format!("target '{}' unreadable: {e}", rel.display())),
                }
            }
            "pool_contains" => {
                let key = action.param_str("key").ok_or_else(|| {
                    ActionError::new(ActionErrorKind::MissingParam {
                        action: "validator".to_string(),
                        param: "key".to_string(),
                    })
                })?;
                if pool.contains_key(key) {
                    Ok(())
                } else {
                    Err(format!("pool has no entry for key '{key}'"))
                }
            }
            other => {
                return Err(ActionError::new(ActionErrorKind::UnknownCheck(
                    other.to_string(),
                )));
            }
        };
        Ok(verdict)
    }

    fn resolve(&self, reference: &Path) -> PathBuf {
        if reference.is_absolute() {
            reference.to_path_buf()
        } else {
            self.project_root.join(reference)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineConfig;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    static DIR_SEQ: AtomicU32 = AtomicU32::new(0);

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "maestro_actions_{tag}_{}_{}",
            std::process::id(),
            DIR_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn run_definition(allowed: &[&str], target: Option<&str>) -> RunDefinition {
        let actions = allowed
            .iter()
            .map(|a| format!("\"{a}\""))
            .collect::<Vec<_>>()
            .join(", ");
        let target_line = target
            .map(|t| format!("target_path = \"{t}\""))
            .unwrap_or_default();
        let toml = format!(
            r#"
            [pipeline]
            name = "test"

            [[run]]
            name = "unit"
            profile = "p.toml"
            allowed_actions = [{actions}]
            {target_line}
            "#
        );
        PipelineConfig::from_toml_str(&toml).unwrap().runs()[0].clone()
    }

    fn record(kind: ActionKind, params: serde_json::Value, position: usize) -> ActionRecord {
        ActionRecord {
            kind,
            params: params.as_object().unwrap().clone(),
            position,
        }
    }

    #[test]
    fn disallowed_action_aborts_before_side_effects() {
        let dir = scratch_dir("deny");
        let run = run_definition(&["continue"], Some("out.txt"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![
            record(ActionKind::FileWrite, json!({ "content": "x" }), 0),
            record(ActionKind::Continue, json!({}), 1),
        ];
        let err = engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap_err();
        assert!(format!("{err}").contains("not permitted"));
        assert_eq!(story.count_event(StoryEvent::ActionDenied), 1);
        assert!(!dir.join("out.txt").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_write_is_idempotent() {
        let dir = scratch_dir("write");
        let run = run_definition(&["file_write"], Some("nested/out.rs"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::FileWrite,
            json!({ "content": "pub fn f() {}\n" }),
            0,
        )];
        engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        let first = std::fs::read_to_string(dir.join("nested/out.rs")).unwrap();
        engine
            .execute_all(&actions, &mut pool, &mut story, 1)
            .unwrap();
        let second = std::fs::read_to_string(dir.join("nested/out.rs")).unwrap();
        assert_eq!(first, second);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_write_accepts_the_code_alias() {
        let dir = scratch_dir("alias");
        let run = run_definition(&["file_write"], Some("out.rs"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(ActionKind::FileWrite, json!({ "code": "fn main() {}" }), 0)];
        engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.join("out.rs")).unwrap(),
            "fn main() {}"
        );

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn run_target_path_wins_over_agent_suggestion() {
        let dir = scratch_dir("target");
        let run = run_definition(&["file_write"], Some("engine.txt"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::FileWrite,
            json!({ "content": "x", "target_path": "agent.txt" }),
            0,
        )];
        engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        assert!(dir.join("engine.txt").exists());
        assert!(!dir.join("agent.txt").exists());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_read_populates_the_pool() {
        let dir = scratch_dir("read");
        std::fs::write(dir.join("notes.md"), "remember this").unwrap();
        let run = run_definition(&["file_read"], None);
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::FileRead,
            json!({ "path": "notes.md", "key": "notes" }),
            0,
        )];
        engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        assert_eq!(pool.get("notes"), Some("remember this"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn file_read_refuses_to_escape_the_root() {
        let dir = scratch_dir("escape");
        let inner = dir.join("inner");
        std::fs::create_dir_all(&inner).unwrap();
        std::fs::write(dir.join("secret.txt"), "nope").unwrap();
        let run = run_definition(&["file_read"], None);
        let engine = ActionEngine::new(&inner, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::FileRead,
            json!({ "path": "../secret.txt" }),
            0,
        )];
        let err = engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap_err();
        assert!(format!("{err}").contains("outside the workspace root"));
        assert!(pool.is_empty());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn validator_failure_signals_upward() {
        let dir = scratch_dir("validator");
        let run = run_definition(&["validator"], Some("missing.txt"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::Validator,
            json!({ "check": "target_exists" }),
            0,
        )];
        let signal = engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        assert!(matches!(signal, EngineSignal::ValidatorFailed { .. }));
        assert_eq!(story.count_event(StoryEvent::ValidatorFailed), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_validator_check_is_an_error() {
        let dir = scratch_dir("check");
        let run = run_definition(&["validator"], None);
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![record(
            ActionKind::Validator,
            json!({ "check": "spellcheck" }),
            0,
        )];
        let err = engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap_err();
        assert!(format!("{err}").contains("Unknown validator check"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn break_stops_remaining_actions() {
        let dir = scratch_dir("break");
        let run = run_definition(&["break", "file_write"], Some("late.txt"));
        let engine = ActionEngine::new(&dir, &run);
        let mut pool = ContextPool::new();
        let mut story = PipelineStory::new();

        let actions = vec![
            record(ActionKind::Break, json!({ "reason": "enough" }), 0),
            record(ActionKind::FileWrite, json!({ "content": "x" }), 1),
        ];
        let signal = engine
            .execute_all(&actions, &mut pool, &mut story, 0)
            .unwrap();
        assert_eq!(
            signal,
            EngineSignal::Break {
                reason: Some("enough".into())
            }
        );
        assert!(!dir.join("late.txt").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
