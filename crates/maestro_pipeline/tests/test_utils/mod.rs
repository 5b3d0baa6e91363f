//! Shared helpers for pipeline integration tests.
//!
//! Not every test file uses every helper.
#![allow(dead_code)]

use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

static BED_SEQ: AtomicU32 = AtomicU32::new(0);

/// A scratch project root populated with config files, cleaned up on drop.
pub struct TestBed {
    pub root: PathBuf,
}

impl TestBed {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!(
            "maestro_pipeline_{tag}_{}_{}",
            std::process::id(),
            BED_SEQ.fetch_add(1, Ordering::SeqCst)
        ));
        std::fs::create_dir_all(&root).unwrap();
        Self { root }
    }

    pub fn write(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.root.join(rel)).unwrap()
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root.join(rel).exists()
    }

    /// Write a minimal scripted-provider profile at `rel`.
    pub fn scripted_profile(&self, rel: &str) -> PathBuf {
        self.write(
            rel,
            r#"
            [profile]
            provider = "scripted"
            model = "replay-1"
            temperature = 0.0

            [[profile.messages]]
            role = "system"
            content = "You emit action envelopes. ${rules_block}"

            [[profile.messages]]
            role = "user"
            content = "${task_description}\n${context_block}\n${agent_input}"
            "#,
        )
    }
}

impl Drop for TestBed {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

/// The canonical action envelope around a list of actions.
pub fn envelope(actions: Value) -> Value {
    json!({ "agent": { "actions": actions } })
}

/// Relative display form used in assertions against story lines.
#[allow(dead_code)]
pub fn rel(path: &Path) -> String {
    path.display().to_string()
}
