//! Break semantics: a halt applies immediately, at the action boundary.

mod test_utils;

use maestro_interface::TerminalState;
use maestro_models::ScriptedDriver;
use maestro_pipeline::{LoadedPipeline, PipelineConfig, PipelineRunner, ProviderGateway};
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestBed, envelope};

#[tokio::test]
async fn break_in_run_two_halts_before_run_three() {
    let bed = TestBed::new("break");
    bed.scripted_profile("profiles/main.toml");
    bed.write(
        "pipeline.toml",
        r#"
        [pipeline]
        name = "three_stage"

        [[run]]
        name = "first"
        profile = "profiles/main.toml"
        target_path = "out/first.txt"
        allowed_actions = ["file_write", "continue"]

        [[run]]
        name = "second"
        profile = "profiles/main.toml"
        target_path = "out/second.txt"
        allowed_actions = ["file_write", "break"]

        [[run]]
        name = "third"
        profile = "profiles/main.toml"
        target_path = "out/third.txt"
        allowed_actions = ["file_write", "continue"]
        "#,
    );

    // Run 2 writes its file, then breaks; the reply run 3 would consume
    // stays queued, proving no call was ever made for it.
    let driver = Arc::new(ScriptedDriver::from_payloads(vec![
        envelope(json!([
            { "type": "file_write", "params": { "content": "one" } },
            { "type": "continue", "params": {} },
        ])),
        envelope(json!([
            { "type": "file_write", "params": { "content": "two" } },
            { "type": "break", "params": { "reason": "quality gate failed" } },
        ])),
        envelope(json!([
            { "type": "file_write", "params": { "content": "three" } },
        ])),
    ]));
    let probe = Arc::clone(&driver);

    let config = PipelineConfig::from_file(bed.root.join("pipeline.toml")).unwrap();
    let pipeline = LoadedPipeline::load(&bed.root, config).unwrap();
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut runner = PipelineRunner::new(pipeline, gateway);

    let report = runner.run().await.unwrap();

    assert!(report.halted);
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.runs[0].state, TerminalState::Continuing);
    assert_eq!(report.runs[1].state, TerminalState::Breaking);

    // Side effects before the break are fully applied.
    assert_eq!(bed.read("out/first.txt"), "one");
    assert_eq!(bed.read("out/second.txt"), "two");
    // Run three never started: no file, no provider call, no story entries.
    assert!(!bed.exists("out/third.txt"));
    assert_eq!(probe.remaining(), 1);
    assert_eq!(runner.story().entries_for("third").count(), 0);

    let lines = runner.story().stable_lines();
    assert!(lines.iter().any(|l| l.contains("pipeline_halted")));
    assert!(lines.iter().any(|l| l.contains("quality gate failed")));
}
