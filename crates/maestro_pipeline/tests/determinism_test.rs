//! Reproducibility: identical inputs and a scripted provider must yield
//! identical stories and identical file-system side effects.

mod test_utils;

use maestro_core::StoryEvent;
use maestro_interface::{PipelineReport, TerminalState};
use maestro_models::ScriptedDriver;
use maestro_pipeline::{LoadedPipeline, PipelineConfig, PipelineRunner, ProviderGateway};
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestBed, envelope};

fn seed(bed: &TestBed) {
    bed.scripted_profile("profiles/main.toml");
    bed.write("docs/spec.md", "the module must expose a single function\n");
    bed.write(
        "pipeline.toml",
        r#"
        [pipeline]
        name = "two_stage"

        [[run]]
        name = "produce"
        profile = "profiles/main.toml"
        context_files = ["docs/spec.md"]
        target_path = "out/module.rs"
        task_description = "generate the module"
        allowed_actions = ["file_write", "continue"]

        [[run]]
        name = "consume"
        profile = "profiles/main.toml"
        target_path = "out/summary.txt"
        task_description = "summarize the module"
        allowed_actions = ["file_read", "file_write", "continue"]
        "#,
    );
}

fn script() -> Vec<serde_json::Value> {
    vec![
        envelope(json!([
            { "type": "file_write", "params": { "content": "pub fn generated() {}\n" } },
            { "type": "continue", "params": {} },
        ])),
        envelope(json!([
            { "type": "file_read", "params": { "path": "out/module.rs", "key": "module_source" } },
            { "type": "file_write", "params": { "content": "one public function\n" } },
            { "type": "continue", "params": {} },
        ])),
    ]
}

async fn execute(bed: &TestBed) -> (PipelineReport, Vec<String>) {
    let driver = Arc::new(ScriptedDriver::from_payloads(script()));
    let config = PipelineConfig::from_file(bed.root.join("pipeline.toml")).unwrap();
    let pipeline = LoadedPipeline::load(&bed.root, config).unwrap();
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut runner = PipelineRunner::new(pipeline, gateway);
    let report = runner.run().await.unwrap();
    (report, runner.story().stable_lines())
}

#[tokio::test]
async fn two_executions_produce_identical_stories_and_outputs() {
    let first_bed = TestBed::new("repro_a");
    seed(&first_bed);
    let second_bed = TestBed::new("repro_b");
    seed(&second_bed);

    let (first_report, first_lines) = execute(&first_bed).await;
    let (second_report, second_lines) = execute(&second_bed).await;

    assert_eq!(first_report, second_report);
    assert_eq!(first_lines, second_lines);

    for rel in ["out/module.rs", "out/summary.txt"] {
        assert_eq!(first_bed.read(rel), second_bed.read(rel));
    }
}

#[tokio::test]
async fn later_runs_see_earlier_outputs_through_the_pool() {
    let bed = TestBed::new("pool");
    seed(&bed);

    let (report, lines) = execute(&bed).await;
    assert_eq!(report.runs.len(), 2);
    assert!(
        report
            .runs
            .iter()
            .all(|r| r.state == TerminalState::Continuing)
    );

    // The second run read the first run's output into the pool.
    assert!(
        lines
            .iter()
            .any(|l| l.contains("file_read -> pool['module_source']"))
    );
}

#[tokio::test]
async fn repeating_a_pipeline_in_place_rewrites_identical_content() {
    let bed = TestBed::new("idempotent");
    seed(&bed);

    execute(&bed).await;
    let first = bed.read("out/module.rs");
    execute(&bed).await;
    let second = bed.read("out/module.rs");
    assert_eq!(first, second);
}

#[tokio::test]
async fn story_save_writes_one_json_line_per_entry() {
    let bed = TestBed::new("save");
    seed(&bed);

    let driver = Arc::new(ScriptedDriver::from_payloads(script()));
    let config = PipelineConfig::from_file(bed.root.join("pipeline.toml")).unwrap();
    let pipeline = LoadedPipeline::load(&bed.root, config).unwrap();
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut runner = PipelineRunner::new(pipeline, gateway);
    runner.run().await.unwrap();

    let story_path = bed.root.join("story.jsonl");
    runner.story().save(&story_path).unwrap();

    let saved = bed.read("story.jsonl");
    let lines: Vec<&str> = saved.lines().collect();
    assert_eq!(lines.len(), runner.story().entries().len());
    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["run"], "produce");
    assert_eq!(first["event"], "run_started");
}

#[tokio::test]
async fn io_capture_files_follow_the_naming_pattern() {
    let bed = TestBed::new("iolog");
    seed(&bed);
    // Same pipeline, captures enabled.
    bed.write(
        "pipeline.toml",
        r#"
        [pipeline]
        name = "two_stage"
        [pipeline.io_log]
        enabled = true
        dir = "logs/io"

        [[run]]
        name = "produce"
        profile = "profiles/main.toml"
        target_path = "out/module.rs"
        allowed_actions = ["file_write", "continue"]
        "#,
    );

    let driver = Arc::new(ScriptedDriver::from_payloads(vec![envelope(json!([
        { "type": "file_write", "params": { "content": "x" } },
        { "type": "continue", "params": {} },
    ]))]));
    let config = PipelineConfig::from_file(bed.root.join("pipeline.toml")).unwrap();
    let pipeline = LoadedPipeline::load(&bed.root, config).unwrap();
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut runner = PipelineRunner::new(pipeline, gateway);
    let report = runner.run().await.unwrap();

    assert_eq!(report.runs[0].state, TerminalState::Continuing);
    assert!(bed.exists("logs/io/produce__0__request.json"));
    assert!(bed.exists("logs/io/produce__0__response.json"));
    assert_eq!(runner.story().count_event(StoryEvent::RunFinished), 1);
}
