//! Gateway retry policy: transient failures retry up to the limit, fatal
//! failures propagate immediately.

mod test_utils;

use maestro_core::{ProviderRequest, StoryEvent};
use maestro_error::{MaestroErrorKind, ProviderErrorKind};
use maestro_models::{ScriptedDriver, ScriptedReply};
use maestro_pipeline::{
    LoadedPipeline, PipelineConfig, PipelineRunner, PipelineStory, ProviderGateway, RetryPolicy,
};
use serde_json::json;
use std::sync::Arc;
use test_utils::{TestBed, envelope};

fn rate_limited() -> ScriptedReply {
    ScriptedReply::Fail(ProviderErrorKind::RateLimited("429".into()))
}

fn success() -> ScriptedReply {
    ScriptedReply::Payload(envelope(json!([{ "type": "continue", "params": {} }])))
}

fn fast_policy(limit: usize) -> RetryPolicy {
    RetryPolicy::new(limit, 1, 1)
}

#[tokio::test]
async fn three_rate_limits_then_success_completes_when_limit_is_three() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        success(),
    ]));
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut story = PipelineStory::new();

    let response = gateway
        .invoke(
            "scripted",
            &ProviderRequest::default(),
            &fast_policy(3),
            &mut story,
            "retry",
            0,
        )
        .await
        .unwrap();

    assert!(response.payload["agent"]["actions"].is_array());
    assert_eq!(story.count_event(StoryEvent::ProviderRetried), 3);
}

#[tokio::test]
async fn three_rate_limits_escalate_when_limit_is_two() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        rate_limited(),
        rate_limited(),
        rate_limited(),
        success(),
    ]));
    let probe = Arc::clone(&driver);
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut story = PipelineStory::new();

    let err = gateway
        .invoke(
            "scripted",
            &ProviderRequest::default(),
            &fast_policy(2),
            &mut story,
            "retry",
            0,
        )
        .await
        .unwrap_err();

    match err.kind() {
        MaestroErrorKind::Provider(p) => {
            assert_eq!(p.kind, ProviderErrorKind::Unavailable { attempts: 3 });
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert_eq!(story.count_event(StoryEvent::ProviderRetried), 2);
    // The queued success was never reached.
    assert_eq!(probe.remaining(), 1);
}

#[tokio::test]
async fn fatal_errors_propagate_without_retry() {
    let driver = Arc::new(ScriptedDriver::new(vec![
        ScriptedReply::Fail(ProviderErrorKind::Auth("key rejected".into())),
        success(),
    ]));
    let probe = Arc::clone(&driver);
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut story = PipelineStory::new();

    let err = gateway
        .invoke(
            "scripted",
            &ProviderRequest::default(),
            &fast_policy(5),
            &mut story,
            "fatal",
            0,
        )
        .await
        .unwrap_err();

    match err.kind() {
        MaestroErrorKind::Provider(p) => {
            assert!(matches!(p.kind, ProviderErrorKind::Auth(_)));
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert_eq!(story.count_event(StoryEvent::ProviderRetried), 0);
    assert_eq!(probe.remaining(), 1);
}

#[tokio::test]
async fn zero_limit_disables_retries() {
    let driver = Arc::new(ScriptedDriver::new(vec![rate_limited(), success()]));
    let gateway = ProviderGateway::new().with_driver("scripted", driver);
    let mut story = PipelineStory::new();

    let err = gateway
        .invoke(
            "scripted",
            &ProviderRequest::default(),
            &RetryPolicy::none(),
            &mut story,
            "noretry",
            0,
        )
        .await
        .unwrap_err();

    match err.kind() {
        MaestroErrorKind::Provider(p) => {
            assert_eq!(p.kind, ProviderErrorKind::Unavailable { attempts: 1 });
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert_eq!(story.count_event(StoryEvent::ProviderRetried), 0);
}

#[tokio::test]
async fn pipeline_with_uncovered_provider_fails_before_any_run() {
    let bed = TestBed::new("uncovered");
    bed.scripted_profile("profiles/main.toml");
    bed.write(
        "pipeline.toml",
        r#"
        [pipeline]
        name = "uncovered"

        [[run]]
        name = "only"
        profile = "profiles/main.toml"
        allowed_actions = ["continue"]
        "#,
    );

    let config = PipelineConfig::from_file(bed.root.join("pipeline.toml")).unwrap();
    let pipeline = LoadedPipeline::load(&bed.root, config).unwrap();
    // No driver registered for the profile's "scripted" provider.
    let mut runner = PipelineRunner::new(pipeline, ProviderGateway::new());

    let err = runner.run().await.unwrap_err();
    match err.kind() {
        MaestroErrorKind::Provider(p) => {
            assert!(matches!(p.kind, ProviderErrorKind::UnknownProvider(_)));
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
    assert!(runner.story().entries().is_empty());
}

#[tokio::test]
async fn unregistered_provider_is_rejected() {
    let gateway = ProviderGateway::new();
    let mut story = PipelineStory::new();

    let err = gateway
        .invoke(
            "acme",
            &ProviderRequest::default(),
            &fast_policy(1),
            &mut story,
            "missing",
            0,
        )
        .await
        .unwrap_err();

    match err.kind() {
        MaestroErrorKind::Provider(p) => {
            assert!(matches!(p.kind, ProviderErrorKind::UnknownProvider(_)));
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}
