//! Pipeline execution command handlers.

use maestro::{
    GeminiClient, LoadedPipeline, MaestroResult, OpenAiClient, PipelineConfig, PipelineRunner,
    ProviderDriver, ProviderGateway, RetryPolicy, ScriptedDriver, TerminalState,
};
use maestro_error::{ConfigError, JsonError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Retry overrides supplied on the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryOverrides {
    pub no_retry: bool,
    pub max_retries: Option<usize>,
    pub backoff_ms: Option<u64>,
}

impl RetryOverrides {
    fn apply(&self, base: RetryPolicy) -> RetryPolicy {
        if self.no_retry {
            return RetryPolicy::none();
        }
        let mut policy = base;
        if let Some(limit) = self.max_retries {
            policy = policy.with_limit(limit);
        }
        if let Some(backoff) = self.backoff_ms {
            policy = policy.with_backoff_ms(backoff);
        }
        policy
    }
}

fn resolve_root(pipeline_path: &Path, project_root: Option<PathBuf>) -> PathBuf {
    project_root.unwrap_or_else(|| {
        pipeline_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

/// Build a gateway with a driver per provider the pipeline references.
fn build_gateway(
    pipeline: &LoadedPipeline,
    replay: Option<&Path>,
) -> MaestroResult<ProviderGateway> {
    let mut gateway = ProviderGateway::new();

    if let Some(replay_path) = replay {
        // Replay mode: every provider id resolves to one shared scripted
        // driver consuming the recorded response sequence.
        let content = std::fs::read_to_string(replay_path)
            .map_err(|e| ConfigError::new(format!("read {}: {e}", replay_path.display())))?;
        let payloads: Vec<serde_json::Value> = serde_json::from_str(&content)
            .map_err(|e| JsonError::decode("replay file", e))?;
        let driver: Arc<dyn ProviderDriver> = Arc::new(ScriptedDriver::from_payloads(payloads));
        for provider in pipeline.providers() {
            gateway.register(provider, Arc::clone(&driver));
        }
        return Ok(gateway);
    }

    for provider in pipeline.providers() {
        match provider.as_str() {
            "openai" => gateway.register("openai", Arc::new(OpenAiClient::new()?)),
            "gemini" => gateway.register("gemini", Arc::new(GeminiClient::new()?)),
            other => {
                return Err(ConfigError::new(format!(
                    "no driver available for provider '{other}' (use --replay for scripted runs)"
                ))
                .into());
            }
        }
    }
    Ok(gateway)
}

/// Execute a pipeline and print its per-run results.
pub async fn run_pipeline(
    pipeline_path: &Path,
    project_root: Option<PathBuf>,
    story_path: Option<PathBuf>,
    replay: Option<PathBuf>,
    overrides: RetryOverrides,
) -> MaestroResult<bool> {
    let root = resolve_root(pipeline_path, project_root);
    let mut config = PipelineConfig::from_file(pipeline_path)?;
    if overrides.no_retry || overrides.max_retries.is_some() || overrides.backoff_ms.is_some() {
        let policy = overrides.apply(config.retry().clone());
        config.override_retry(policy);
    }
    let pipeline = LoadedPipeline::load(&root, config)?;
    let gateway = build_gateway(&pipeline, replay.as_deref())?;

    info!(
        pipeline = %pipeline.config().name(),
        runs = pipeline.config().runs().len(),
        root = %root.display(),
        "starting pipeline"
    );

    let mut runner = PipelineRunner::new(pipeline, gateway);
    let report = runner.run().await?;

    for (index, run) in report.runs.iter().enumerate() {
        let status = match run.state {
            TerminalState::Continuing => "OK",
            TerminalState::Breaking => "BREAK",
            TerminalState::Failed => "FAILED",
        };
        println!(
            "[RUN {}] '{}' finished with status {} after {} attempt(s)",
            index + 1,
            run.run_name,
            status,
            run.attempts
        );
    }
    println!(
        "{} succeeded, {} failed{}",
        report.succeeded(),
        report.failed(),
        if report.halted { ", pipeline halted" } else { "" }
    );

    if let Some(path) = story_path {
        runner.story().save(&path)?;
        println!("story written to {}", path.display());
    }

    Ok(report.failed() == 0 && !report.halted)
}

/// Validate a pipeline configuration without executing it.
pub async fn check_pipeline(
    pipeline_path: &Path,
    project_root: Option<PathBuf>,
) -> MaestroResult<()> {
    let root = resolve_root(pipeline_path, project_root);
    let config = PipelineConfig::from_file(pipeline_path)?;
    let pipeline = LoadedPipeline::load(&root, config)?;

    let providers: Vec<String> = pipeline.providers().into_iter().collect();
    println!(
        "pipeline '{}' is valid: {} run(s), providers: {}",
        pipeline.config().name(),
        pipeline.config().runs().len(),
        providers.join(", ")
    );
    Ok(())
}
