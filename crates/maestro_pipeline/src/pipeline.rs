//! The pipeline runner: sequencing runs and owning shared state.

use crate::{
    ContextPool, IoLogger, PipelineConfig, PipelineStory, ProfileDefinition, ProviderGateway,
    RunExecutor, StrategyDefinition,
};
use maestro_core::{StoryEntry, StoryEvent};
use maestro_error::{ConfigError, MaestroResult, ProviderError, ProviderErrorKind};
use maestro_interface::{PipelineReport, RunReport, TerminalState};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// A pipeline configuration with every referenced definition resolved.
///
/// All profile and strategy files, including profiles referenced only by
/// strategy attempts, are loaded and validated here, before any run
/// executes. A missing reference is a fatal configuration error.
#[derive(Debug)]
pub struct LoadedPipeline {
    config: PipelineConfig,
    project_root: PathBuf,
    profiles: HashMap<PathBuf, ProfileDefinition>,
    strategies: HashMap<PathBuf, StrategyDefinition>,
}

impl LoadedPipeline {
    /// Resolve every reference in a configuration against a project root.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for any profile or strategy file that is
    /// missing or invalid.
    #[instrument(skip_all, fields(pipeline = %config.name(), root = %project_root.as_ref().display()))]
    pub fn load<P: AsRef<Path>>(project_root: P, config: PipelineConfig) -> MaestroResult<Self> {
        let project_root = project_root.as_ref().to_path_buf();
        let mut profiles = HashMap::new();
        let mut strategies = HashMap::new();

        for run in config.runs() {
            load_profile(&project_root, run.profile(), &mut profiles)?;

            if let Some(strategy_ref) = run.strategy() {
                if !strategies.contains_key(strategy_ref) {
                    let path = resolve(&project_root, strategy_ref);
                    let strategy = StrategyDefinition::from_file(&path).map_err(|e| {
                        ConfigError::reference("strategy", strategy_ref.display(), e.message)
                    })?;
                    strategies.insert(strategy_ref.clone(), strategy);
                }
                let strategy = &strategies[strategy_ref];
                for attempt in strategy.attempts() {
                    if let Some(profile_ref) = attempt.profile() {
                        load_profile(&project_root, profile_ref, &mut profiles)?;
                    }
                }
            }
        }

        info!(
            profiles = profiles.len(),
            strategies = strategies.len(),
            "pipeline loaded"
        );
        Ok(Self {
            config,
            project_root,
            profiles,
            strategies,
        })
    }

    /// The validated configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The root every relative reference resolves against.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// A profile by its as-written reference.
    ///
    /// References are resolved at load time, so lookups cannot miss.
    pub fn profile(&self, reference: &Path) -> &ProfileDefinition {
        self.profiles
            .get(reference)
            .expect("profile references resolved at load")
    }

    /// A strategy by its as-written reference.
    pub fn strategy(&self, reference: &Path) -> &StrategyDefinition {
        self.strategies
            .get(reference)
            .expect("strategy references resolved at load")
    }

    /// Every provider id the pipeline can select, across runs and strategy
    /// attempts, in sorted order.
    pub fn providers(&self) -> BTreeSet<String> {
        let mut ids = BTreeSet::new();
        for profile in self.profiles.values() {
            ids.insert(profile.provider().clone());
        }
        for strategy in self.strategies.values() {
            for attempt in strategy.attempts() {
                if let Some(provider) = attempt.provider() {
                    ids.insert(provider.clone());
                }
            }
        }
        ids
    }
}

fn resolve(root: &Path, reference: &Path) -> PathBuf {
    if reference.is_absolute() {
        reference.to_path_buf()
    } else {
        root.join(reference)
    }
}

fn load_profile(
    root: &Path,
    reference: &Path,
    profiles: &mut HashMap<PathBuf, ProfileDefinition>,
) -> Result<(), ConfigError> {
    if profiles.contains_key(reference) {
        return Ok(());
    }
    let path = resolve(root, reference);
    let profile = ProfileDefinition::from_file(&path)
        .map_err(|e| ConfigError::reference("profile", reference.display(), e.message))?;
    profiles.insert(reference.to_path_buf(), profile);
    Ok(())
}

/// Mutable state scoped to one pipeline execution.
///
/// Passed by reference into the runner and executor, never held as ambient
/// global state, so per-run determinism stays testable in isolation.
#[derive(Debug, Default)]
pub struct PipelineState {
    /// Set by a break action; no further runs execute once true
    pub halted: bool,
    /// Shared variable pool populated by prior runs' outputs
    pub pool: ContextPool,
}

/// Sequences a pipeline's runs and owns the story and shared pool.
pub struct PipelineRunner {
    pipeline: LoadedPipeline,
    gateway: ProviderGateway,
    story: PipelineStory,
}

impl PipelineRunner {
    /// Create a runner over a loaded pipeline and a configured gateway.
    pub fn new(pipeline: LoadedPipeline, gateway: ProviderGateway) -> Self {
        Self {
            pipeline,
            gateway,
            story: PipelineStory::new(),
        }
    }

    /// The story accumulated so far.
    pub fn story(&self) -> &PipelineStory {
        &self.story
    }

    /// The loaded pipeline.
    pub fn pipeline(&self) -> &LoadedPipeline {
        &self.pipeline
    }

    /// Execute every run in declared order.
    ///
    /// On `Breaking` the pipeline halts immediately with a partial report.
    /// A `Failed` run halts only when the pipeline is configured with
    /// `halt_on_failure`, or when the failure was a fatal provider error;
    /// otherwise it is logged and the pipeline advances.
    ///
    /// # Errors
    ///
    /// Returns `ProviderErrorKind::UnknownProvider` before any run executes
    /// if a provider the pipeline can select has no registered driver.
    #[instrument(skip_all, fields(pipeline = %self.pipeline.config().name()))]
    pub async fn run(&mut self) -> MaestroResult<PipelineReport> {
        // Every provider the pipeline can select must have a driver before
        // the first run executes.
        for provider in self.pipeline.providers() {
            if !self.gateway.supports(&provider) {
                return Err(
                    ProviderError::new(ProviderErrorKind::UnknownProvider(provider)).into(),
                );
            }
        }

        let io = IoLogger::new(
            self.pipeline.project_root(),
            self.pipeline.config().io_log().clone(),
        );
        let mut state = PipelineState::default();
        let mut report = PipelineReport::default();

        for run in self.pipeline.config().runs() {
            if state.halted {
                break;
            }

            let executor = RunExecutor::new(&self.pipeline, &self.gateway, &io);
            let execution = executor
                .execute(run, &mut state.pool, &mut self.story)
                .await;

            info!(
                run = %run.name(),
                state = %execution.state,
                attempts = execution.attempts,
                "run finished"
            );
            report.runs.push(RunReport {
                run_name: run.name().clone(),
                state: execution.state,
                attempts: execution.attempts,
            });

            match execution.state {
                TerminalState::Breaking => {
                    state.halted = true;
                    report.halted = true;
                    self.story.record(StoryEntry::now(
                        run.name(),
                        execution.attempts.saturating_sub(1),
                        StoryEvent::PipelineHalted,
                        "break honored at run boundary",
                    ));
                }
                TerminalState::Failed => {
                    if execution.fatal {
                        warn!(run = %run.name(), "fatal provider failure, stopping pipeline");
                        break;
                    }
                    if *self.pipeline.config().halt_on_failure() {
                        warn!(run = %run.name(), "halt_on_failure set, stopping pipeline");
                        break;
                    }
                }
                TerminalState::Continuing => {}
            }
        }

        Ok(report)
    }
}
