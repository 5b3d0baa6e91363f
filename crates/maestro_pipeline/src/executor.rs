//! The run executor: one run's attempt loop as an explicit state machine.

use crate::gateway::is_provider_fatal;
use crate::{
    ActionEngine, ContextAggregator, ContextPool, EngineSignal, IoLogger, LoadedPipeline,
    PipelineStory, ProviderGateway, RenderInputs, RunDefinition, StrategyArbiter,
    parse_actions,
    strategy::{Arbitration, AttemptOverride},
};
use maestro_core::{ActionRecord, ProviderRequest, RawResponse, StoryEntry, StoryEvent};
use maestro_error::MaestroResult;
use maestro_interface::TerminalState;
use serde_json::json;
use tracing::{error, instrument};

/// Phases of a run's execution.
///
/// The machine, not incidental control flow, is the source of truth:
/// transitions happen only through [`RunPhase::on`], driven by classified
/// outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    /// Render the prompt from profile, context, and agent input
    Building,
    /// Call the provider through the gateway
    Calling,
    /// Decode the raw response into an action list
    Parsing,
    /// Execute actions in array order
    ActingOut,
    /// Consult the strategy arbiter for the next attempt
    Retrying,
    /// Terminal: the run succeeded
    Continuing,
    /// Terminal: the run requested a pipeline halt
    Breaking,
    /// Terminal: no recovery path remains
    Failed,
}

/// Classified outcome of one phase's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseOutcome {
    /// Prompt rendered and request assembled
    Built,
    /// Context merge or rendering failed (rerun-eligible)
    BuildFailed,
    /// The gateway returned a response
    CallSucceeded,
    /// The gateway failed fatally (auth, malformed request, unknown model)
    CallFailedFatal,
    /// The gateway failed after exhausting transient retries
    CallFailedRetryable,
    /// The response decoded into a non-empty action list
    Parsed,
    /// The response violated the expected shape (rerun-eligible)
    ParseFailed,
    /// Every action completed without a control signal
    ActionsCompleted,
    /// A break action fired
    BreakSignalled,
    /// A trigger_retry/rerun action fired
    RerunSignalled,
    /// A validator check failed
    ValidatorRejected,
    /// An action failed or was denied by the allow-list (rerun-eligible)
    ActionFailed,
    /// The arbiter supplied an override for the next attempt
    OverrideApplied,
    /// The arbiter is exhausted
    Exhausted,
}

impl RunPhase {
    /// Advance the machine by one classified outcome.
    pub fn on(self, outcome: PhaseOutcome) -> RunPhase {
        use PhaseOutcome::*;
        use RunPhase::*;
        match (self, outcome) {
            (Building, Built) => Calling,
            (Building, BuildFailed) => Retrying,
            (Calling, CallSucceeded) => Parsing,
            (Calling, CallFailedFatal) => Failed,
            (Calling, CallFailedRetryable) => Retrying,
            (Parsing, Parsed) => ActingOut,
            (Parsing, ParseFailed) => Retrying,
            (ActingOut, ActionsCompleted) => Continuing,
            (ActingOut, BreakSignalled) => Breaking,
            (ActingOut, RerunSignalled) => Retrying,
            (ActingOut, ValidatorRejected) => Retrying,
            (ActingOut, ActionFailed) => Retrying,
            (Retrying, OverrideApplied) => Building,
            (Retrying, Exhausted) => Failed,
            // Outcomes outside a phase's vocabulary cannot advance it.
            (phase, _) => phase,
        }
    }

    /// Whether this phase ends the run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunPhase::Continuing | RunPhase::Breaking | RunPhase::Failed
        )
    }
}

/// Mutable state scoped to one run's execution.
#[derive(Debug, Clone)]
pub struct AttemptState {
    /// Current attempt index (0 = the run's own profile)
    pub index: usize,
    /// Next strategy attempt to consume
    pub strategy_cursor: usize,
    /// Total attempt budget: strategy attempts plus the zeroth
    pub budget: usize,
    /// Overrides in force for the current attempt only
    pub overrides: AttemptOverride,
    /// Verdict of the most recent validator check, if any ran
    pub last_verdict: Option<bool>,
}

impl AttemptState {
    /// Fresh state with a full budget.
    pub fn new(budget: usize) -> Self {
        Self {
            index: 0,
            strategy_cursor: 0,
            budget,
            overrides: AttemptOverride::default(),
            last_verdict: None,
        }
    }

    /// Attempts still available after the current one.
    pub fn remaining(&self) -> usize {
        self.budget.saturating_sub(self.index + 1)
    }
}

/// How a run ended, with the attempts it consumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunExecution {
    /// Terminal state reached
    pub state: TerminalState,
    /// Attempts consumed (1 = succeeded on the zeroth attempt)
    pub attempts: usize,
    /// True when a fatal provider failure ended the run; the pipeline stops
    /// regardless of its failure policy
    pub fatal: bool,
}

/// Drives one run through its attempt loop.
#[derive(Debug)]
pub struct RunExecutor<'a> {
    pipeline: &'a LoadedPipeline,
    gateway: &'a ProviderGateway,
    io: &'a IoLogger,
}

impl<'a> RunExecutor<'a> {
    /// Create an executor bound to a loaded pipeline and gateway.
    pub fn new(
        pipeline: &'a LoadedPipeline,
        gateway: &'a ProviderGateway,
        io: &'a IoLogger,
    ) -> Self {
        Self {
            pipeline,
            gateway,
            io,
        }
    }

    /// Execute the run to a terminal state.
    ///
    /// Each loop iteration over `Building` is one attempt; the attempt
    /// count is bounded by the strategy's budget plus one.
    #[instrument(skip_all, fields(run = %run.name()))]
    pub async fn execute(
        &self,
        run: &RunDefinition,
        pool: &mut ContextPool,
        story: &mut PipelineStory,
    ) -> RunExecution {
        let aggregator = ContextAggregator::new(self.pipeline.project_root());
        let strategy = run
            .strategy()
            .as_ref()
            .map(|path| self.pipeline.strategy(path));
        let arbiter = StrategyArbiter::new(strategy);
        let mut state = AttemptState::new(arbiter.max_attempts());
        let policy = run
            .retry()
            .clone()
            .unwrap_or_else(|| self.pipeline.config().retry().clone());

        story.record(StoryEntry::now(
            run.name(),
            0,
            StoryEvent::RunStarted,
            format!("profile={} budget={}", run.profile().display(), state.budget),
        ));

        let mut phase = RunPhase::Building;
        let mut fatal = false;
        let mut provider = String::new();
        let mut request: Option<ProviderRequest> = None;
        let mut raw: Option<RawResponse> = None;
        let mut actions: Option<Vec<ActionRecord>> = None;

        while !phase.is_terminal() {
            phase = match phase {
                RunPhase::Building => {
                    let attempt = state.index;
                    match self.build(run, &state, pool, &aggregator, story) {
                        Ok((req, prov)) => {
                            if self.io.enabled() {
                                let payload = serde_json::to_value(&req)
                                    .unwrap_or_else(|_| json!(null));
                                if let Err(e) =
                                    self.io.write_request(run.name(), attempt, &payload)
                                {
                                    error!(error = %e, "request capture failed");
                                }
                            }
                            provider = prov;
                            request = Some(req);
                            phase.on(PhaseOutcome::Built)
                        }
                        Err(err) => {
                            story.record(StoryEntry::now(
                                run.name(),
                                attempt,
                                StoryEvent::ErrorRecorded,
                                err.to_string(),
                            ));
                            phase.on(PhaseOutcome::BuildFailed)
                        }
                    }
                }
                RunPhase::Calling => {
                    let attempt = state.index;
                    let req = request.as_ref().expect("request assembled in Building");
                    let mut entry = StoryEntry::now(
                        run.name(),
                        attempt,
                        StoryEvent::ProviderCalled,
                        format!("provider={provider} model={}", req.model),
                    );
                    if self.io.enabled() {
                        if let Ok(payload) = serde_json::to_value(req) {
                            entry = entry.with_payload(payload);
                        }
                    }
                    story.record(entry);
                    match self
                        .gateway
                        .invoke(&provider, req, &policy, story, run.name(), attempt)
                        .await
                    {
                        Ok(response) => {
                            if self.io.enabled() {
                                if let Err(e) = self.io.write_response(
                                    run.name(),
                                    attempt,
                                    &response.payload,
                                ) {
                                    error!(error = %e, "response capture failed");
                                }
                            }
                            raw = Some(response);
                            phase.on(PhaseOutcome::CallSucceeded)
                        }
                        Err(err) => {
                            story.record(StoryEntry::now(
                                run.name(),
                                attempt,
                                StoryEvent::ProviderFailed,
                                err.to_string(),
                            ));
                            if is_provider_fatal(&err) {
                                fatal = true;
                                phase.on(PhaseOutcome::CallFailedFatal)
                            } else {
                                phase.on(PhaseOutcome::CallFailedRetryable)
                            }
                        }
                    }
                }
                RunPhase::Parsing => {
                    let attempt = state.index;
                    let response = raw.as_ref().expect("response received in Calling");
                    match parse_actions(response) {
                        Ok(decoded) => {
                            let mut entry = StoryEntry::now(
                                run.name(),
                                attempt,
                                StoryEvent::ResponseParsed,
                                format!("{} action(s)", decoded.len()),
                            );
                            if self.io.enabled() {
                                entry = entry.with_payload(response.payload.clone());
                            }
                            story.record(entry);
                            actions = Some(decoded);
                            phase.on(PhaseOutcome::Parsed)
                        }
                        Err(err) => {
                            story.record(StoryEntry::now(
                                run.name(),
                                attempt,
                                StoryEvent::ErrorRecorded,
                                err.to_string(),
                            ));
                            phase.on(PhaseOutcome::ParseFailed)
                        }
                    }
                }
                RunPhase::ActingOut => {
                    let attempt = state.index;
                    let list = actions.as_ref().expect("actions decoded in Parsing");
                    let engine = ActionEngine::new(self.pipeline.project_root(), run);
                    match engine.execute_all(list, pool, story, attempt) {
                        Ok(EngineSignal::Continue) => phase.on(PhaseOutcome::ActionsCompleted),
                        Ok(EngineSignal::Break { .. }) => phase.on(PhaseOutcome::BreakSignalled),
                        Ok(EngineSignal::Rerun { .. }) => phase.on(PhaseOutcome::RerunSignalled),
                        Ok(EngineSignal::ValidatorFailed { .. }) => {
                            state.last_verdict = Some(false);
                            phase.on(PhaseOutcome::ValidatorRejected)
                        }
                        Err(err) => {
                            story.record(StoryEntry::now(
                                run.name(),
                                attempt,
                                StoryEvent::ErrorRecorded,
                                err.to_string(),
                            ));
                            phase.on(PhaseOutcome::ActionFailed)
                        }
                    }
                }
                RunPhase::Retrying => match arbiter.next_attempt(&mut state) {
                    Arbitration::Next(overrides) => {
                        state.index += 1;
                        state.overrides = overrides;
                        story.record(StoryEntry::now(
                            run.name(),
                            state.index,
                            StoryEvent::StrategyApplied,
                            state.overrides.summary(),
                        ));
                        phase.on(PhaseOutcome::OverrideApplied)
                    }
                    Arbitration::Exhausted => {
                        story.record(StoryEntry::now(
                            run.name(),
                            state.index,
                            StoryEvent::StrategyExhausted,
                            arbiter.exhausted_error(run.name(), &state).to_string(),
                        ));
                        phase.on(PhaseOutcome::Exhausted)
                    }
                },
                terminal => terminal,
            };
        }

        let terminal = match phase {
            RunPhase::Continuing => TerminalState::Continuing,
            RunPhase::Breaking => TerminalState::Breaking,
            _ => TerminalState::Failed,
        };
        story.record(StoryEntry::now(
            run.name(),
            state.index,
            StoryEvent::RunFinished,
            format!("{terminal} after {} attempt(s)", state.index + 1),
        ));

        RunExecution {
            state: terminal,
            attempts: state.index + 1,
            fatal,
        }
    }

    /// Render the prompt for the current attempt and assemble the request.
    ///
    /// The attempt's overrides are consulted field by field; anything unset
    /// falls back to the run's own configuration. The originals are never
    /// mutated.
    fn build(
        &self,
        run: &RunDefinition,
        state: &AttemptState,
        pool: &ContextPool,
        aggregator: &ContextAggregator,
        story: &mut PipelineStory,
    ) -> MaestroResult<(ProviderRequest, String)> {
        let profile_path = state
            .overrides
            .profile()
            .clone()
            .unwrap_or_else(|| run.profile().clone());
        let profile = self.pipeline.profile(&profile_path);

        let provider = state
            .overrides
            .provider()
            .clone()
            .unwrap_or_else(|| profile.provider().clone());

        let context_refs = state
            .overrides
            .context_files()
            .as_ref()
            .unwrap_or_else(|| run.context_files());

        story.record(StoryEntry::now(
            run.name(),
            state.index,
            StoryEvent::AttemptStarted,
            format!("profile={} provider={provider}", profile_path.display()),
        ));

        let context_block = aggregator.merge(context_refs)?;
        story.record(StoryEntry::now(
            run.name(),
            state.index,
            StoryEvent::ContextMerged,
            format!("{} file(s)", context_refs.len()),
        ));

        let task_description = run.task_description().clone().unwrap_or_default();
        let allowed: Vec<String> = run
            .allowed_actions()
            .iter()
            .map(|a| a.to_string())
            .collect();
        let agent_input = json!({
            "task_description": task_description,
            "allowed_actions": allowed,
            "context_pool": pool.as_json(),
        });
        let rules_block = format!(
            "Respond with a single JSON object of the form \
             {{\"agent\": {{\"actions\": [{{\"type\": ..., \"params\": {{...}}}}]}}}} \
             and nothing else. Permitted action types for this run: {}.",
            run.allowed_list()
        );

        let messages = profile.render(&RenderInputs {
            agent_input,
            context_block,
            task_description,
            rules_block,
        });

        let request = ProviderRequest {
            model: profile.model().clone(),
            messages,
            temperature: *profile.temperature(),
            top_p: *profile.top_p(),
            max_tokens: *profile.max_tokens(),
            response_shape: profile.response_shape().clone(),
        };
        Ok((request, provider))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_walks_the_expected_phases() {
        use PhaseOutcome::*;
        let mut phase = RunPhase::Building;
        for outcome in [Built, CallSucceeded, Parsed, ActionsCompleted] {
            phase = phase.on(outcome);
        }
        assert_eq!(phase, RunPhase::Continuing);
        assert!(phase.is_terminal());
    }

    #[test]
    fn rerun_signal_loops_back_through_retrying() {
        use PhaseOutcome::*;
        let phase = RunPhase::ActingOut.on(RerunSignalled);
        assert_eq!(phase, RunPhase::Retrying);
        assert_eq!(phase.on(OverrideApplied), RunPhase::Building);
        assert_eq!(phase.on(Exhausted), RunPhase::Failed);
    }

    #[test]
    fn fatal_call_failure_ends_the_run() {
        assert_eq!(
            RunPhase::Calling.on(PhaseOutcome::CallFailedFatal),
            RunPhase::Failed
        );
        assert_eq!(
            RunPhase::Calling.on(PhaseOutcome::CallFailedRetryable),
            RunPhase::Retrying
        );
    }

    #[test]
    fn validator_rejection_is_a_retry_path() {
        assert_eq!(
            RunPhase::ActingOut.on(PhaseOutcome::ValidatorRejected),
            RunPhase::Retrying
        );
    }

    #[test]
    fn outcomes_outside_a_phase_do_not_advance_it() {
        assert_eq!(
            RunPhase::Building.on(PhaseOutcome::ActionsCompleted),
            RunPhase::Building
        );
        assert_eq!(
            RunPhase::Failed.on(PhaseOutcome::Built),
            RunPhase::Failed
        );
    }

    #[test]
    fn attempt_state_tracks_budget() {
        let mut state = AttemptState::new(3);
        assert_eq!(state.remaining(), 2);
        state.index += 1;
        assert_eq!(state.remaining(), 1);
        state.index += 1;
        assert_eq!(state.remaining(), 0);
    }
}
