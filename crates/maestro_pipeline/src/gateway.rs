//! The provider gateway: driver selection and transient-failure retry.

use crate::{PipelineStory, RetryPolicy};
use maestro_core::{ProviderRequest, RawResponse, StoryEntry, StoryEvent};
use maestro_error::{MaestroError, MaestroErrorKind, ProviderError, ProviderErrorKind};
use maestro_interface::ProviderDriver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_retry2::strategy::ExponentialBackoff;
use tracing::{instrument, warn};

/// Uniform call surface over heterogeneous providers.
///
/// Drivers are registered by provider id at configuration time and selected
/// per attempt. The retry policy lives here, not
/// in the run executor: transient failures (timeout, rate limit, 5xx,
/// network) are retried with capped exponential backoff; fatal failures
/// (auth, malformed request, unknown model) propagate immediately.
/// Exhausting retries surfaces `Unavailable`, which the executor treats as
/// an attempt failure eligible for strategy rerun.
#[derive(Default)]
pub struct ProviderGateway {
    drivers: HashMap<String, Arc<dyn ProviderDriver>>,
}

impl std::fmt::Debug for ProviderGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.drivers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("ProviderGateway")
            .field("providers", &ids)
            .finish()
    }
}

impl ProviderGateway {
    /// Create an empty gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a driver under a provider id.
    pub fn register(&mut self, provider: impl Into<String>, driver: Arc<dyn ProviderDriver>) {
        self.drivers.insert(provider.into(), driver);
    }

    /// Builder-style registration.
    pub fn with_driver(
        mut self,
        provider: impl Into<String>,
        driver: Arc<dyn ProviderDriver>,
    ) -> Self {
        self.register(provider, driver);
        self
    }

    /// Whether a provider id has a registered driver.
    pub fn supports(&self, provider: &str) -> bool {
        self.drivers.contains_key(provider)
    }

    /// Invoke a provider with transient-failure retry.
    ///
    /// Each retry is recorded in the story before its backoff sleep so the
    /// audit trail shows exactly how many calls a response cost.
    ///
    /// # Errors
    ///
    /// - fatal provider errors propagate unchanged, without retry
    /// - exhausted retries surface `ProviderErrorKind::Unavailable` carrying
    ///   the total call count
    #[instrument(skip(self, request, story), fields(model = %request.model))]
    pub async fn invoke(
        &self,
        provider: &str,
        request: &ProviderRequest,
        policy: &RetryPolicy,
        story: &mut PipelineStory,
        run: &str,
        attempt: usize,
    ) -> Result<RawResponse, MaestroError> {
        let driver = self.drivers.get(provider).ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::UnknownProvider(provider.to_string()))
        })?;

        let mut delays = ExponentialBackoff::from_millis(*policy.backoff_ms())
            .factor(2)
            .max_delay(Duration::from_secs(*policy.max_delay_secs()))
            .take(*policy.limit());

        let mut calls = 1usize;
        loop {
            match driver.invoke(request).await {
                Ok(response) => return Ok(response),
                Err(err) => {
                    let Some(kind) = transient_kind(&err) else {
                        return Err(err);
                    };

                    match delays.next() {
                        Some(delay) => {
                            warn!(
                                provider,
                                call = calls,
                                delay_ms = delay.as_millis() as u64,
                                error = %kind,
                                "transient provider failure, retrying"
                            );
                            story.record(StoryEntry::now(
                                run,
                                attempt,
                                StoryEvent::ProviderRetried,
                                format!("call {calls} failed ({kind}), retrying"),
                            ));
                            tokio::time::sleep(delay).await;
                            calls += 1;
                        }
                        None => {
                            return Err(ProviderError::new(ProviderErrorKind::Unavailable {
                                attempts: calls,
                            })
                            .into());
                        }
                    }
                }
            }
        }
    }
}

/// Extract the provider error kind only when it is transient.
fn transient_kind(err: &MaestroError) -> Option<&ProviderErrorKind> {
    match err.kind() {
        MaestroErrorKind::Provider(p) if p.kind.is_retryable() => Some(&p.kind),
        _ => None,
    }
}

/// Whether an error is a fatal provider failure (no retry, no rerun).
pub(crate) fn is_provider_fatal(err: &MaestroError) -> bool {
    match err.kind() {
        MaestroErrorKind::Provider(p) => matches!(
            p.kind,
            ProviderErrorKind::Auth(_)
                | ProviderErrorKind::MalformedRequest(_)
                | ProviderErrorKind::UnknownModel(_)
                | ProviderErrorKind::UnknownProvider(_)
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_provider_is_fatal() {
        let err: MaestroError =
            ProviderError::new(ProviderErrorKind::UnknownProvider("acme".into())).into();
        assert!(is_provider_fatal(&err));
        assert!(transient_kind(&err).is_none());
    }

    #[test]
    fn rate_limit_is_transient_not_fatal() {
        let err: MaestroError =
            ProviderError::new(ProviderErrorKind::RateLimited("429".into())).into();
        assert!(!is_provider_fatal(&err));
        assert!(transient_kind(&err).is_some());
    }
}
