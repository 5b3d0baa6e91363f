//! Trait definitions for provider drivers.

use async_trait::async_trait;
use maestro_core::{ProviderRequest, RawResponse};
use maestro_error::MaestroResult;

/// Core trait that all provider adapters must implement.
///
/// The gateway selects a driver by provider id at configuration time and
/// calls it through this interface only; retry policy and failure
/// classification live in the gateway, not in adapters. Adapters surface
/// failures as `ProviderError`s with the kind that best describes the
/// condition, and the gateway decides whether that kind is transient.
#[async_trait]
pub trait ProviderDriver: Send + Sync {
    /// Send one rendered request and return the provider's raw payload.
    async fn invoke(&self, req: &ProviderRequest) -> MaestroResult<RawResponse>;

    /// Provider name (e.g., "openai", "gemini", "scripted").
    fn provider_name(&self) -> &'static str;
}
