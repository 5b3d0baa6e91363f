//! Deterministic scripted driver for replay and testing.

use async_trait::async_trait;
use maestro_core::{ProviderRequest, RawResponse};
use maestro_error::{MaestroResult, ProviderError, ProviderErrorKind};
use maestro_interface::ProviderDriver;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One scripted reply: either a payload or a classified failure.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this payload as the provider response
    Payload(serde_json::Value),
    /// Fail the call with this provider error kind
    Fail(ProviderErrorKind),
}

/// A driver that replays a fixed reply sequence.
///
/// Replies are consumed in order, one per `invoke` call, independent of the
/// request contents; given identical configuration the engine therefore
/// observes an identical call/response sequence on every execution. This is
/// the reproducibility harness the engine's guarantees are verified
/// against, and doubles as an offline dry-run driver.
///
/// # Examples
///
/// ```
/// use maestro_models::{ScriptedDriver, ScriptedReply};
/// use serde_json::json;
///
/// let driver = ScriptedDriver::new(vec![ScriptedReply::Payload(json!({
///     "agent": { "actions": [{ "type": "continue", "params": {} }] }
/// }))]);
/// assert_eq!(driver.remaining(), 1);
/// ```
#[derive(Debug)]
pub struct ScriptedDriver {
    replies: Mutex<VecDeque<ScriptedReply>>,
}

impl ScriptedDriver {
    /// Create a driver from an ordered reply script.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
        }
    }

    /// Create a driver whose every call succeeds with the given payloads.
    pub fn from_payloads(payloads: Vec<serde_json::Value>) -> Self {
        Self::new(payloads.into_iter().map(ScriptedReply::Payload).collect())
    }

    /// Number of replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().expect("scripted replies lock").len()
    }
}

#[async_trait]
impl ProviderDriver for ScriptedDriver {
    async fn invoke(&self, _req: &ProviderRequest) -> MaestroResult<RawResponse> {
        let next = self
            .replies
            .lock()
            .expect("scripted replies lock")
            .pop_front();

        match next {
            Some(ScriptedReply::Payload(value)) => Ok(RawResponse::new(value)),
            Some(ScriptedReply::Fail(kind)) => Err(ProviderError::new(kind).into()),
            None => Err(ProviderError::new(ProviderErrorKind::BadPayload(
                "scripted reply sequence exhausted".to_string(),
            ))
            .into()),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maestro_error::MaestroErrorKind;
    use serde_json::json;

    fn empty_request() -> ProviderRequest {
        ProviderRequest::default()
    }

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let driver = ScriptedDriver::from_payloads(vec![json!({"n": 1}), json!({"n": 2})]);
        let first = driver.invoke(&empty_request()).await.unwrap();
        let second = driver.invoke(&empty_request()).await.unwrap();
        assert_eq!(first.payload["n"], 1);
        assert_eq!(second.payload["n"], 2);
        assert_eq!(driver.remaining(), 0);
    }

    #[tokio::test]
    async fn scripted_failures_surface_their_kind() {
        let driver = ScriptedDriver::new(vec![ScriptedReply::Fail(
            ProviderErrorKind::RateLimited("scripted".into()),
        )]);
        let err = driver.invoke(&empty_request()).await.unwrap_err();
        match err.kind() {
            MaestroErrorKind::Provider(p) => {
                assert!(p.kind.is_retryable());
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }
}
