//! Provider adapters for Maestro.
//!
//! Each adapter is a thin client implementing [`maestro_interface::ProviderDriver`]:
//! it translates the uniform [`maestro_core::ProviderRequest`] into one
//! vendor wire format, surfaces failures as classified provider errors, and
//! returns the raw payload untouched. Retry policy lives in the gateway,
//! never here.
//!
//! The [`ScriptedDriver`] replays a pre-recorded response sequence and is
//! the backbone of deterministic dry runs and the engine's test suite.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod gemini;
mod openai;
mod scripted;

pub use gemini::GeminiClient;
pub use openai::OpenAiClient;
pub use scripted::{ScriptedDriver, ScriptedReply};

use maestro_error::{ProviderError, ProviderErrorKind};

/// Map an HTTP failure status to a classified provider error kind.
///
/// Shared by the HTTP adapters so transient/fatal classification cannot
/// drift between vendors.
pub(crate) fn classify_status(status: u16, body: String) -> ProviderError {
    let kind = match status {
        401 | 403 => ProviderErrorKind::Auth(body),
        400 | 422 => ProviderErrorKind::MalformedRequest(body),
        404 => ProviderErrorKind::UnknownModel(body),
        408 => ProviderErrorKind::Timeout,
        429 => ProviderErrorKind::RateLimited(body),
        s if s >= 500 => ProviderErrorKind::ServerError {
            status: s,
            message: body,
        },
        s => ProviderErrorKind::BadPayload(format!("unexpected HTTP {s}: {body}")),
    };
    ProviderError::new(kind)
}

/// Map a reqwest transport failure to a classified provider error kind.
pub(crate) fn classify_transport(err: reqwest::Error) -> ProviderError {
    let kind = if err.is_timeout() {
        ProviderErrorKind::Timeout
    } else {
        ProviderErrorKind::Network(err.to_string())
    };
    ProviderError::new(kind)
}
