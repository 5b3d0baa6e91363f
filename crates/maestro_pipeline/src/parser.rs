//! Response parsing: raw provider payload to ordered action records.
//!
//! The canonical, model-facing envelope is:
//!
//! ```json
//! { "agent": { "actions": [ { "type": "...", "params": { ... } } ] } }
//! ```
//!
//! Adapters may instead return the chat-completions transport envelope
//! (`choices[0].message.content`, with string content holding JSON); the
//! parser unwraps that first. Any deviation from the canonical shape is a
//! model-output defect, a validation failure eligible for rerun, never a
//! transport defect.

use maestro_core::{ActionKind, ActionRecord, RawResponse};
use maestro_error::{ResponseError, ResponseErrorKind};
use serde_json::Value;
use std::str::FromStr;
use tracing::instrument;

/// Decode a raw provider payload into the ordered action list.
///
/// # Errors
///
/// Returns a [`ResponseError`] on any shape deviation: missing keys, wrong
/// types, an empty action list, or an action type outside the closed
/// vocabulary.
#[instrument(skip(raw))]
pub fn parse_actions(raw: &RawResponse) -> Result<Vec<ActionRecord>, ResponseError> {
    let content = extract_content(&raw.payload)?;

    let object = content
        .as_object()
        .ok_or_else(|| ResponseError::new(ResponseErrorKind::NotObject))?;

    let agent = object
        .get("agent")
        .and_then(Value::as_object)
        .ok_or_else(|| ResponseError::new(ResponseErrorKind::MissingAgent))?;

    let actions = agent
        .get("actions")
        .and_then(Value::as_array)
        .ok_or_else(|| ResponseError::new(ResponseErrorKind::MissingActions))?;

    if actions.is_empty() {
        return Err(ResponseError::new(ResponseErrorKind::EmptyActions));
    }

    let mut records = Vec::with_capacity(actions.len());
    for (position, entry) in actions.iter().enumerate() {
        records.push(convert_action(position, entry)?);
    }
    Ok(records)
}

/// Unwrap the transport envelope, if present, and return the content value.
fn extract_content(payload: &Value) -> Result<Value, ResponseError> {
    let Some(choices) = payload.get("choices") else {
        // No transport envelope: the payload itself is the content.
        return Ok(payload.clone());
    };

    let first = choices
        .as_array()
        .and_then(|c| c.first())
        .ok_or_else(|| ResponseError::new(ResponseErrorKind::EmptyChoices))?;

    let content = first
        .pointer("/message/content")
        .ok_or_else(|| ResponseError::new(ResponseErrorKind::MissingContent))?;

    match content {
        Value::String(text) => serde_json::from_str(text)
            .map_err(|e| ResponseError::new(ResponseErrorKind::NotJson(e.to_string()))),
        other => Ok(other.clone()),
    }
}

fn convert_action(position: usize, entry: &Value) -> Result<ActionRecord, ResponseError> {
    let object = entry.as_object().ok_or_else(|| {
        ResponseError::new(ResponseErrorKind::BadAction {
            position,
            message: "not an object".to_string(),
        })
    })?;

    let tag = object
        .get("type")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            ResponseError::new(ResponseErrorKind::BadAction {
                position,
                message: "'type' must be a non-empty string".to_string(),
            })
        })?;

    let kind = ActionKind::from_str(tag).map_err(|_| {
        ResponseError::new(ResponseErrorKind::UnknownActionType {
            position,
            name: tag.to_string(),
        })
    })?;

    let params = match object.get("params") {
        None | Some(Value::Null) => serde_json::Map::new(),
        Some(Value::Object(map)) => map.clone(),
        Some(_) => {
            return Err(ResponseError::new(ResponseErrorKind::BadAction {
                position,
                message: "'params' must be an object".to_string(),
            }));
        }
    };

    Ok(ActionRecord {
        kind,
        params,
        position,
    })
}
