//! Collapses heterogeneous remote failures into one displayable message.

use serde_json::Value;
use shared::error::ErrorBody;

use crate::error::RemoteFailure;

pub const FALLBACK_MESSAGE: &str = "An unexpected error occurred";

type Extractor = fn(&RemoteFailure) -> Option<String>;

// Order matters: the first extractor that recognises the failure wins.
const EXTRACTORS: [Extractor; 4] = [
    plain_text,
    wrapped_data_message,
    status_message,
    error_message,
];

/// Returns a non-empty, human-readable message for any failure.
pub fn normalize(failure: &RemoteFailure) -> String {
    EXTRACTORS
        .iter()
        .find_map(|extract| extract(failure))
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string())
}

fn non_blank(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn string_at(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(Value::as_str).and_then(non_blank)
}

fn plain_text(failure: &RemoteFailure) -> Option<String> {
    match failure {
        RemoteFailure::Text(text) => non_blank(text),
        RemoteFailure::Payload(Value::String(text)) => non_blank(text),
        _ => None,
    }
}

/// `error.data.message`. For HTTP failures the response body is the `data`.
fn wrapped_data_message(failure: &RemoteFailure) -> Option<String> {
    match failure {
        RemoteFailure::Payload(value) => string_at(value, "/data/message"),
        RemoteFailure::Http { body, .. } => ErrorBody::from_value(body)
            .and_then(|body| body.message)
            .and_then(|message| non_blank(&message)),
        _ => None,
    }
}

fn status_message(failure: &RemoteFailure) -> Option<String> {
    match failure {
        RemoteFailure::Payload(value) => string_at(value, "/statusMessage"),
        RemoteFailure::Http { reason, body, .. } => ErrorBody::from_value(body)
            .and_then(|body| body.status_message)
            .and_then(|message| non_blank(&message))
            .or_else(|| reason.as_deref().and_then(non_blank)),
        _ => None,
    }
}

fn error_message(failure: &RemoteFailure) -> Option<String> {
    match failure {
        RemoteFailure::Payload(value) => string_at(value, "/message"),
        RemoteFailure::Http { status, .. } => Some(format!("HTTP {status}")),
        RemoteFailure::Transport(err) => non_blank(&err.to_string()),
        RemoteFailure::Text(_) => None,
    }
}
