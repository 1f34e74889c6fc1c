use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body emitted by the collection API on non-2xx responses.
///
/// `{ "statusCode": 404, "statusMessage": "Not Found", "message": "...", "data": ... }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorBody {
    pub fn new(status_code: u16, status_message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            status_message: Some(status_message.into()),
            message: None,
            data: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Interprets an arbitrary JSON value as an error body. Non-objects and
    /// objects whose known fields have the wrong type yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        Self::deserialize(value).ok()
    }
}
