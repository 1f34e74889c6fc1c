use serde_json::Value;
use thiserror::Error;

/// Failure reported by a [`crate::RemoteAdapter`].
///
/// Transports disagree on how they fail, so the variants mirror the shapes
/// seen in practice rather than a single error type. [`crate::normalize`]
/// turns any of them into one user-facing message.
#[derive(Debug, Error)]
pub enum RemoteFailure {
    /// A bare message.
    #[error("{0}")]
    Text(String),
    /// An arbitrary value raised by the remote side (may be null, a number, or
    /// an object of unknown shape).
    #[error("remote rejected the request: {0}")]
    Payload(Value),
    /// A non-2xx HTTP response. `body` is the decoded response body, `null`
    /// when empty.
    #[error("HTTP {status}")]
    Http {
        status: u16,
        reason: Option<String>,
        body: Value,
    },
    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}

impl From<String> for RemoteFailure {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for RemoteFailure {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<reqwest::Error> for RemoteFailure {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport(value.into())
    }
}

/// Error recorded in [`crate::MutationState::last_error`].
///
/// Remote variants display as the normalized message alone so the UI can show
/// them verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("{label} '{id}' not found")]
    NotFound { label: String, id: String },
    #[error("{message}")]
    RemoteCreate { message: String },
    #[error("{message}")]
    RemoteUpdate { id: String, message: String },
    #[error("{message}")]
    RemoteDelete { id: String, message: String },
}

impl MutationError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Identifier the failed operation targeted; `None` for creates.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::NotFound { id, .. }
            | Self::RemoteUpdate { id, .. }
            | Self::RemoteDelete { id, .. } => Some(id),
            Self::RemoteCreate { .. } => None,
        }
    }
}
