//! Client error taxonomy and user-facing message extraction.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Fallback shown when a failure carries no usable message
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Keys that carry aggregate (non field-level) messages in backend error bodies
const AGGREGATE_KEYS: &[&str] = &["non_field_errors", "detail", "message", "error"];

/// Failures of a single HTTP exchange, passed through unchanged by the transport
#[derive(Debug, Error, Clone)]
pub enum TransportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {status}")]
    Http { status: u16, body: Value },

    #[error("Invalid request URL: {0}")]
    InvalidUrl(String),
}

impl TransportError {
    pub fn status(&self) -> Option<u16> {
        match self {
            TransportError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Authentication failure (HTTP 401); the only status the refresh layer special-cases
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            TransportError::Http { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Authentication and session failures surfaced to the UI
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidCredentials(String),

    #[error("{message}")]
    Validation { field: Option<String>, message: String },

    #[error("Server returned an unexpected response format: {0}")]
    MalformedResponse(String),

    #[error("Session expired. Please log in again.")]
    SessionExpired,

    #[error("Session refresh failed: {0}")]
    RefreshFailed(#[source] Box<ClientError>),
}

/// Persistence failures of a storage backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Whether this error means the session is gone and the user must log in again
    pub fn is_session_lost(&self) -> bool {
        match self {
            ClientError::Auth(AuthError::SessionExpired) | ClientError::Auth(AuthError::RefreshFailed(_)) => true,
            ClientError::Transport(err) => err.is_unauthorized(),
            _ => false,
        }
    }

    /// Most specific message available for display
    pub fn user_message(&self) -> String {
        self.user_message_or(GENERIC_FAILURE_MESSAGE)
    }

    pub fn user_message_or(&self, fallback: &str) -> String {
        match self {
            ClientError::Transport(TransportError::Http { body, .. }) => {
                extract_message(body).unwrap_or_else(|| fallback.to_string())
            }
            ClientError::Transport(TransportError::Network(_)) => {
                "Unable to reach the server. Check your connection and try again.".to_string()
            }
            ClientError::Transport(TransportError::Timeout(_)) => {
                "The server took too long to respond. Please try again.".to_string()
            }
            ClientError::Auth(err) => err.to_string(),
            _ => fallback.to_string(),
        }
    }
}

/// First string found in a message-like value (plain string or list of strings)
fn first_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Array(items) => items.iter().find_map(first_message),
        _ => None,
    }
}

/// First field-level message in a structured error body, with its field name
pub fn extract_field_error(body: &Value) -> Option<(String, String)> {
    let object = body.as_object()?;
    object
        .iter()
        .filter(|(key, _)| !AGGREGATE_KEYS.contains(&key.as_str()))
        .find_map(|(key, value)| first_message(value).map(|message| (key.clone(), message)))
}

/// Aggregate message: `non_field_errors[0]`, then `detail`, `message`, `error`
pub fn extract_aggregate_message(body: &Value) -> Option<String> {
    let object = body.as_object()?;
    AGGREGATE_KEYS
        .iter()
        .find_map(|key| object.get(*key).and_then(first_message))
}

/// Field-level message, then aggregate message. Unstructured bodies yield nothing.
pub fn extract_message(body: &Value) -> Option<String> {
    extract_field_error(body)
        .map(|(_, message)| message)
        .or_else(|| extract_aggregate_message(body))
}
