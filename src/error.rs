//! Unified client error model.
//! Every failure the request pipeline or the session manager can observe maps to one
//! `ClientError` variant, so callers can tell an expired session from a server-side
//! rejection or an unreachable host.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// A 401 could not be recovered by the one-shot refresh.
    #[error("Session expired")]
    SessionExpired,
    /// Non-success status other than a first-time 401. Body text is preserved verbatim.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    /// Transport-level failure (DNS, connection refused, TLS). Never retried.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn http(status: u16, body: impl Into<String>) -> Self { ClientError::Http { status, body: body.into() } }

    pub fn code_str(&self) -> &'static str {
        match self {
            ClientError::SessionExpired => "session_expired",
            ClientError::Http { .. } => "http_error",
            ClientError::Transport(_) => "transport_error",
            ClientError::Timeout => "timeout",
            ClientError::InvalidRequest(_) => "invalid_request",
            ClientError::Decode(_) => "decode_error",
        }
    }

    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::SessionExpired => Some(401),
            _ => None,
        }
    }

    /// True when the failure means the local session can no longer be trusted.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ClientError::SessionExpired | ClientError::Http { status: 401, .. })
    }

    /// Server-provided message from a JSON error body.
    pub fn server_message(&self) -> Option<String> {
        let ClientError::Http { body, .. } = self else { return None; };
        let v: serde_json::Value = serde_json::from_str(body).ok()?;
        message_field(&v)
    }
}

/// Keys the backend uses for human-readable messages, in lookup order.
pub const MESSAGE_KEYS: [&str; 3] = ["error", "message", "msg"];

/// First non-blank string under one of [`MESSAGE_KEYS`].
pub fn message_field(payload: &serde_json::Value) -> Option<String> {
    MESSAGE_KEYS
        .iter()
        .filter_map(|k| payload.get(*k).and_then(|m| m.as_str()))
        .find(|m| !m.trim().is_empty())
        .map(str::to_string)
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { return ClientError::Timeout; }
        if err.is_builder() { return ClientError::InvalidRequest(err.to_string()); }
        if err.is_decode() { return ClientError::Decode(err.to_string()); }
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self { ClientError::Decode(err.to_string()) }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
