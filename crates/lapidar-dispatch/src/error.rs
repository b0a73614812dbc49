//! Error types for the dispatch layer.

use std::path::PathBuf;

use http::StatusCode;
use lapidar_protocol::ProtocolError;
use lapidar_transport::TransportError;

/// Errors from reading or persisting the token store file.
///
/// The in-memory values are always updated first, so a `StoreError` means
/// "this change won't survive a restart", never "this change didn't
/// happen".
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing, or renaming the store file failed.
    #[error("token store i/o failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but isn't the JSON we wrote.
    #[error("token store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// A failed dispatch, normalized so every call site can show a message.
///
/// Two families matter to callers:
/// - transport failures (`Transport`): nothing came back, not even after
///   the proxy tried every endpoint;
/// - application failures (`Unauthorized`, `Forbidden`, `Status`): the
///   backend answered and said no. These are never retried here.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No response was received.
    #[error("backend unreachable: {0}")]
    Transport(#[from] TransportError),

    /// 401: missing, invalid, or expired session credential.
    #[error("unauthorized: {}", or_reason(.message, StatusCode::UNAUTHORIZED))]
    Unauthorized { message: Option<String> },

    /// 403: typically a stale or missing anti-forgery token.
    #[error("request rejected: {}", or_reason(.message, StatusCode::FORBIDDEN))]
    Forbidden { message: Option<String> },

    /// Any other non-2xx status.
    #[error("backend returned {status}: {}", or_reason(.message, *.status))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    /// The body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl DispatchError {
    /// Builds the application-level error for a non-2xx response.
    ///
    /// The message is the backend's `{"message": ...}` field if the body is
    /// JSON, otherwise the body text (the backend's plain-text errors).
    /// `None` when the body explains nothing.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = extract_message(body);
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized { message },
            StatusCode::FORBIDDEN => Self::Forbidden { message },
            _ => Self::Status { status, message },
        }
    }

    /// Returns `true` when no response was received.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The HTTP status of an application failure.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Forbidden { .. } => Some(StatusCode::FORBIDDEN),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// What the backend itself said, if it said anything.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized { message }
            | Self::Forbidden { message }
            | Self::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// A short message fit for showing to the operator.
    ///
    /// Application failures show the backend's own words, or the status
    /// reason phrase when it sent none; everything else shows the error's
    /// `Display`.
    pub fn user_message(&self) -> String {
        match (self.status(), self.backend_message()) {
            (Some(_), Some(message)) => message.to_string(),
            (Some(status), None) => or_reason(&None, status).to_string(),
            (None, _) => self.to_string(),
        }
    }
}

fn or_reason(message: &Option<String>, status: StatusCode) -> &str {
    match message {
        Some(message) => message,
        None => status.canonical_reason().unwrap_or("request failed"),
    }
}

fn extract_message(body: &[u8]) -> Option<String> {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice(body) {
        return match map.get("message") {
            Some(serde_json::Value::String(message)) if !message.trim().is_empty() => {
                Some(message.trim().to_string())
            }
            _ => None,
        };
    }
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() || text.starts_with('{') {
        return None;
    }
    Some(text.to_string())
}
