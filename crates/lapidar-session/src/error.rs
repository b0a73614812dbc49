//! Error types for the login flow.

use lapidar_dispatch::DispatchError;

/// Message shown when the backend rejects the credentials without saying
/// why.
pub const DEFAULT_LOGIN_FAILED: &str = "Ошибка входа";

/// Message shown when the backend rejects the one-time code without saying
/// why.
pub const DEFAULT_INVALID_CODE: &str = "Неверный код";

/// Prefix for failures where the backend never answered properly.
pub const SERVER_ERROR_PREFIX: &str = "Ошибка сервера: ";

/// Why the last login step did not advance.
///
/// The `Display` output is the text meant for the operator, so a UI can
/// show `error.to_string()` as-is.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoginError {
    /// The backend answered and refused: wrong password, wrong code,
    /// expired temporary token. The message is the backend's own (or a
    /// default when it sent none).
    #[error("{message}")]
    Rejected { message: String },

    /// No usable answer: the backend could not be reached, or the reply
    /// could not be understood.
    #[error("{prefix}{detail}", prefix = SERVER_ERROR_PREFIX)]
    Unreachable { detail: String },
}

impl LoginError {
    pub(crate) fn rejected(message: Option<&str>, fallback: &str) -> Self {
        Self::Rejected {
            message: message.unwrap_or(fallback).to_string(),
        }
    }

    /// Sorts a dispatch failure into "backend said no" or "no answer".
    ///
    /// A refusal without a message of its own shows `fallback`, the same
    /// text a `200 {"success": false}` would.
    pub(crate) fn from_dispatch(err: &DispatchError, fallback: &str) -> Self {
        match err {
            DispatchError::Unauthorized { .. }
            | DispatchError::Forbidden { .. }
            | DispatchError::Status { .. } => Self::rejected(err.backend_message(), fallback),
            DispatchError::Transport(_) | DispatchError::Protocol(_) => Self::Unreachable {
                detail: err.to_string(),
            },
        }
    }

    /// Returns `true` if the backend was never reached.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use lapidar_transport::TransportError;

    use super::*;

    #[test]
    fn test_from_dispatch_unauthorized_keeps_backend_message() {
        let err = DispatchError::from_response(
            StatusCode::UNAUTHORIZED,
            r#"{"success":false,"message":"Неверный email или пароль"}"#.as_bytes(),
        );
        let login = LoginError::from_dispatch(&err, DEFAULT_LOGIN_FAILED);
        assert_eq!(login.to_string(), "Неверный email или пароль");
        assert!(!login.is_unreachable());
    }

    #[test]
    fn test_from_dispatch_transport_is_server_error() {
        let err = DispatchError::Transport(TransportError::Connect {
            target: "http://localhost:3000/api/login".into(),
            reason: "connection refused".into(),
        });
        let login = LoginError::from_dispatch(&err, DEFAULT_LOGIN_FAILED);
        assert!(login.is_unreachable());
        assert!(login.to_string().starts_with(SERVER_ERROR_PREFIX));
    }

    #[test]
    fn test_from_dispatch_status_without_message_uses_fallback() {
        let err = DispatchError::from_response(StatusCode::UNAUTHORIZED, br#"{"success":false}"#);
        let login = LoginError::from_dispatch(&err, DEFAULT_INVALID_CODE);
        assert_eq!(
            login,
            LoginError::Rejected {
                message: DEFAULT_INVALID_CODE.to_string()
            }
        );
    }

    #[test]
    fn test_rejected_without_message_uses_fallback() {
        let login = LoginError::rejected(None, DEFAULT_INVALID_CODE);
        assert_eq!(login.to_string(), "Неверный код");
    }
}
