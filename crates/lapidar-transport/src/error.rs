/// Errors that can occur in the transport layer.
///
/// Only [`TransportError::Connect`] means "nobody answered at that
/// address". The proxy failover manager keys off that distinction: a
/// refused connection is worth retrying elsewhere, a timeout or a broken
/// body is not.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection could not be established (refused, unreachable).
    #[error("cannot connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// The request was sent but no response arrived in time.
    #[error("request to {target} timed out")]
    Timeout { target: String },

    /// The request failed after the connection was established.
    #[error("request to {target} failed: {reason}")]
    Request { target: String, reason: String },

    /// The configured base URL is unusable.
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),

    /// The underlying HTTP client could not be built.
    #[error("http client setup failed: {0}")]
    Setup(String),

    /// Every candidate endpoint refused the connection.
    #[error("all {attempts} backend endpoints are unreachable (last error: {last})")]
    Exhausted {
        attempts: usize,
        last: Box<TransportError>,
    },
}

impl TransportError {
    /// Returns `true` for connection-level failures (refused/unreachable).
    pub fn is_connect(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_connect_only_for_connect_variant() {
        let refused = TransportError::Connect {
            target: "localhost:8080".into(),
            reason: "connection refused".into(),
        };
        let timeout = TransportError::Timeout {
            target: "localhost:8080".into(),
        };
        assert!(refused.is_connect());
        assert!(!timeout.is_connect());
    }

    #[test]
    fn test_exhausted_display_mentions_last_error() {
        let err = TransportError::Exhausted {
            attempts: 3,
            last: Box::new(TransportError::Connect {
                target: "localhost:8000".into(),
                reason: "connection refused".into(),
            }),
        };
        let text = err.to_string();
        assert!(text.contains("all 3 backend endpoints"));
        assert!(text.contains("localhost:8000"));
        assert!(!err.is_connect(), "terminal error is not retryable");
    }
}
