//! Unified error type for the Lapidar console.

use lapidar_dispatch::{DispatchError, StoreError};
use lapidar_protocol::{ProtocolError, ValidationError};
use lapidar_proxy::{ConfigError, ProxyError};
use lapidar_session::LoginError;
use lapidar_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `lapidar` crate, you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]` attribute
/// on each variant auto-generates `From` impls, so the `?` operator
/// converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum LapidarError {
    /// Building or using the HTTP client failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A body could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A value was refused before anything was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The backend call failed (unreachable, or answered non-2xx).
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The token store file could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A login step did not advance.
    #[error(transparent)]
    Login(#[from] LoginError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    /// The backend answered 2xx but reported the write as failed.
    #[error("backend did not confirm the change: {message}")]
    NotAcknowledged { message: String },
}

impl LapidarError {
    /// A short message fit for showing to the operator.
    pub fn user_message(&self) -> String {
        match self {
            Self::Dispatch(e) => e.user_message(),
            Self::NotAcknowledged { message } => message.clone(),
            other => other.to_string(),
        }
    }
}
