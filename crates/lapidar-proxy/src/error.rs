//! Error types for the proxy front door.

use std::net::SocketAddr;
use std::path::PathBuf;

use lapidar_protocol::ValidationError;
use lapidar_transport::TransportError;

/// The proxy configuration could not be resolved.
///
/// Every variant names the layer that supplied the bad value, so a startup
/// failure points straight at the env var or file to fix.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An environment variable holds something that isn't a valid value.
    #[error("{var}: {source}")]
    Env {
        var: &'static str,
        #[source]
        source: ValidationError,
    },

    /// `PROXY_LISTEN` isn't a socket address.
    #[error("PROXY_LISTEN: '{value}' is not a socket address")]
    Listen { value: String },

    /// The configuration file exists but couldn't be read.
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file isn't a valid bot configuration.
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The resolved candidate list breaks the port rules.
    #[error("invalid backend ports: {0}")]
    Ports(#[source] ValidationError),
}

/// Errors that stop the front door.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The upstream client couldn't be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The listening socket couldn't be opened.
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
