//! Failover front door for the Lapidar bot backend.
//!
//! The console never talks to the backend directly. It talks to this
//! front door, which forwards everything under `/api` to whichever backend
//! port currently answers:
//!
//! - **Configuration** ([`ProxyConfig`]): listen address, backend host,
//!   primary port and alternates, from env, the bot config file, or
//!   defaults
//! - **Failover** ([`FailoverManager`]): the ring of candidate endpoints
//!   and the retry walk over it
//! - **Server** ([`FrontDoor`]): the HTTP/1 listener in front of it all
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use lapidar_proxy::{FrontDoor, ProxyConfig};
//!
//! # async fn run() -> Result<(), lapidar_proxy::ProxyError> {
//! let config = ProxyConfig::from_env()?;
//! FrontDoor::bind(&config).await?.run().await
//! # }
//! ```

mod config;
mod error;
mod failover;
mod server;

pub use config::{
    DEFAULT_API_PREFIX, DEFAULT_CONFIG_FILE, DEFAULT_LISTEN_PORT, ENV_ALT_PORTS, ENV_API_HOST,
    ENV_API_PORT, ENV_CONFIG_PATH, ENV_LISTEN, EnvLayer, ProxyConfig, read_web_interface,
};
pub use error::{ConfigError, ProxyError};
pub use failover::{
    CandidateList, Endpoint, FailoverManager, FailoverState, HttpUpstream, Target, Upstream,
};
pub use server::FrontDoor;
