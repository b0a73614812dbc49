//! `lapidar-proxy`: serves the console's `/api` with backend port failover.
//!
//! Configuration comes from `API_PORT`, `API_ALT_PORTS`, `API_HOST`,
//! `PROXY_LISTEN` and the bot's `config.json` (see [`ProxyConfig`]).
//! Log verbosity follows `RUST_LOG` (default `info`).

use lapidar_proxy::{FrontDoor, ProxyConfig, ProxyError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = match ProxyConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid proxy configuration");
            return Err(e.into());
        }
    };

    tracing::info!(
        listen = %config.listen,
        host = %config.host,
        primary = config.primary_port,
        alternates = ?config.alt_ports,
        "starting front door"
    );

    FrontDoor::bind(&config).await?.run().await
}
