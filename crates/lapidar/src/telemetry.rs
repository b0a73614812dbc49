//! Logging setup for binaries built on the console core.
//!
//! Library code only emits `tracing` events; nothing is printed until a
//! binary installs a subscriber. Call [`init_tracing`] once at the top of
//! `main`.

use tracing_subscriber::EnvFilter;

/// Installs a formatting subscriber filtered by `RUST_LOG`, falling back
/// to `default_directive` (e.g. `"info"`) when the variable is unset or
/// unparsable.
///
/// Returns `false` if a global subscriber was already installed (tests
/// calling this more than once, for instance).
pub fn init_tracing(default_directive: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
