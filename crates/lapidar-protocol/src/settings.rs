//! The bot configuration object and its port rules.
//!
//! `GET /config` and `POST /save-config` move a whole [`BotConfig`]. The
//! console only understands a handful of its fields; everything else is
//! carried through untouched in [`BotConfig::extra`] so saving never drops
//! settings edited elsewhere.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ValidationError;

/// Primary backend port when nothing else is configured.
pub const DEFAULT_PRIMARY_PORT: u16 = 8080;

/// Alternate backend ports when nothing else is configured.
pub const DEFAULT_ALT_PORTS: [u16; 2] = [8000, 8081];

/// Host the backend listens on when nothing else is configured.
pub const DEFAULT_HOST: &str = "localhost";

// ---------------------------------------------------------------------------
// BotConfig
// ---------------------------------------------------------------------------

/// Bot configuration as exchanged with the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BotConfig {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub bot_name: String,
    #[serde(default)]
    pub default_language: String,
    #[serde(default)]
    pub web_interface: WebInterface,

    /// Fields this console doesn't model, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// WebInterface
// ---------------------------------------------------------------------------

/// Where the backend listens: one primary port plus alternates.
///
/// Invariants (checked by [`validate`](Self::validate) and maintained by
/// [`add_alt_port`](Self::add_alt_port)):
/// - every port is in 1..=65535 (`u16` already rules out the top end,
///   so 0 is the only value to reject);
/// - no alternate appears twice;
/// - no alternate equals the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WebInterface {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub alt_ports: Vec<u16>,
}

impl Default for WebInterface {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PRIMARY_PORT,
            alt_ports: DEFAULT_ALT_PORTS.to_vec(),
        }
    }
}

impl WebInterface {
    /// Validates `port` against the current section and appends it.
    ///
    /// Takes a `u32` so out-of-range input (e.g. `70000` typed by a user)
    /// can be reported instead of silently truncated.
    ///
    /// # Errors
    /// - [`ValidationError::PortOutOfRange`]: not in 1..=65535
    /// - [`ValidationError::AlternateIsPrimary`]: equals the primary
    /// - [`ValidationError::DuplicateAlternate`]: already listed
    pub fn add_alt_port(&mut self, port: u32) -> Result<u16, ValidationError> {
        let port = check_range(port)?;
        if port == self.port {
            return Err(ValidationError::AlternateIsPrimary(port));
        }
        if self.alt_ports.contains(&port) {
            return Err(ValidationError::DuplicateAlternate(port));
        }
        self.alt_ports.push(port);
        Ok(port)
    }

    /// Removes `port` from the alternates. Returns `false` if it wasn't
    /// there.
    pub fn remove_alt_port(&mut self, port: u16) -> bool {
        let before = self.alt_ports.len();
        self.alt_ports.retain(|p| *p != port);
        self.alt_ports.len() != before
    }

    /// Checks the whole section.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_ports(self.port, &self.alt_ports)
    }
}

/// Checks a primary port and its alternate list.
pub fn validate_ports(primary: u16, alternates: &[u16]) -> Result<(), ValidationError> {
    check_range(u32::from(primary))?;
    for (i, &port) in alternates.iter().enumerate() {
        check_range(u32::from(port))?;
        if port == primary {
            return Err(ValidationError::AlternateIsPrimary(port));
        }
        if alternates[..i].contains(&port) {
            return Err(ValidationError::DuplicateAlternate(port));
        }
    }
    Ok(())
}

/// Parses a single port from text.
pub fn parse_port(raw: &str) -> Result<u16, ValidationError> {
    let trimmed = raw.trim();
    let value: u32 = trimmed
        .parse()
        .map_err(|_| ValidationError::NotANumber(trimmed.to_string()))?;
    check_range(value)
}

/// Parses a comma-separated port list such as `"8000, 8081"`.
///
/// Empty items are skipped, so `""` is an empty list. Only the syntax and
/// range are checked here; duplicates are [`validate_ports`]'s job because
/// they depend on the primary.
pub fn parse_port_list(raw: &str) -> Result<Vec<u16>, ValidationError> {
    raw.split(',')
        .filter(|item| !item.trim().is_empty())
        .map(parse_port)
        .collect()
}

fn check_range(port: u32) -> Result<u16, ValidationError> {
    match u16::try_from(port) {
        Ok(p) if p != 0 => Ok(p),
        _ => Err(ValidationError::PortOutOfRange(port)),
    }
}

fn default_enabled() -> bool {
    true
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PRIMARY_PORT
}
