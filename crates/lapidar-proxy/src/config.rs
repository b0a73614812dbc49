//! Front-door configuration, resolved field by field from three layers:
//!
//! 1. environment variables (`API_PORT`, `API_ALT_PORTS`, `API_HOST`,
//!    `PROXY_LISTEN`);
//! 2. the bot configuration file (`config.json`, or the path in
//!    `LAPIDAR_CONFIG`), `WebInterface` section;
//! 3. built-in defaults.
//!
//! A missing file just skips layer 2. A file that exists but can't be
//! read or parsed is an error: silently falling back to defaults would
//! route traffic to ports nobody configured.

use std::collections::HashMap;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use lapidar_protocol::{
    BotConfig, DEFAULT_ALT_PORTS, DEFAULT_HOST, DEFAULT_PRIMARY_PORT, WebInterface, parse_port,
    parse_port_list, validate_ports,
};

use crate::ConfigError;
use crate::failover::CandidateList;

/// Port the front door listens on when `PROXY_LISTEN` is unset.
pub const DEFAULT_LISTEN_PORT: u16 = 3000;

/// Path prefix that is forwarded to the backend.
pub const DEFAULT_API_PREFIX: &str = "/api";

/// Configuration file read when `LAPIDAR_CONFIG` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

pub const ENV_API_PORT: &str = "API_PORT";
pub const ENV_ALT_PORTS: &str = "API_ALT_PORTS";
pub const ENV_API_HOST: &str = "API_HOST";
pub const ENV_LISTEN: &str = "PROXY_LISTEN";
pub const ENV_CONFIG_PATH: &str = "LAPIDAR_CONFIG";

// ---------------------------------------------------------------------------
// ProxyConfig
// ---------------------------------------------------------------------------

/// Everything the front door needs to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Where the front door accepts connections.
    pub listen: SocketAddr,
    /// Requests under this path prefix are forwarded; anything else is 404.
    pub api_prefix: String,
    /// Backend host shared by all candidates.
    pub host: String,
    pub primary_port: u16,
    pub alt_ports: Vec<u16>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_LISTEN_PORT)),
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            host: DEFAULT_HOST.to_string(),
            primary_port: DEFAULT_PRIMARY_PORT,
            alt_ports: DEFAULT_ALT_PORTS.to_vec(),
        }
    }
}

impl ProxyConfig {
    /// Resolves the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::resolve(&EnvLayer::from_process())
    }

    /// Resolves the configuration from an explicit environment layer.
    ///
    /// The file layer is read from `env`'s config path (or
    /// [`DEFAULT_CONFIG_FILE`]).
    pub fn resolve(env: &EnvLayer) -> Result<Self, ConfigError> {
        let path = env
            .get(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        let file = read_web_interface(&path)?;
        Self::from_layers(env, file.as_ref())
    }

    /// Merges the layers: `env` beats `file` beats the defaults, per field.
    pub fn from_layers(env: &EnvLayer, file: Option<&WebInterface>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let listen = match env.get(ENV_LISTEN) {
            Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Listen {
                value: raw.to_string(),
            })?,
            None => defaults.listen,
        };

        let host = env
            .get(ENV_API_HOST)
            .map(|h| h.trim().to_string())
            .filter(|h| !h.is_empty())
            .or_else(|| file.map(|w| w.host.clone()).filter(|h| !h.is_empty()))
            .unwrap_or(defaults.host);

        let primary_port = match env.get(ENV_API_PORT) {
            Some(raw) => parse_port(raw).map_err(|source| ConfigError::Env {
                var: ENV_API_PORT,
                source,
            })?,
            None => file.map_or(defaults.primary_port, |w| w.port),
        };

        let alt_ports = match env.get(ENV_ALT_PORTS) {
            Some(raw) => parse_port_list(raw).map_err(|source| ConfigError::Env {
                var: ENV_ALT_PORTS,
                source,
            })?,
            None => file.map_or(defaults.alt_ports, |w| w.alt_ports.clone()),
        };

        validate_ports(primary_port, &alt_ports).map_err(ConfigError::Ports)?;

        Ok(Self {
            listen,
            api_prefix: defaults.api_prefix,
            host,
            primary_port,
            alt_ports,
        })
    }

    /// The failover candidates this configuration describes.
    pub fn candidates(&self) -> CandidateList {
        CandidateList::on_host(&self.host, self.primary_port, &self.alt_ports)
    }
}

// ---------------------------------------------------------------------------
// EnvLayer
// ---------------------------------------------------------------------------

/// The environment-variable layer, captured once.
///
/// Tests build one with [`EnvLayer::from_pairs`] instead of mutating the
/// process environment.
#[derive(Debug, Clone, Default)]
pub struct EnvLayer {
    vars: HashMap<String, String>,
}

impl EnvLayer {
    /// Captures the variables this module cares about.
    pub fn from_process() -> Self {
        Self::from_pairs(
            [
                ENV_API_PORT,
                ENV_ALT_PORTS,
                ENV_API_HOST,
                ENV_LISTEN,
                ENV_CONFIG_PATH,
            ]
            .into_iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name, value))),
        )
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The variable's value; set-but-blank counts as unset.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Reads the `WebInterface` section of a bot configuration file.
///
/// `Ok(None)` when the file doesn't exist.
pub fn read_web_interface(path: &Path) -> Result<Option<WebInterface>, ConfigError> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no configuration file, using env and defaults");
            return Ok(None);
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config: BotConfig = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "configuration file loaded");
    Ok(Some(config.web_interface))
}

#[cfg(test)]
mod tests {
    use lapidar_protocol::ValidationError;

    use super::*;

    fn file_section(port: u16, alt_ports: &[u16]) -> WebInterface {
        WebInterface {
            enabled: true,
            host: "127.0.0.1".into(),
            port,
            alt_ports: alt_ports.to_vec(),
        }
    }

    #[test]
    fn test_from_layers_nothing_set_uses_defaults() {
        let config = ProxyConfig::from_layers(&EnvLayer::default(), None).unwrap();
        assert_eq!(config, ProxyConfig::default());
        assert_eq!(config.listen.port(), 3000);
        assert_eq!(config.primary_port, 8080);
        assert_eq!(config.alt_ports, vec![8000, 8081]);
    }

    #[test]
    fn test_from_layers_file_beats_defaults() {
        let file = file_section(9090, &[9091]);
        let config = ProxyConfig::from_layers(&EnvLayer::default(), Some(&file)).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.primary_port, 9090);
        assert_eq!(config.alt_ports, vec![9091]);
    }

    #[test]
    fn test_from_layers_env_beats_file_per_field() {
        let file = file_section(9090, &[9091]);
        let env = EnvLayer::from_pairs([(ENV_API_PORT, "7070")]);
        let config = ProxyConfig::from_layers(&env, Some(&file)).unwrap();
        assert_eq!(config.primary_port, 7070, "from env");
        assert_eq!(config.alt_ports, vec![9091], "from file");
        assert_eq!(config.host, "127.0.0.1", "from file");
    }

    #[test]
    fn test_from_layers_alt_ports_env_is_comma_separated() {
        let env = EnvLayer::from_pairs([(ENV_ALT_PORTS, "8001, 8002,8003")]);
        let config = ProxyConfig::from_layers(&env, None).unwrap();
        assert_eq!(config.alt_ports, vec![8001, 8002, 8003]);
    }

    #[test]
    fn test_from_layers_empty_alt_ports_env_falls_through() {
        let env = EnvLayer::from_pairs([(ENV_ALT_PORTS, "  ")]);
        let config = ProxyConfig::from_layers(&env, None).unwrap();
        assert_eq!(config.alt_ports, vec![8000, 8081]);
    }

    #[test]
    fn test_from_layers_bad_env_port_names_the_variable() {
        let env = EnvLayer::from_pairs([(ENV_API_PORT, "70000")]);
        let err = ProxyConfig::from_layers(&env, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Env {
                var: "API_PORT",
                source: ValidationError::PortOutOfRange(70000)
            }
        ));
        assert!(err.to_string().starts_with("API_PORT"));
    }

    #[test]
    fn test_from_layers_alternate_equal_to_primary_is_rejected() {
        let env = EnvLayer::from_pairs([(ENV_API_PORT, "8000")]);
        let err = ProxyConfig::from_layers(&env, None).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Ports(ValidationError::AlternateIsPrimary(8000))
        ));
    }

    #[test]
    fn test_from_layers_bad_listen_is_rejected() {
        let env = EnvLayer::from_pairs([(ENV_LISTEN, "localhost")]);
        assert!(matches!(
            ProxyConfig::from_layers(&env, None),
            Err(ConfigError::Listen { .. })
        ));
    }

    #[test]
    fn test_resolve_reads_file_from_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.json");
        fs::write(
            &path,
            r#"{"Prefix":"!","WebInterface":{"Enabled":true,"Host":"localhost","Port":8085,"AltPorts":[8086]}}"#,
        )
        .unwrap();
        let env = EnvLayer::from_pairs([(ENV_CONFIG_PATH, path.to_string_lossy().into_owned())]);

        let config = ProxyConfig::resolve(&env).unwrap();

        assert_eq!(config.primary_port, 8085);
        assert_eq!(config.alt_ports, vec![8086]);
    }

    #[test]
    fn test_resolve_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let env = EnvLayer::from_pairs([(ENV_CONFIG_PATH, path.to_string_lossy().into_owned())]);

        assert_eq!(ProxyConfig::resolve(&env).unwrap(), ProxyConfig::default());
    }

    #[test]
    fn test_resolve_malformed_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.json");
        fs::write(&path, "{not json").unwrap();
        let env = EnvLayer::from_pairs([(ENV_CONFIG_PATH, path.to_string_lossy().into_owned())]);

        assert!(matches!(
            ProxyConfig::resolve(&env),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_candidates_share_host() {
        let config = ProxyConfig::default();
        let candidates = config.candidates();
        assert_eq!(candidates.primary().to_string(), "localhost:8080");
        assert_eq!(candidates.alternates().len(), 2);
        assert_eq!(candidates.len(), 3);
    }
}
