//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::service::ServiceBlock;
use super::uplink::UplinkBlock;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Services configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Local server identity.
    pub server: ServerConfig,
    /// The single uplink this daemon links to.
    pub uplink: UplinkBlock,
    /// Wire dialect selection.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Pseudo-clients introduced on link.
    #[serde(default, rename = "service")]
    pub services: Vec<ServiceBlock>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Local server identity.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "services.straylight.net").
    pub name: String,
    /// Server description shown in LINKS.
    pub description: String,
    /// Server ID for TS6 (3 characters).
    #[serde(default)]
    pub sid: Option<String>,
    /// Server numeric for P10 (1-2 base64 characters).
    #[serde(default)]
    pub numeric: Option<String>,
    /// Ask the uplink to hide this server from LINKS.
    #[serde(default)]
    pub hidden: bool,
}

/// Which server-to-server dialect to speak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// TS6 (charybdis, solanum and relatives).
    #[default]
    Ts6,
    /// P10 (nefarious, ircu).
    P10,
}

impl DialectKind {
    /// Config spelling of the dialect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ts6 => "ts6",
            Self::P10 => "p10",
        }
    }
}

/// Wire protocol settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProtocolConfig {
    /// Dialect selected at startup.
    #[serde(default)]
    pub dialect: DialectKind,
    /// Longest accepted line, terminator included (default: 512).
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            dialect: DialectKind::default(),
            max_line_len: default_max_line_len(),
        }
    }
}

fn default_max_line_len() -> usize {
    slirc_link::DEFAULT_MAX_LINE_LEN
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Output format.
    #[serde(default)]
    pub format: LogFormat,
    /// Default filter directive when `RUST_LOG` is unset (default: "info").
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[server]
name = "services.test"
description = "Test Services"
sid = "0SV"

[uplink]
name = "hub.test"
hostname = "127.0.0.1"
port = 6667
send_password = "linkpass"
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml(MINIMAL).unwrap();
        assert_eq!(config.server.name, "services.test");
        assert_eq!(config.protocol.dialect, DialectKind::Ts6);
        assert_eq!(config.protocol.max_line_len, 512);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.logging.filter, "info");
        assert!(config.services.is_empty());
        assert!(!config.server.hidden);
    }

    #[test]
    fn test_full_config_parses() {
        let text = r##"
[server]
name = "services.test"
description = "Test Services"
numeric = "AS"
hidden = true

[uplink]
name = "hub.test"
hostname = "hub.example.net"
port = 4400
send_password = "out"
receive_password = "in"
ping_interval = 15
ping_timeout = 45

[protocol]
dialect = "p10"
max_line_len = 1024

[logging]
format = "json"
filter = "slirc_services=debug"

[[service]]
nick = "NickServ"
user = "NickServ"
host = "services.test"
gecos = "Nickname Services"

[[service]]
nick = "ChanServ"
user = "ChanServ"
host = "services.test"
gecos = "Channel Services"
channels = ["#services"]
"##;
        let config = Config::from_toml(text).unwrap();
        assert_eq!(config.protocol.dialect, DialectKind::P10);
        assert_eq!(config.protocol.max_line_len, 1024);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.numeric.as_deref(), Some("AS"));
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[1].channels, vec!["#services"]);
        assert_eq!(config.uplink.receive_password(), "in");
        assert_eq!(config.uplink.ping_timeout, 45);
    }

    #[test]
    fn test_unknown_dialect_is_a_parse_error() {
        let text = format!("{MINIMAL}\n[protocol]\ndialect = \"unreal\"\n");
        assert!(matches!(
            Config::from_toml(&text),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("services.toml");
        std::fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.uplink.name, "hub.test");

        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::load(missing), Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_shipped_sample_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/services.toml");
        let config = Config::load(path).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.services.len(), 3);
    }
}
