//! TOML configuration file for the relay server.
//!
//! The file is optional.  When `--config <path>` (or `KURSOR_CONFIG`) names a
//! file, its values replace the built-in defaults of
//! [`ServerConfig`](crate::domain::ServerConfig); CLI flags are applied on top
//! afterwards in `main.rs`.
//!
//! # Example file
//!
//! ```toml
//! [network]
//! bind_address = "0.0.0.0"
//! http_port = 5000
//! hub_port = 5001
//! udp_port = 50000
//! public_base_url = "https://kursor.example.org"
//!
//! [rooms]
//! grace_ttl_secs = 300
//! idle_ttl_secs = 600
//!
//! [server]
//! metrics_enabled = true
//! log_level = "debug"
//!
//! [[ice_servers]]
//! urls = ["stun:stun.l.google.com:19302"]
//! ```
//!
//! # Serde default values (for beginners)
//!
//! Every field carries `#[serde(default = "some_fn")]`, and every section is
//! `#[serde(default)]`.  A file that only sets `http_port` therefore parses
//! into a complete [`FileConfig`] whose other values equal the built-in
//! defaults, so a partial file never resets a setting the operator did not
//! mention.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{DEFAULT_HTTP_PORT, DEFAULT_HUB_PORT, DEFAULT_UDP_PORT};
use crate::domain::{IceServer, ServerConfig};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value parsed but makes no sense (e.g. a zero dispatch interval).
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub network: NetworkSection,
    #[serde(default)]
    pub rooms: RoomsSection,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default = "default_ice_servers")]
    pub ice_servers: Vec<IceServerEntry>,
}

/// Listener addresses and the values reported to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkSection {
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_hub_port")]
    pub hub_port: u16,
    #[serde(default = "default_udp_port")]
    pub udp_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub advertised_udp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
}

/// Room lifetime and dispatch timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomsSection {
    #[serde(default = "default_grace_ttl_secs")]
    pub grace_ttl_secs: u64,
    #[serde(default = "default_idle_ttl_secs")]
    pub idle_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_dispatch_interval_ms")]
    pub dispatch_interval_ms: u64,
}

/// Operational switches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default)]
    pub metrics_enabled: bool,
    #[serde(default = "default_true")]
    pub expose_room_snapshot: bool,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One `[[ice_servers]]` entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IceServerEntry {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}
fn default_hub_port() -> u16 {
    DEFAULT_HUB_PORT
}
fn default_udp_port() -> u16 {
    DEFAULT_UDP_PORT
}
fn default_grace_ttl_secs() -> u64 {
    300
}
fn default_idle_ttl_secs() -> u64 {
    600
}
fn default_sweep_interval_secs() -> u64 {
    30
}
fn default_dispatch_interval_ms() -> u64 {
    16
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_ice_servers() -> Vec<IceServerEntry> {
    ServerConfig::default()
        .ice_servers
        .into_iter()
        .map(IceServerEntry::from)
        .collect()
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            network: NetworkSection::default(),
            rooms: RoomsSection::default(),
            server: ServerSection::default(),
            ice_servers: default_ice_servers(),
        }
    }
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            http_port: default_http_port(),
            hub_port: default_hub_port(),
            udp_port: default_udp_port(),
            advertised_udp_port: None,
            public_base_url: None,
        }
    }
}

impl Default for RoomsSection {
    fn default() -> Self {
        Self {
            grace_ttl_secs: default_grace_ttl_secs(),
            idle_ttl_secs: default_idle_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            dispatch_interval_ms: default_dispatch_interval_ms(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            expose_room_snapshot: default_true(),
            log_level: default_log_level(),
        }
    }
}

impl From<IceServer> for IceServerEntry {
    fn from(server: IceServer) -> Self {
        Self {
            urls: server.urls,
            username: server.username,
            credential: server.credential,
        }
    }
}

impl From<IceServerEntry> for IceServer {
    fn from(entry: IceServerEntry) -> Self {
        Self {
            urls: entry.urls,
            username: entry.username,
            credential: entry.credential,
        }
    }
}

// ── Conversion ────────────────────────────────────────────────────────────────

impl FileConfig {
    /// Converts the file layout into a [`ServerConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for zero-length timers, which would
    /// make the sweep or dispatcher spin.
    pub fn into_server_config(self) -> Result<ServerConfig, ConfigError> {
        if self.rooms.dispatch_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "rooms.dispatch_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.rooms.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "rooms.sweep_interval_secs",
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(ServerConfig {
            bind_address: self.network.bind_address,
            http_port: self.network.http_port,
            udp_port: self.network.udp_port,
            hub_port: self.network.hub_port,
            advertised_udp_port: self.network.advertised_udp_port,
            public_base_url: self.network.public_base_url,
            room_grace_ttl: Duration::from_secs(self.rooms.grace_ttl_secs),
            room_idle_ttl: Duration::from_secs(self.rooms.idle_ttl_secs),
            sweep_interval: Duration::from_secs(self.rooms.sweep_interval_secs),
            dispatch_interval: Duration::from_millis(self.rooms.dispatch_interval_ms),
            metrics_enabled: self.server.metrics_enabled,
            expose_room_snapshot: self.server.expose_room_snapshot,
            ice_servers: self.ice_servers.into_iter().map(IceServer::from).collect(),
            log_level: self.server.log_level,
        })
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads [`FileConfig`] from `path`, returning the defaults if the file does
/// not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_empty_file_matches_built_in_defaults() {
        // Arrange / Act
        let file: FileConfig = toml::from_str("").expect("empty TOML");
        let cfg = file.into_server_config().expect("valid");
        let builtin = ServerConfig::default();

        // Assert
        assert_eq!(cfg.http_port, builtin.http_port);
        assert_eq!(cfg.udp_port, builtin.udp_port);
        assert_eq!(cfg.hub_port, builtin.hub_port);
        assert_eq!(cfg.room_grace_ttl, builtin.room_grace_ttl);
        assert_eq!(cfg.room_idle_ttl, builtin.room_idle_ttl);
        assert_eq!(cfg.dispatch_interval, builtin.dispatch_interval);
        assert_eq!(cfg.ice_servers, builtin.ice_servers);
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.expose_room_snapshot);
        assert!(!cfg.metrics_enabled);
    }

    #[test]
    fn test_default_equals_empty_file() {
        let parsed: FileConfig = toml::from_str("").unwrap();
        assert_eq!(parsed, FileConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        // Arrange
        let toml_str = r#"
[network]
http_port = 8080
public_base_url = "https://kursor.example.org/"

[rooms]
idle_ttl_secs = 60
"#;

        // Act
        let cfg = toml::from_str::<FileConfig>(toml_str)
            .unwrap()
            .into_server_config()
            .unwrap();

        // Assert
        assert_eq!(cfg.http_port, 8080);
        assert_eq!(cfg.hub_port, DEFAULT_HUB_PORT);
        assert_eq!(cfg.room_idle_ttl, Duration::from_secs(60));
        assert_eq!(cfg.room_grace_ttl, Duration::from_secs(300));
        assert_eq!(
            cfg.join_link("abc123").as_deref(),
            Some("https://kursor.example.org/join/abc123")
        );
    }

    #[test]
    fn test_ice_server_list_replaces_default() {
        let toml_str = r#"
[[ice_servers]]
urls = ["turn:turn.example.org:3478"]
username = "u"
credential = "p"
"#;
        let cfg = toml::from_str::<FileConfig>(toml_str)
            .unwrap()
            .into_server_config()
            .unwrap();

        assert_eq!(cfg.ice_servers.len(), 1);
        assert_eq!(cfg.ice_servers[0].urls, vec!["turn:turn.example.org:3478"]);
        assert_eq!(cfg.ice_servers[0].username.as_deref(), Some("u"));
    }

    #[test]
    fn test_zero_dispatch_interval_is_rejected() {
        let file: FileConfig = toml::from_str("[rooms]\ndispatch_interval_ms = 0").unwrap();
        assert!(matches!(
            file.into_server_config(),
            Err(ConfigError::Invalid { field: "rooms.dispatch_interval_ms", .. })
        ));
    }

    #[test]
    fn test_invalid_bind_address_is_parse_error() {
        let result = toml::from_str::<FileConfig>("[network]\nbind_address = \"not-an-ip\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_file_config_round_trips_through_toml() {
        // Arrange
        let mut file = FileConfig::default();
        file.network.udp_port = 40000;
        file.network.advertised_udp_port = Some(41000);
        file.server.log_level = "debug".to_string();

        // Act
        let text = toml::to_string_pretty(&file).expect("serialize");
        let restored: FileConfig = toml::from_str(&text).expect("deserialize");

        // Assert
        assert_eq!(file, restored);
    }

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/kursor.toml");
        let loaded = load_config(&path).expect("absent file is not an error");
        assert_eq!(loaded, FileConfig::default());
    }

    #[test]
    fn test_load_config_reads_file_from_disk() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("kursor_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kursor.toml");
        std::fs::write(&path, "[server]\nmetrics_enabled = true\n").unwrap();

        // Act
        let loaded = load_config(&path).unwrap();

        // Assert
        assert!(loaded.server.metrics_enabled);

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_reports_malformed_toml() {
        let dir = std::env::temp_dir().join(format!("kursor_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("kursor.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }
}
