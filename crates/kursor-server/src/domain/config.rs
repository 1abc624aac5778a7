//! Relay server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for all runtime settings.
//! `main.rs` assembles it in three layers (built-in defaults, then an optional
//! TOML file, then CLI flags and environment variables) and the result is
//! shared read-only by every component.
//!
//! Keeping configuration as a plain struct (no global state, no environment
//! reads in here) lets tests build a server with port `0` and millisecond
//! timers without touching the process environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default HTTP room-API port.
pub const DEFAULT_HTTP_PORT: u16 = 5000;
/// Default coordination-hub (WebSocket) port.
pub const DEFAULT_HUB_PORT: u16 = 5001;
/// Default UDP relay port.
pub const DEFAULT_UDP_PORT: u16 = 50000;

/// One STUN/TURN server handed to clients by `GET /api/ice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServer {
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credential: Option<String>,
}

/// All runtime configuration for the relay server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address every listener binds to.  `0.0.0.0` accepts all interfaces.
    pub bind_address: IpAddr,
    pub http_port: u16,
    pub udp_port: u16,
    pub hub_port: u16,

    /// UDP port reported to clients in room responses.
    ///
    /// Set this when the relay sits behind a port mapping; `None` reports the
    /// port the socket is actually bound to.
    pub advertised_udp_port: Option<u16>,

    /// Base URL used to build the `link` returned on room creation,
    /// e.g. `https://kursor.example.org`.
    pub public_base_url: Option<String>,

    /// A room that does not have both roles bound within this period after
    /// creation is evicted.
    pub room_grace_ttl: Duration,
    /// A room with no activity for this long is evicted.
    pub room_idle_ttl: Duration,
    /// How often the eviction sweep runs.
    pub sweep_interval: Duration,
    /// Target period of the hub coordinate dispatcher.
    pub dispatch_interval: Duration,

    /// Collect counters and latency samples for `GET /metrics`.
    pub metrics_enabled: bool,
    /// Serve the debug room listing at `GET /rooms`.
    pub expose_room_snapshot: bool,

    pub ice_servers: Vec<IceServer>,

    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl ServerConfig {
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.http_port)
    }

    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.udp_port)
    }

    pub fn hub_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.hub_port)
    }

    /// Join link for `room_id`, when a public base URL is configured.
    pub fn join_link(&self, room_id: &str) -> Option<String> {
        self.public_base_url
            .as_deref()
            .map(|base| format!("{}/join/{room_id}", base.trim_end_matches('/')))
    }
}

impl Default for ServerConfig {
    /// Returns a configuration suitable for local development.
    ///
    /// | Field              | Default          |
    /// |--------------------|------------------|
    /// | bind_address       | `0.0.0.0`        |
    /// | http_port          | `5000`           |
    /// | hub_port           | `5001`           |
    /// | udp_port           | `50000`          |
    /// | room_grace_ttl     | 5 minutes        |
    /// | room_idle_ttl      | 10 minutes       |
    /// | sweep_interval     | 30 seconds       |
    /// | dispatch_interval  | 16 ms (~60 Hz)   |
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            http_port: DEFAULT_HTTP_PORT,
            udp_port: DEFAULT_UDP_PORT,
            hub_port: DEFAULT_HUB_PORT,
            advertised_udp_port: None,
            public_base_url: None,
            room_grace_ttl: Duration::from_secs(300),
            room_idle_ttl: Duration::from_secs(600),
            sweep_interval: Duration::from_secs(30),
            dispatch_interval: Duration::from_millis(16),
            metrics_enabled: false,
            expose_room_snapshot: true,
            ice_servers: vec![IceServer {
                urls: vec!["stun:stun.l.google.com:19302".to_string()],
                username: None,
                credential: None,
            }],
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
