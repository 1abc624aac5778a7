//! Kursor relay server entry point.
//!
//! Runs the room API, the UDP datagram relay and the WebSocket coordination
//! hub in one process.
//!
//! # Usage
//!
//! ```text
//! kursor-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML configuration file
//!   --bind <IP>                  Address for all listeners [default: 0.0.0.0]
//!   --http-port <PORT>           Room API port [default: 5000]
//!   --hub-port <PORT>            WebSocket hub port [default: 5001]
//!   --udp-port <PORT>            UDP relay port [default: 50000]
//!   --advertised-udp-port <PORT> UDP port reported to clients
//!   --public-base-url <URL>      Base of the join link returned on room creation
//!   --room-grace-ttl <SECS>      Eviction delay for rooms never fully joined
//!   --room-idle-ttl <SECS>       Eviction delay for inactive rooms
//!   --dispatch-interval-ms <MS>  Hub coordinate dispatch period
//!   --metrics                    Collect counters for GET /metrics
//!   --no-room-snapshot           Disable GET /rooms
//!   --log-level <LEVEL>          Log filter when RUST_LOG is unset
//! ```
//!
//! # Configuration layers
//!
//! Settings are resolved in three layers, later layers winning:
//!
//! 1. Built-in defaults ([`ServerConfig::default`]).
//! 2. The TOML file named by `--config` / `KURSOR_CONFIG`, if any.
//! 3. CLI flags, or their environment variables when the flag is absent.
//!
//! | Variable                      | Flag                     |
//! |-------------------------------|--------------------------|
//! | `KURSOR_CONFIG`               | `--config`               |
//! | `KURSOR_BIND`                 | `--bind`                 |
//! | `KURSOR_HTTP_PORT`            | `--http-port`            |
//! | `KURSOR_HUB_PORT`             | `--hub-port`             |
//! | `KURSOR_UDP_PORT`             | `--udp-port`             |
//! | `KURSOR_ADVERTISED_UDP_PORT`  | `--advertised-udp-port`  |
//! | `KURSOR_PUBLIC_BASE_URL`      | `--public-base-url`      |
//! | `KURSOR_ROOM_GRACE_TTL`       | `--room-grace-ttl`       |
//! | `KURSOR_ROOM_IDLE_TTL`        | `--room-idle-ttl`        |
//! | `KURSOR_DISPATCH_INTERVAL_MS` | `--dispatch-interval-ms` |
//! | `KURSOR_METRICS`              | `--metrics`              |
//! | `KURSOR_NO_ROOM_SNAPSHOT`     | `--no-room-snapshot`     |
//! | `KURSOR_LOG`                  | `--log-level`            |

use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use kursor_server::infrastructure::storage::config::load_config;
use kursor_server::{RelayServer, ServerConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Kursor pointer relay server.
///
/// Every option is optional; anything not given keeps the value from the
/// configuration file, or the built-in default.
#[derive(Debug, Parser)]
#[command(
    name = "kursor-server",
    about = "Relays a teacher's pointer to a student over UDP, WebSocket or a peer channel",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, env = "KURSOR_CONFIG")]
    config: Option<PathBuf>,

    /// IP address every listener binds to.
    #[arg(long, env = "KURSOR_BIND")]
    bind: Option<String>,

    #[arg(long, env = "KURSOR_HTTP_PORT")]
    http_port: Option<u16>,

    #[arg(long, env = "KURSOR_HUB_PORT")]
    hub_port: Option<u16>,

    #[arg(long, env = "KURSOR_UDP_PORT")]
    udp_port: Option<u16>,

    /// UDP port reported to clients, when the relay sits behind a port mapping.
    #[arg(long, env = "KURSOR_ADVERTISED_UDP_PORT")]
    advertised_udp_port: Option<u16>,

    /// Base URL used to build join links, e.g. `https://kursor.example.org`.
    #[arg(long, env = "KURSOR_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Seconds a room may exist without both participants before eviction.
    #[arg(long, env = "KURSOR_ROOM_GRACE_TTL")]
    room_grace_ttl: Option<u64>,

    /// Seconds of inactivity before a room is evicted.
    #[arg(long, env = "KURSOR_ROOM_IDLE_TTL")]
    room_idle_ttl: Option<u64>,

    /// Period of the hub coordinate dispatcher in milliseconds.
    #[arg(long, env = "KURSOR_DISPATCH_INTERVAL_MS", value_parser = clap::value_parser!(u64).range(1..))]
    dispatch_interval_ms: Option<u64>,

    /// Collect counters and latency samples for `GET /metrics`.
    #[arg(long, env = "KURSOR_METRICS")]
    metrics: bool,

    /// Answer `GET /rooms` with 404 instead of the room listing.
    #[arg(long, env = "KURSOR_NO_ROOM_SNAPSHOT")]
    no_room_snapshot: bool,

    /// Log filter used when `RUST_LOG` is unset (`error` … `trace`).
    #[arg(long, env = "KURSOR_LOG")]
    log_level: Option<String>,
}

impl Cli {
    /// Resolves the final [`ServerConfig`] from defaults, file and flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or if `--bind` is not an IP address.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("failed to load config file {}", path.display()))?
                .into_server_config()
                .with_context(|| format!("invalid config file {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(bind) = &self.bind {
            config.bind_address = bind
                .parse::<IpAddr>()
                .with_context(|| format!("invalid bind address: '{bind}'"))?;
        }
        if let Some(port) = self.http_port {
            config.http_port = port;
        }
        if let Some(port) = self.hub_port {
            config.hub_port = port;
        }
        if let Some(port) = self.udp_port {
            config.udp_port = port;
        }
        if let Some(port) = self.advertised_udp_port {
            config.advertised_udp_port = Some(port);
        }
        if let Some(url) = self.public_base_url {
            config.public_base_url = Some(url);
        }
        if let Some(secs) = self.room_grace_ttl {
            config.room_grace_ttl = Duration::from_secs(secs);
        }
        if let Some(secs) = self.room_idle_ttl {
            config.room_idle_ttl = Duration::from_secs(secs);
        }
        if let Some(ms) = self.dispatch_interval_ms {
            config.dispatch_interval = Duration::from_millis(ms);
        }
        if self.metrics {
            config.metrics_enabled = true;
        }
        if self.no_room_snapshot {
            config.expose_room_snapshot = false;
        }
        if let Some(level) = self.log_level {
            config.log_level = level;
        }

        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed and merged with the configuration file.
/// 2. `tracing_subscriber` is initialised.  `RUST_LOG` wins over the
///    configured log level when set.
/// 3. All three listeners are bound; a port conflict stops the process here
///    with a message naming the listener.
/// 4. A Ctrl+C handler cancels the shared [`CancellationToken`], which every
///    background task observes.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_server_config()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let server = RelayServer::bind(config)
        .await
        .context("failed to start the relay server")?;
    info!(
        http = %server.http_addr(),
        hub = %server.hub_addr(),
        udp = %server.udp_addr(),
        "Kursor relay server starting"
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.serve(cancel).await?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
