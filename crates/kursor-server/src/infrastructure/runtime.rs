//! Server assembly: binds every socket and runs every background task.
//!
//! [`RelayServer::bind`] builds the object graph (registry, metrics,
//! dispatcher, hub, connection table) and binds the three listeners.
//! Binding is separate from serving so callers (and tests using port `0`)
//! can read the actual addresses before traffic starts.
//!
//! [`RelayServer::serve`] then runs five tasks until the shared
//! [`CancellationToken`] fires:
//!
//! ```text
//! ┌ room sweeper ───── evicts expired rooms every sweep_interval
//! ├ dispatcher ─────── flushes buffered positions every dispatch_interval
//! ├ UDP relay ──────── routes datagrams
//! ├ hub ────────────── WebSocket sessions
//! └ HTTP API ───────── room creation / join / heartbeat
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::{TcpListener, UdpSocket};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::application::connections::ConnectionTable;
use crate::application::dispatcher::Dispatcher;
use crate::application::hub::Hub;
use crate::application::metrics::{Metrics, NoopMetrics, SimpleMetrics};
use crate::application::relay::RelayEngine;
use crate::application::room_registry::{run_sweeper, RegistrySettings, RoomRegistry};
use crate::domain::ServerConfig;
use crate::infrastructure::http::{self, AppState};
use crate::infrastructure::network::{udp_relay::run_udp_relay, ws_hub::serve_hub};

/// Failure to start or run the relay server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A listener could not be bound.
    #[error("failed to bind {what} on {addr}: {source}")]
    Bind {
        what: &'static str,
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an I/O error.
    #[error("HTTP server error: {0}")]
    Http(#[source] std::io::Error),
}

/// A bound, not yet running, relay server.
pub struct RelayServer {
    config: Arc<ServerConfig>,
    registry: Arc<RoomRegistry>,
    metrics: Arc<dyn Metrics>,
    udp: Arc<UdpSocket>,
    hub_listener: TcpListener,
    http_listener: TcpListener,
    udp_addr: SocketAddr,
    hub_addr: SocketAddr,
    http_addr: SocketAddr,
}

impl RelayServer {
    /// Builds the components and binds the UDP, hub and HTTP listeners.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Bind`] naming the listener that failed.
    pub async fn bind(config: ServerConfig) -> Result<Self, RelayError> {
        let udp = UdpSocket::bind(config.udp_addr())
            .await
            .map_err(bind_error("UDP relay", config.udp_addr()))?;
        let hub_listener = TcpListener::bind(config.hub_addr())
            .await
            .map_err(bind_error("coordination hub", config.hub_addr()))?;
        let http_listener = TcpListener::bind(config.http_addr())
            .await
            .map_err(bind_error("room API", config.http_addr()))?;

        let udp_addr = udp.local_addr().map_err(bind_error("UDP relay", config.udp_addr()))?;
        let hub_addr = hub_listener
            .local_addr()
            .map_err(bind_error("coordination hub", config.hub_addr()))?;
        let http_addr = http_listener
            .local_addr()
            .map_err(bind_error("room API", config.http_addr()))?;

        let metrics: Arc<dyn Metrics> = if config.metrics_enabled {
            Arc::new(SimpleMetrics::new())
        } else {
            Arc::new(NoopMetrics)
        };
        let registry = Arc::new(RoomRegistry::new(RegistrySettings {
            grace_ttl: config.room_grace_ttl,
            idle_ttl: config.room_idle_ttl,
        }));

        Ok(Self {
            config: Arc::new(config),
            registry,
            metrics,
            udp: Arc::new(udp),
            hub_listener,
            http_listener,
            udp_addr,
            hub_addr,
            http_addr,
        })
    }

    pub fn udp_addr(&self) -> SocketAddr {
        self.udp_addr
    }

    pub fn hub_addr(&self) -> SocketAddr {
        self.hub_addr
    }

    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// The registry the running server will use.
    pub fn registry(&self) -> Arc<RoomRegistry> {
        Arc::clone(&self.registry)
    }

    /// The UDP port clients are told to use.
    pub fn advertised_udp_port(&self) -> u16 {
        self.config
            .advertised_udp_port
            .unwrap_or_else(|| self.udp_addr.port())
    }

    /// Runs every task until `cancel` fires, then waits for them to stop.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Http`] if the HTTP server fails.  The other
    /// tasks log their own errors and keep running.
    pub async fn serve(self, cancel: CancellationToken) -> Result<(), RelayError> {
        let udp_port = self.advertised_udp_port();
        let Self {
            config,
            registry,
            metrics,
            udp,
            hub_listener,
            http_listener,
            http_addr,
            ..
        } = self;

        let table = Arc::new(ConnectionTable::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            table.clone(),
            Arc::clone(&metrics),
            config.dispatch_interval,
        ));
        let hub = Arc::new(Hub::new(
            Arc::clone(&registry),
            Arc::clone(&dispatcher),
            table.clone(),
            Arc::clone(&metrics),
        ));
        let engine = Arc::new(RelayEngine::new(Arc::clone(&registry), Arc::clone(&metrics)));

        let sweeper = tokio::spawn(run_sweeper(
            Arc::clone(&registry),
            Arc::clone(&metrics),
            config.sweep_interval,
            cancel.clone(),
        ));
        let dispatch = tokio::spawn(dispatcher.run(cancel.clone()));
        let relay = tokio::spawn(run_udp_relay(udp, engine, cancel.clone()));
        let hub_task = tokio::spawn(serve_hub(hub_listener, hub, table, cancel.clone()));

        let router = http::router(AppState {
            registry,
            metrics,
            config,
            udp_port,
        });
        info!("room API listening on http://{http_addr}");
        let http_cancel = cancel.clone();
        let http_result = axum::serve(http_listener, router)
            .with_graceful_shutdown(async move { http_cancel.cancelled().await })
            .await;

        // The HTTP server only returns early on error; make sure the rest stop too.
        cancel.cancel();
        let _ = tokio::join!(sweeper, dispatch, relay, hub_task);
        info!("relay server stopped");

        http_result.map_err(RelayError::Http)
    }
}

fn bind_error(what: &'static str, addr: SocketAddr) -> impl Fn(std::io::Error) -> RelayError {
    move |source| RelayError::Bind { what, addr, source }
}
