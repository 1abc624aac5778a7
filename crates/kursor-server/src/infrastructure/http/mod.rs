//! HTTP room API.
//!
//! | method | path                     | purpose                               |
//! |--------|--------------------------|---------------------------------------|
//! | POST   | `/rooms`                 | create a room, get the teacher token  |
//! | POST   | `/rooms/:id/join`        | password check, get the student token |
//! | POST   | `/rooms/:id/heartbeat`   | keep a room alive without UDP         |
//! | GET    | `/rooms`                 | debug listing (can be disabled)       |
//! | GET    | `/api/ice`               | STUN/TURN servers for peer channels   |
//! | GET    | `/metrics`               | plain-text counters                   |
//! | GET    | `/health`                | liveness probe                        |
//!
//! All JSON bodies use camelCase field names.  CORS is fully permissive
//! because browser front-ends are served from arbitrary origins.

pub mod error;
pub mod rooms;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use crate::application::metrics::Metrics;
use crate::application::room_registry::RoomRegistry;
use crate::domain::ServerConfig;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub metrics: Arc<dyn Metrics>,
    pub config: Arc<ServerConfig>,
    /// UDP port reported to clients: the advertised port if configured,
    /// otherwise the port the relay socket is bound to.
    pub udp_port: u16,
}

/// Builds the room API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/rooms", post(rooms::create_room).get(rooms::list_rooms))
        .route("/rooms/:id/join", post(rooms::join_room))
        .route("/rooms/:id/heartbeat", post(rooms::heartbeat))
        .route("/api/ice", get(rooms::ice_servers))
        .route("/metrics", get(rooms::metrics))
        .route("/health", get(rooms::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
