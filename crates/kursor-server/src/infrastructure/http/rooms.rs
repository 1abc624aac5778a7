//! Handlers for the room API.
//!
//! Password hashing (Argon2) takes tens of milliseconds of CPU, so room
//! creation and joining run it on Tokio's blocking pool rather than on an
//! async worker thread.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use kursor_core::{RoomId, SessionToken};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::application::room_registry::RoomSnapshot;
use crate::domain::IceServer;

// ── Request / response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub password: String,
    #[serde(default)]
    pub aspect_w: Option<u32>,
    #[serde(default)]
    pub aspect_h: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: RoomId,
    pub teacher_token: SessionToken,
    pub udp_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRoomRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomResponse {
    pub student_token: SessionToken,
    pub udp_port: u16,
}

/// The token is kept as a string so a malformed value is a plain 404 rather
/// than a body-parsing rejection.
#[derive(Debug, Deserialize)]
pub struct HeartbeatRequest {
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceServersResponse {
    pub ice_servers: Vec<IceServer>,
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// `POST /rooms`
pub async fn create_room(
    State(state): State<AppState>,
    Json(body): Json<CreateRoomRequest>,
) -> ApiResult<Json<CreateRoomResponse>> {
    let aspect = match (body.aspect_w, body.aspect_h) {
        (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
        _ => None,
    };

    let registry = Arc::clone(&state.registry);
    let room = tokio::task::spawn_blocking(move || registry.create_room(&body.password, aspect))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))??;
    state.metrics.set_rooms(state.registry.len());

    Ok(Json(CreateRoomResponse {
        room_id: room.id().clone(),
        teacher_token: room.teacher_token(),
        udp_port: state.udp_port,
        link: state.config.join_link(room.id().as_str()),
    }))
}

/// `POST /rooms/:id/join`
pub async fn join_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<JoinRoomRequest>,
) -> ApiResult<Json<JoinRoomResponse>> {
    let id = RoomId::new(id);
    let registry = Arc::clone(&state.registry);
    let student_token =
        tokio::task::spawn_blocking(move || registry.join_as_student(&id, &body.password))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(JoinRoomResponse {
        student_token,
        udp_port: state.udp_port,
    }))
}

/// `POST /rooms/:id/heartbeat`
pub async fn heartbeat(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<HeartbeatRequest>,
) -> ApiResult<()> {
    let token: SessionToken = body.token.parse().map_err(|_| ApiError::NotFound)?;
    if state.registry.touch_in_room(&RoomId::new(id), &token) {
        Ok(())
    } else {
        Err(ApiError::NotFound)
    }
}

/// `GET /rooms`
pub async fn list_rooms(State(state): State<AppState>) -> ApiResult<Json<Vec<RoomSnapshot>>> {
    if !state.config.expose_room_snapshot {
        return Err(ApiError::NotFound);
    }
    Ok(Json(state.registry.snapshot()))
}

/// `GET /api/ice`
pub async fn ice_servers(State(state): State<AppState>) -> Json<IceServersResponse> {
    Json(IceServersResponse {
        ice_servers: state.config.ice_servers.clone(),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render_text()
}

/// `GET /health`
pub async fn health() -> &'static str {
    "ok"
}

// ── Tests ─────────────────────────────────────────────────────────────────────
