//! WebSocket transport for the coordination hub.
//!
//! This module is responsible for:
//!
//! 1. Accepting TCP connections on the hub listener.
//! 2. Upgrading each connection to a WebSocket session.
//! 3. Registering the session in the [`ConnectionTable`] so the hub and the
//!    dispatcher can address it by [`ConnectionId`].
//! 4. Running two halves per session:
//!    - **Reader**: text frames → [`HubRequest`] → [`Hub::handle`].
//!    - **Writer**: queued [`HubOutbound`] → JSON text frame (events) or
//!      5-byte binary frame (coordinates).
//! 5. Telling the hub when the session ends so the peer is notified.
//!
//! # Scalability
//!
//! Each session runs in its own Tokio task and the accept loop spawns it
//! before accepting the next connection, so one slow browser never holds up
//! another.  The writer drains an unbounded queue, which means the hub and
//! dispatcher never wait on a socket.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use futures_util::{SinkExt, StreamExt};
use kursor_core::protocol::codec::encode_coords;
use kursor_core::{HubOutbound, HubRequest};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{
    accept_async,
    tungstenite::{Error as WsError, Message as WsMessage},
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::application::connections::ConnectionTable;
use crate::application::hub::Hub;
use crate::domain::ConnectionId;

// ── Public API ────────────────────────────────────────────────────────────────

/// Runs the hub accept loop on `listener` until `cancel` fires.
///
/// Open sessions observe the same token and close when it fires.
pub async fn serve_hub(
    listener: TcpListener,
    hub: Arc<Hub>,
    table: Arc<ConnectionTable>,
    cancel: CancellationToken,
) {
    match listener.local_addr() {
        Ok(addr) => info!("coordination hub listening on ws://{addr}"),
        Err(e) => info!("coordination hub started (local address unavailable: {e})"),
    }

    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            r = listener.accept() => r,
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                let hub = Arc::clone(&hub);
                let table = Arc::clone(&table);
                let cancel = cancel.clone();
                tokio::spawn(async move {
                    handle_session(stream, peer_addr, hub, table, cancel).await;
                });
            }
            Err(e) => error!("hub accept error: {e}"),
        }
    }

    info!("coordination hub stopped");
}

// ── Per-session handler ───────────────────────────────────────────────────────

/// Wraps [`run_session`] and logs the outcome.
async fn handle_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<Hub>,
    table: Arc<ConnectionTable>,
    cancel: CancellationToken,
) {
    match run_session(stream, peer_addr, hub, table, cancel).await {
        Ok(()) => debug!("hub session {peer_addr} closed"),
        Err(e) => warn!("hub session {peer_addr} closed with error: {e:#}"),
    }
}

/// Runs the complete lifecycle of one hub connection.
///
/// # Errors
///
/// Returns an error only if the WebSocket handshake fails.  Once the session
/// is established, read errors simply end it.
async fn run_session(
    stream: TcpStream,
    peer_addr: SocketAddr,
    hub: Arc<Hub>,
    table: Arc<ConnectionTable>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream)
        .await
        .with_context(|| format!("WebSocket handshake failed with {peer_addr}"))?;

    let conn = ConnectionId::new();
    let mut outbound = table.register(conn);
    info!(%conn, %peer_addr, "hub connection opened");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // ── Writer ────────────────────────────────────────────────────────────────
    let writer = tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            let frame = match to_ws_message(&message) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(%conn, "hub event serialization error: {e}");
                    continue;
                }
            };
            if ws_tx.send(frame).await.is_err() {
                debug!(%conn, "WebSocket send failed (peer gone)");
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    // ── Reader ────────────────────────────────────────────────────────────────
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            next = ws_rx.next() => next,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(WsError::ConnectionClosed | WsError::Protocol(_))) | None => break,
            Some(Err(e)) => {
                warn!(%conn, "hub WebSocket error: {e}");
                break;
            }
        };

        match message {
            WsMessage::Text(text) => match serde_json::from_str::<HubRequest>(&text) {
                Ok(request) => hub.handle(conn, request),
                Err(e) => warn!(%conn, "invalid hub request: {e}"),
            },
            WsMessage::Binary(_) => warn!(%conn, "unexpected binary frame from client (ignored)"),
            WsMessage::Close(_) => break,
            WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_) => {}
        }
    }

    hub.disconnect(conn);
    table.unregister(conn);
    // Unregistering dropped the queue's sender, so the writer drains and exits.
    let _ = writer.await;
    info!(%conn, "hub connection closed");
    Ok(())
}

/// Converts one queued message into its wire frame.
fn to_ws_message(message: &HubOutbound) -> Result<WsMessage, serde_json::Error> {
    Ok(match message {
        HubOutbound::Event(event) => WsMessage::Text(serde_json::to_string(event)?),
        HubOutbound::Coords(frame) => WsMessage::Binary(encode_coords(frame).to_vec()),
    })
}
