//! WebSocket client for the coordination hub.
//!
//! # Structure
//!
//! [`HubClient::connect`] opens the connection and splits it into two tasks,
//! the same way the server side does:
//!
//! ```text
//!   HubClient methods ──mpsc──► writer task ──► WebSocket sink
//!   WebSocket stream ──► reader task ──mpsc──► ClientEvent receiver
//! ```
//!
//! Text frames from the hub decode into [`HubEvent`]s; binary frames are
//! 5-byte coordinate frames.  Frames that decode as neither are logged and
//! dropped.  The event receiver ends when the connection closes.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use kursor_core::protocol::codec::decode_coords;
use kursor_core::{CoordsFrame, HubEvent, HubRequest, Role, SessionToken};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::ClientNetworkError;
use crate::application::sample_pointer::{PositionSink, SinkError};

/// Default period of [`HubClient::run_heartbeat`].
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Something received from the hub.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A JSON notification.
    Event(HubEvent),
    /// A pointer position (student side).
    Coords(CoordsFrame),
}

/// A connection to the coordination hub.
///
/// Dropping the client closes the connection.
pub struct HubClient {
    outbound: mpsc::UnboundedSender<WsMessage>,
    token: Mutex<Option<SessionToken>>,
    shutdown: CancellationToken,
}

impl HubClient {
    /// Connects to the hub at `url` (e.g. `ws://relay.example:5001`).
    ///
    /// Returns the client and the receiver of everything the hub sends.
    pub async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientNetworkError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|source| ClientNetworkError::Connect {
                url: url.to_string(),
                source,
            })?;
        info!("connected to hub at {url}");

        let (mut sink, mut stream) = ws.split();
        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<WsMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();

        // ── Writer task ──────────────────────────────────────────────────────
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                if let Err(e) = sink.send(msg).await {
                    debug!("hub send failed: {e}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // ── Reader task ──────────────────────────────────────────────────────
        let reader_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = reader_shutdown.cancelled() => break,
                    frame = stream.next() => frame,
                };
                let msg = match frame {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        debug!("hub connection error: {e}");
                        break;
                    }
                    None => break,
                };
                let event = match msg {
                    WsMessage::Text(text) => match serde_json::from_str::<HubEvent>(&text) {
                        Ok(event) => ClientEvent::Event(event),
                        Err(e) => {
                            warn!("unrecognised hub event {text:?}: {e}");
                            continue;
                        }
                    },
                    WsMessage::Binary(bytes) => match decode_coords(&bytes) {
                        Ok(frame) => ClientEvent::Coords(frame),
                        Err(e) => {
                            warn!("bad coordinate frame: {e}");
                            continue;
                        }
                    },
                    WsMessage::Close(_) => break,
                    _ => continue,
                };
                if event_tx.send(event).is_err() {
                    break;
                }
            }
            debug!("hub reader finished");
        });

        Ok((
            Self {
                outbound: out_tx,
                token: Mutex::new(None),
                shutdown,
            },
            event_rx,
        ))
    }

    fn send_request(&self, request: &HubRequest) -> Result<(), ClientNetworkError> {
        let text = serde_json::to_string(request)?;
        self.outbound
            .send(WsMessage::Text(text))
            .map_err(|_| ClientNetworkError::Closed)
    }

    fn joined_token(&self) -> Result<SessionToken, ClientNetworkError> {
        (*self.token.lock()).ok_or(ClientNetworkError::NotJoined)
    }

    /// Binds this connection to a room role.  The hub answers with
    /// `JoinedAsTeacher`, `JoinedAsStudent` or `RoomNotFound`.
    pub fn join(&self, token: SessionToken, role: Role) -> Result<(), ClientNetworkError> {
        self.send_request(&HubRequest::Join { token, role })?;
        *self.token.lock() = Some(token);
        Ok(())
    }

    /// The token passed to the last [`join`](Self::join).
    pub fn token(&self) -> Option<SessionToken> {
        *self.token.lock()
    }

    /// Pushes a pointer position (teacher side).
    pub fn send_coords(&self, x: f32, y: f32) -> Result<(), ClientNetworkError> {
        let token = self.joined_token()?;
        self.send_request(&HubRequest::SendCoords { token, x, y })
    }

    pub fn heartbeat(&self) -> Result<(), ClientNetworkError> {
        self.send_request(&HubRequest::Heartbeat)
    }

    /// Asks the hub to delete the room.  Only honoured for the teacher token.
    pub fn remove_room(&self) -> Result<(), ClientNetworkError> {
        let token = self.joined_token()?;
        self.send_request(&HubRequest::RemoveRoom { token })
    }

    pub fn send_offer(&self, payload: Value) -> Result<(), ClientNetworkError> {
        let token = self.joined_token()?;
        self.send_request(&HubRequest::SendOffer { token, payload })
    }

    pub fn send_answer(&self, payload: Value) -> Result<(), ClientNetworkError> {
        let token = self.joined_token()?;
        self.send_request(&HubRequest::SendAnswer { token, payload })
    }

    pub fn send_ice_candidate(&self, payload: Value) -> Result<(), ClientNetworkError> {
        let token = self.joined_token()?;
        self.send_request(&HubRequest::SendIceCandidate { token, payload })
    }

    /// Sends a heartbeat every `interval` until `cancel` fires or the
    /// connection closes.
    pub async fn run_heartbeat(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately; joining already counts as activity.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if self.heartbeat().is_err() {
                        debug!("hub closed, stopping heartbeat");
                        break;
                    }
                }
            }
        }
    }

    /// Sends a close frame.  The event receiver ends once the hub confirms.
    pub fn close(&self) {
        let _ = self.outbound.send(WsMessage::Close(None));
    }
}

impl Drop for HubClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[async_trait]
impl PositionSink for HubClient {
    async fn send_position(&self, x: f32, y: f32) -> Result<(), SinkError> {
        self.send_coords(x, y).map_err(|e| SinkError(e.to_string()))
    }
}
