//! Coordination hub: per-connection request handling.
//!
//! The WebSocket transport parses each text frame into a [`HubRequest`] and
//! calls [`Hub::handle`] with the id of the connection it arrived on.  The hub
//! checks the request against the room registry and answers through the
//! [`EventSink`], so this module contains the whole hub contract and none of
//! the socket plumbing.
//!
//! # Contract summary
//!
//! | request        | who may call it           | effect                                   |
//! |----------------|---------------------------|------------------------------------------|
//! | `join`         | anyone with a role token  | bind connection, ack, notify teacher     |
//! | `heartbeat`    | any bound connection      | refresh room activity                    |
//! | `sendCoords`   | the bound teacher         | quantize and buffer for the dispatcher   |
//! | `removeRoom`   | the bound teacher         | notify student, evict room               |
//! | `send*`        | either bound participant  | forward payload to the other participant |
//!
//! Requests from connections without the right binding are ignored (or, for
//! `removeRoom`, answered with `removed: false`); they never change state.

use std::sync::Arc;

use kursor_core::protocol::codec::quantize;
use kursor_core::protocol::hub::SignalKind;
use kursor_core::{HubEvent, HubRequest, Role, SessionToken};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::connections::EventSink;
use crate::application::dispatcher::Dispatcher;
use crate::application::metrics::Metrics;
use crate::application::room_registry::RoomRegistry;
use crate::application::signaling::forward_signal;
use crate::domain::ConnectionId;

/// Request handler shared by all hub connections.
pub struct Hub {
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<Dispatcher>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<dyn Metrics>,
}

impl Hub {
    pub fn new(
        registry: Arc<RoomRegistry>,
        dispatcher: Arc<Dispatcher>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<dyn Metrics>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            sink,
            metrics,
        }
    }

    /// Dispatches one parsed request from `conn`.
    pub fn handle(&self, conn: ConnectionId, request: HubRequest) {
        match request {
            HubRequest::Join { token, role } => self.join(conn, &token, role),
            HubRequest::Heartbeat => self.heartbeat(conn),
            HubRequest::SendCoords { token, x, y } => {
                self.push_position(conn, &token, x, y);
            }
            HubRequest::RemoveRoom { token } => {
                let removed = self.remove_room(conn, &token);
                self.notify(conn, HubEvent::RoomRemovalResult { removed });
            }
            other => {
                if let Some((token, kind, payload)) = other.as_signal() {
                    self.forward(conn, &token, kind, payload.clone());
                }
            }
        }
    }

    /// Binds `conn` to `role` in the room `token` names.
    ///
    /// Unknown or mismatched tokens are answered with `RoomNotFound` to the
    /// caller only.
    pub fn join(&self, conn: ConnectionId, token: &SessionToken, role: Role) {
        let outcome = match self.registry.bind_connection(conn, token, role) {
            Ok(outcome) => outcome,
            Err(_) => {
                debug!(%conn, %role, "join refused: room not found");
                self.notify(conn, HubEvent::RoomNotFound);
                return;
            }
        };

        let ack = match role {
            Role::Teacher => {
                let (aspect_w, aspect_h) = outcome.room.aspect();
                HubEvent::JoinedAsTeacher {
                    token: *token,
                    aspect_w,
                    aspect_h,
                }
            }
            Role::Student => HubEvent::JoinedAsStudent { token: *token },
        };
        self.notify(conn, ack);

        if role == Role::Student {
            if let Some(teacher) = outcome.peer {
                self.notify(teacher, HubEvent::StudentConnected);
            }
        }
    }

    /// Refreshes the activity of the room `conn` is bound to.
    pub fn heartbeat(&self, conn: ConnectionId) {
        if !self.registry.touch_connection(conn) {
            debug!(%conn, "heartbeat from unbound connection");
        }
    }

    /// Buffers a teacher position for the dispatcher.
    ///
    /// Only the connection currently bound as the room's teacher may push;
    /// anything else returns `false` without side effects.
    pub fn push_position(&self, conn: ConnectionId, token: &SessionToken, x: f32, y: f32) -> bool {
        let Some(room) = self.registry.resolve_by_token(token) else {
            return false;
        };
        if room.connection(Role::Teacher) != Some(conn) || room.teacher_token() != *token {
            debug!(%conn, room = %room.id(), "position push from non-teacher ignored");
            return false;
        }
        self.dispatcher.push(room.teacher_token(), quantize(x), quantize(y));
        self.metrics.record_push();
        true
    }

    /// Removes the room on behalf of its bound teacher.
    ///
    /// On success the bound student (if any) receives `RoomRemoved`.
    pub fn remove_room(&self, conn: ConnectionId, token: &SessionToken) -> bool {
        let Some(room) = self.registry.resolve_by_token(token) else {
            return false;
        };
        if room.connection(Role::Teacher) != Some(conn) {
            warn!(%conn, room = %room.id(), "room removal refused: caller is not the teacher");
            return false;
        }
        let student = room.connection(Role::Student);
        if !self.registry.remove_by_token(token) {
            return false;
        }
        if let Some(student) = student {
            self.notify(student, HubEvent::RoomRemoved);
        }
        info!(room = %room.id(), "room removed over hub");
        true
    }

    fn forward(
        &self,
        conn: ConnectionId,
        token: &SessionToken,
        kind: SignalKind,
        payload: Value,
    ) {
        forward_signal(&self.registry, self.sink.as_ref(), conn, token, kind, payload);
    }

    /// Cleans up after `conn` closed.
    ///
    /// The other participant gets a best-effort `PeerDisconnected`; the room
    /// itself stays registered and remains usable over UDP.
    pub fn disconnect(&self, conn: ConnectionId) {
        if let Some(left) = self.registry.unbind_connection(conn) {
            if let Some(peer) = left.peer {
                self.notify(peer, HubEvent::PeerDisconnected);
            }
        }
    }

    fn notify(&self, conn: ConnectionId, event: HubEvent) {
        if let Err(e) = self.sink.send(conn, event.into()) {
            debug!("hub notification dropped: {e}");
        }
    }
}
