//! Signaling relay for direct peer channels.
//!
//! Before teacher and student can open a direct data channel they must swap
//! an offer, an answer, and any number of ICE candidates.  The server does not
//! take part in that negotiation: it looks up which connection sits on the
//! other side of the room and passes the payload along unread.

use kursor_core::protocol::hub::SignalKind;
use kursor_core::{HubOutbound, SessionToken};
use serde_json::Value;
use tracing::debug;

use crate::application::connections::EventSink;
use crate::application::room_registry::RoomRegistry;
use crate::domain::ConnectionId;

/// Forwards a signaling payload from `caller` to the other participant of the
/// room `token` names.
///
/// Returns `true` if the payload was queued.  An unknown room, a caller that
/// is not bound in the room, or a missing peer makes this a silent no-op.
pub fn forward_signal(
    registry: &RoomRegistry,
    sink: &dyn EventSink,
    caller: ConnectionId,
    token: &SessionToken,
    kind: SignalKind,
    payload: Value,
) -> bool {
    let Some(room) = registry.resolve_by_token(token) else {
        return false;
    };
    let Some(caller_role) = room.role_of_connection(caller) else {
        return false;
    };
    let Some(peer) = room.connection(caller_role.peer()) else {
        return false;
    };

    match sink.send(peer, HubOutbound::Event(kind.into_event(payload))) {
        Ok(()) => true,
        Err(e) => {
            debug!(room = %room.id(), ?kind, "signal forward failed: {e}");
            false
        }
    }
}
