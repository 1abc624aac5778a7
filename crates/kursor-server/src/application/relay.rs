//! Datagram relay decisions.
//!
//! [`RelayEngine::process`] looks at one inbound datagram and decides what the
//! socket loop should do with it.  Keeping the decision free of I/O lets the
//! routing rules be tested without opening a socket.
//!
//! # Endpoint learning (for beginners)
//!
//! Clients never register their address.  The relay remembers the source
//! address of the latest datagram carrying each token, so when a home router
//! reassigns the client's public port (NAT rebinding), the very next
//! keepalive moves the room over to the new address.  The flip side is that
//! anyone holding a valid token can redirect that role's traffic; tokens are
//! the trust boundary.

use std::net::SocketAddr;
use std::sync::Arc;

use kursor_core::protocol::codec::peek_header;
use kursor_core::{Opcode, Role};
use tracing::debug;

use crate::application::metrics::Metrics;
use crate::application::room_registry::RoomRegistry;

/// Why a datagram was not forwarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Wrong length or unknown opcode.
    Malformed,
    /// The token does not belong to a live room.
    UnknownToken,
    /// A cursor packet carried the student token.
    NotTeacher,
    /// The student has not sent anything yet.
    NoStudentEndpoint,
}

/// What the socket loop should do with a datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayAction {
    /// Send the original bytes to this address.
    Forward(SocketAddr),
    /// Keepalive processed; nothing to send.
    Refreshed,
    Drop(DropReason),
}

/// Routes datagrams between the two roles of a room.
pub struct RelayEngine {
    registry: Arc<RoomRegistry>,
    metrics: Arc<dyn Metrics>,
}

impl RelayEngine {
    pub fn new(registry: Arc<RoomRegistry>, metrics: Arc<dyn Metrics>) -> Self {
        Self { registry, metrics }
    }

    /// Decides what to do with `bytes` received from `from`.
    ///
    /// Any packet with a known token rebinds that role's endpoint to `from`
    /// and refreshes the room.  Cursor packets from the teacher are forwarded
    /// verbatim to the student's endpoint.
    pub fn process(&self, bytes: &[u8], from: SocketAddr) -> RelayAction {
        let action = self.decide(bytes, from);
        match action {
            RelayAction::Forward(_) => self.metrics.record_forward(),
            RelayAction::Drop(reason) => {
                debug!(%from, ?reason, "datagram dropped");
                self.metrics.record_drop();
            }
            RelayAction::Refreshed => {}
        }
        action
    }

    fn decide(&self, bytes: &[u8], from: SocketAddr) -> RelayAction {
        let Ok((opcode, token)) = peek_header(bytes) else {
            return RelayAction::Drop(DropReason::Malformed);
        };
        let Some((role, student_endpoint)) = self.registry.update_endpoint(&token, from) else {
            return RelayAction::Drop(DropReason::UnknownToken);
        };

        match (opcode, role) {
            (Opcode::Keepalive, _) => RelayAction::Refreshed,
            (Opcode::Cursor, Role::Student) => RelayAction::Drop(DropReason::NotTeacher),
            (Opcode::Cursor, Role::Teacher) => match student_endpoint {
                Some(addr) => RelayAction::Forward(addr),
                None => RelayAction::Drop(DropReason::NoStudentEndpoint),
            },
        }
    }
}
