//! Outbound delivery to coordination-hub connections.
//!
//! The hub and the dispatcher never touch a WebSocket directly.  They hand a
//! [`HubOutbound`] to an [`EventSink`] together with the target
//! [`ConnectionId`]; the production sink, [`ConnectionTable`], pushes it into
//! that connection's queue, and the connection's writer task turns it into a
//! text or binary frame.
//!
//! Tests substitute a recording sink and inspect what would have been sent.

use dashmap::DashMap;
use kursor_core::HubOutbound;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::ConnectionId;

/// Failure to queue a message for a connection.
#[derive(Debug, Error, PartialEq)]
pub enum SendError {
    /// The connection is not registered, or its writer has stopped.
    #[error("connection {0} is gone")]
    ConnectionGone(ConnectionId),
}

/// Something that can deliver hub messages to a connection.
pub trait EventSink: Send + Sync {
    /// Queues `message` for `conn`.  Never blocks.
    fn send(&self, conn: ConnectionId, message: HubOutbound) -> Result<(), SendError>;
}

/// Per-connection outbound queues, keyed by connection id.
#[derive(Default)]
pub struct ConnectionTable {
    senders: DashMap<ConnectionId, mpsc::UnboundedSender<HubOutbound>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `conn` and returns the receiving end of its queue.
    pub fn register(&self, conn: ConnectionId) -> mpsc::UnboundedReceiver<HubOutbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.insert(conn, tx);
        rx
    }

    pub fn unregister(&self, conn: ConnectionId) {
        self.senders.remove(&conn);
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

impl EventSink for ConnectionTable {
    fn send(&self, conn: ConnectionId, message: HubOutbound) -> Result<(), SendError> {
        let sender = self
            .senders
            .get(&conn)
            .ok_or(SendError::ConnectionGone(conn))?;
        sender
            .send(message)
            .map_err(|_| SendError::ConnectionGone(conn))
    }
}
