//! Network infrastructure for the client library.
//!
//! Two transports carry the teacher's pointer to the relay server:
//!
//! - **`relay_session`** – a UDP socket that speaks the fixed 37-byte relay
//!   datagram.  Lowest latency; needs UDP to get through.
//! - **`hub_client`** – a WebSocket connection to the coordination hub.  Used
//!   for room control, signaling, and as the pointer path when UDP is blocked.
//!
//! Both implement [`crate::application::sample_pointer::PositionSink`], so a
//! teacher front-end can point its [`PointerSampler`] at either one.
//!
//! [`PointerSampler`]: crate::application::sample_pointer::PointerSampler

use std::net::SocketAddr;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

pub mod hub_client;
pub mod relay_session;

pub use hub_client::{ClientEvent, HubClient};
pub use relay_session::RelaySession;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientNetworkError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind local socket {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on an established socket.
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The hub connection could not be opened.
    #[error("failed to connect to hub at {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tungstenite::Error,
    },
    /// A request could not be serialized.
    #[error("failed to encode hub request: {0}")]
    Encode(#[from] serde_json::Error),
    /// A room-scoped request was made before `join`.
    #[error("not joined to a room")]
    NotJoined,
    /// The connection has been closed.
    #[error("connection closed")]
    Closed,
}
