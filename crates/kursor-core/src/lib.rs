//! # kursor-core
//!
//! Shared library for the Kursor pointer relay containing room identifiers,
//! password credentials, the datagram codec, and the coordination-hub message
//! types.
//!
//! This crate is used by both the relay server and the teacher/student client
//! library.  It has zero dependencies on sockets, async runtimes, or UI
//! frameworks.
//!
//! # Architecture overview (for beginners)
//!
//! Kursor relays one moving pointer from a *teacher* machine to a *student*
//! machine.  The two sides pair through a password-protected *room* on the
//! relay server, and the pointer position can then travel over any of three
//! interchangeable paths: raw UDP datagrams, a rate-limited WebSocket hub, or a
//! direct peer channel negotiated through the hub.
//!
//! This crate (`kursor-core`) is the shared foundation.  It defines:
//!
//! - **`domain`** – Room ids, the per-role session tokens, and the salted
//!   password credential that protects a room.
//!
//! - **`protocol`** – How bytes travel over the network.  Pointer samples are
//!   encoded into a fixed 37-byte little-endian datagram; the hub sends
//!   compact 5-byte fixed-point frames and JSON control messages.

pub mod domain;
pub mod protocol;

// Re-export the most-used types at the crate root so callers can write
// `kursor_core::SessionToken` instead of `kursor_core::domain::ids::SessionToken`.
pub use domain::credential::{CredentialError, PasswordCredential};
pub use domain::ids::{Role, RoomId, SessionToken};
pub use protocol::codec::{decode_packet, encode_packet, ProtocolError};
pub use protocol::hub::{HubEvent, HubOutbound, HubRequest};
pub use protocol::messages::{CoordsFrame, Opcode, RelayPacket};
