//! Network transports of the relay server.
//!
//! # Sub-modules
//!
//! - **`udp_relay`** – Receives datagrams on the relay socket and forwards
//!   teacher cursor packets to the student's learned endpoint.  One spawned
//!   task per datagram keeps the receive loop free.
//!
//! - **`ws_hub`** – Accepts WebSocket connections for the coordination hub,
//!   parses JSON requests into the hub, and writes queued events and
//!   coordinate frames back out.

pub mod udp_relay;
pub mod ws_hub;
