//! Application layer use cases for the relay server.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (plain data) and the infrastructure (sockets, HTTP, files).  Code here
//! decides *what* happens to a room, a datagram, or a hub request, but never
//! opens a socket itself.  That is why every rule below can be unit tested
//! with a recording sink and no network.
//!
//! # Sub-modules
//!
//! - **`room_registry`** – The authoritative store of rooms: creation,
//!   password checks, token and connection lookups, endpoint learning, and
//!   TTL eviction.
//!
//! - **`relay`** – Routing decisions for UDP datagrams.
//!
//! - **`hub`** – The coordination hub contract: join, heartbeat, position
//!   pushes, room removal, disconnect handling.
//!
//! - **`dispatcher`** – Last-value-wins position buffer flushed to students
//!   at a fixed cadence.
//!
//! - **`signaling`** – Offer/answer/ICE forwarding between participants.
//!
//! - **`connections`** – The [`EventSink`](connections::EventSink) seam and
//!   the per-connection outbound queues.
//!
//! - **`metrics`** – Counter trait with no-op and in-memory implementations.

pub mod connections;
pub mod dispatcher;
pub mod hub;
pub mod metrics;
pub mod relay;
pub mod room_registry;
pub mod signaling;
