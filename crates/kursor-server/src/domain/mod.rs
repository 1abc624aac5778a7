//! Domain layer for the relay server.
//!
//! Plain data types with no I/O: the runtime configuration and the identifier
//! given to each coordination-hub connection.  Everything here can be built in
//! a unit test without a socket or a runtime.

pub mod config;
pub mod connection;

pub use config::{IceServer, ServerConfig};
pub use connection::ConnectionId;
