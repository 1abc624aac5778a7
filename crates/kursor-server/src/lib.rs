//! kursor-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # Layers
//!
//! ```text
//! domain/          ServerConfig, ConnectionId
//! application/     RoomRegistry, RelayEngine, Hub, Dispatcher, signaling, metrics
//! infrastructure/  UDP loop, WebSocket hub, HTTP API, TOML config, RelayServer
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use domain::ServerConfig;
pub use infrastructure::runtime::{RelayError, RelayServer};
