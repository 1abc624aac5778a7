//! Infrastructure layer for the relay server.
//!
//! Contains the OS-facing adapters: the UDP socket loop, the WebSocket hub
//! transport, the HTTP room API, the TOML configuration file, and the
//! runtime that wires them together.
//!
//! **Dependency rule**: this layer may depend on `application`, `domain` and
//! `kursor_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod http;
pub mod network;
pub mod runtime;
pub mod storage;
