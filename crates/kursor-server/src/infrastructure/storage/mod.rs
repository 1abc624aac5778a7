//! Storage infrastructure: the optional TOML configuration file.
//!
//! Keeping file parsing here, rather than in `main.rs`, means the file format
//! can be tested on its own and the domain [`ServerConfig`](crate::domain::ServerConfig)
//! never learns that TOML exists.

pub mod config;
