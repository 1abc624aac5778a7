//! Application layer use cases for the client library.
//!
//! # What use cases does the client have?
//!
//! - **`sample_pointer`** – Teacher side.  Keeps the latest pointer position
//!   reported by the OS and emits it at a fixed rate, only when it changed,
//!   through a `PositionSink` (the datagram session or the hub client).
//!
//! - **`render_cursor`** – Student side.  Turns received positions into
//!   updates of an `Overlay` implementation injected at construction time.

pub mod render_cursor;
pub mod sample_pointer;
