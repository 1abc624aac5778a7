//! Infrastructure layer for the client library.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `kursor_core`, but MUST NOT be imported by the `application` layer outside
//! of tests.
//!
//! # Sub-modules
//!
//! - **`network`** – The UDP relay session and the WebSocket hub client.
//!   Both implement `PositionSink`.
//!
//! - **`overlay`** – `MockOverlay`, a recording `Overlay` for tests and
//!   headless tools.

pub mod network;
pub mod overlay;
