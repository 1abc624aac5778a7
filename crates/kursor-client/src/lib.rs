//! kursor-client library entry point.
//!
//! # What does kursor-client do? (for beginners)
//!
//! Kursor shows a teacher's mouse pointer on a student's screen.  This crate
//! holds the parts of both front-ends that are not UI code:
//!
//! 1. **Teacher**: the OS reports pointer moves; the front-end feeds them to a
//!    [`PointerSampler`], which sends the latest position 60 times a second
//!    through a [`RelaySession`] (UDP) or a [`HubClient`] (WebSocket).
//! 2. **Student**: a [`RelaySession`] or [`HubClient`] receives positions,
//!    and [`RenderCursor`] moves the front-end's [`Overlay`] to them.
//!
//! Room creation and joining happen over the server's HTTP API before any of
//! this starts; the tokens it returns are what the sessions send.
//!
//! [`PointerSampler`]: application::sample_pointer::PointerSampler
//! [`RenderCursor`]: application::render_cursor::RenderCursor
//! [`Overlay`]: application::render_cursor::Overlay

/// Application layer: pointer sampling and cursor rendering.
pub mod application;

/// Infrastructure layer: network transports and overlay doubles.
pub mod infrastructure;

pub use application::render_cursor::{Overlay, OverlayError, RenderCursor, ScreenInfo};
pub use application::sample_pointer::{PointerSampler, PositionSink, SinkError};
pub use infrastructure::network::{ClientEvent, ClientNetworkError, HubClient, RelaySession};
