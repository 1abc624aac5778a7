//! Overlay adapters for the student side.
//!
//! The real overlay is a transparent, click-through, always-on-top surface
//! owned by the student front-end; it implements
//! [`crate::application::render_cursor::Overlay`] directly.  This crate only
//! ships the recording mock used by tests and by headless tools.

pub mod mock;
