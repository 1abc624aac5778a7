//! RenderCursor use case: turns received positions into overlay updates.
//!
//! This use case sits at the application layer and delegates drawing to an
//! [`Overlay`] trait object.  A student front-end implements `Overlay` with
//! whatever it draws on (a transparent always-on-top window, a canvas in a
//! browser shell, ...); the tests use the recording mock in
//! `infrastructure::overlay::mock`.
//!
//! Positions can arrive from any of the three transports (datagram session,
//! hub coordinate frames, a peer channel); they are all normalized `[0, 1]`
//! pairs by the time they get here.

use std::sync::Arc;

use kursor_core::protocol::messages::clamp_unit;
use kursor_core::CoordsFrame;
use thiserror::Error;

/// Error type for overlay operations.
#[derive(Debug, Error, PartialEq)]
pub enum OverlayError {
    /// The drawing surface rejected the update.
    #[error("overlay error: {0}")]
    Platform(String),
    /// The overlay has been closed.
    #[error("overlay closed")]
    Closed,
}

/// Size of the surface the overlay draws on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenInfo {
    /// Width in physical pixels.
    pub width: u32,
    /// Height in physical pixels.
    pub height: u32,
    /// Physical pixels per logical pixel (1.0 on a standard display).
    pub dpi_scale: f32,
}

impl ScreenInfo {
    /// Maps a normalized position to logical pixel coordinates.
    ///
    /// `(1.0, 1.0)` maps to the last pixel, not one past it.
    pub fn to_logical(&self, x: f32, y: f32) -> (f32, f32) {
        let scale = if self.dpi_scale > 0.0 { self.dpi_scale } else { 1.0 };
        let max_x = self.width.saturating_sub(1) as f32;
        let max_y = self.height.saturating_sub(1) as f32;
        (clamp_unit(x) * max_x / scale, clamp_unit(y) * max_y / scale)
    }
}

/// A surface that can show the teacher's pointer.
pub trait Overlay: Send + Sync {
    /// Moves the rendered pointer to a normalized position.
    fn set_normalized_target(&self, x: f32, y: f32) -> Result<(), OverlayError>;

    /// Describes the surface, for front-ends that need pixel coordinates.
    fn screen_info(&self) -> ScreenInfo;
}

/// The RenderCursor use case.
pub struct RenderCursor {
    overlay: Arc<dyn Overlay>,
    last: Option<(f32, f32)>,
}

impl RenderCursor {
    pub fn new(overlay: Arc<dyn Overlay>) -> Self {
        Self {
            overlay,
            last: None,
        }
    }

    /// Forwards a position to the overlay.
    ///
    /// Values are clamped to `[0, 1]` first.  A position exactly equal to the
    /// previous one is skipped.  Returns `true` when the overlay was updated.
    ///
    /// # Errors
    ///
    /// Returns [`OverlayError`] if the overlay rejects the update; the
    /// position is then not remembered, so a retry is not deduplicated away.
    pub fn handle_position(&mut self, x: f32, y: f32) -> Result<bool, OverlayError> {
        let position = (clamp_unit(x), clamp_unit(y));
        if self.last == Some(position) {
            return Ok(false);
        }
        self.overlay.set_normalized_target(position.0, position.1)?;
        self.last = Some(position);
        Ok(true)
    }

    /// Forwards a hub coordinate frame.
    pub fn handle_frame(&mut self, frame: &CoordsFrame) -> Result<bool, OverlayError> {
        let (x, y) = frame.position();
        self.handle_position(x, y)
    }

    /// Forgets the last position, e.g. after a reconnect.
    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last_position(&self) -> Option<(f32, f32)> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::overlay::mock::MockOverlay;

    fn setup() -> (Arc<MockOverlay>, RenderCursor) {
        let overlay = Arc::new(MockOverlay::new());
        let use_case = RenderCursor::new(overlay.clone());
        (overlay, use_case)
    }

    #[test]
    fn test_position_reaches_overlay() {
        // Arrange
        let (overlay, mut render) = setup();

        // Act
        let updated = render.handle_position(0.5, 0.25).unwrap();

        // Assert
        assert!(updated);
        assert_eq!(overlay.targets(), vec![(0.5, 0.25)]);
    }

    #[test]
    fn test_exact_duplicate_is_skipped() {
        let (overlay, mut render) = setup();

        render.handle_position(0.1, 0.2).unwrap();
        let second = render.handle_position(0.1, 0.2).unwrap();
        render.handle_position(0.1, 0.3).unwrap();

        assert!(!second);
        assert_eq!(overlay.targets(), vec![(0.1, 0.2), (0.1, 0.3)]);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let (overlay, mut render) = setup();

        render.handle_position(-3.0, 7.5).unwrap();
        render.handle_position(f32::NAN, 0.5).unwrap();

        assert_eq!(overlay.targets(), vec![(0.0, 1.0), (0.0, 0.5)]);
    }

    #[test]
    fn test_frame_is_dequantized() {
        let (overlay, mut render) = setup();

        render
            .handle_frame(&CoordsFrame { seq_low: 0, x: u16::MAX, y: 0 })
            .unwrap();

        assert_eq!(overlay.targets(), vec![(1.0, 0.0)]);
    }

    #[test]
    fn test_failed_update_is_not_remembered() {
        // Arrange
        let overlay = Arc::new(MockOverlay::failing());
        let mut render = RenderCursor::new(overlay.clone());

        // Act
        let result = render.handle_position(0.5, 0.5);

        // Assert
        assert!(result.is_err());
        assert_eq!(render.last_position(), None);
    }

    #[test]
    fn test_reset_allows_same_position_again() {
        let (overlay, mut render) = setup();
        render.handle_position(0.4, 0.4).unwrap();

        render.reset();
        render.handle_position(0.4, 0.4).unwrap();

        assert_eq!(overlay.targets().len(), 2);
    }

    #[test]
    fn test_screen_info_maps_corners_to_pixels() {
        let screen = ScreenInfo {
            width: 1920,
            height: 1080,
            dpi_scale: 1.0,
        };
        assert_eq!(screen.to_logical(0.0, 0.0), (0.0, 0.0));
        assert_eq!(screen.to_logical(1.0, 1.0), (1919.0, 1079.0));

        let hidpi = ScreenInfo { dpi_scale: 2.0, ..screen };
        assert_eq!(hidpi.to_logical(1.0, 1.0), (959.5, 539.5));
    }
}
