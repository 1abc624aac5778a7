//! Mock overlay for unit testing.
//!
//! # Why a mock overlay?
//!
//! A real overlay draws on the screen, which needs a desktop session and
//! cannot be observed from Rust test code.  `MockOverlay` records every
//! target it is given in a `Mutex<Vec<...>>` so tests can assert exactly
//! what would have been drawn, and in which order.
//!
//! # Usage in tests
//!
//! ```ignore
//! let overlay = Arc::new(MockOverlay::new());
//! let mut render = RenderCursor::new(overlay.clone());
//!
//! render.handle_position(0.5, 0.5).unwrap();
//!
//! assert_eq!(overlay.targets(), vec![(0.5, 0.5)]);
//! ```
//!
//! Build it with [`MockOverlay::failing`] to exercise error paths.

use parking_lot::Mutex;

use crate::application::render_cursor::{Overlay, OverlayError, ScreenInfo};

/// Records every target instead of drawing it.
#[derive(Debug)]
pub struct MockOverlay {
    targets: Mutex<Vec<(f32, f32)>>,
    screen: ScreenInfo,
    should_fail: bool,
}

impl Default for MockOverlay {
    fn default() -> Self {
        Self {
            targets: Mutex::new(Vec::new()),
            screen: ScreenInfo {
                width: 1920,
                height: 1080,
                dpi_scale: 1.0,
            },
            should_fail: false,
        }
    }
}

impl MockOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// An overlay whose every update fails with [`OverlayError::Platform`].
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// An overlay reporting the given surface size.
    pub fn with_screen(screen: ScreenInfo) -> Self {
        Self {
            screen,
            ..Self::default()
        }
    }

    /// Targets received so far, oldest first.
    pub fn targets(&self) -> Vec<(f32, f32)> {
        self.targets.lock().clone()
    }
}

impl Overlay for MockOverlay {
    fn set_normalized_target(&self, x: f32, y: f32) -> Result<(), OverlayError> {
        if self.should_fail {
            return Err(OverlayError::Platform("mock failure".to_string()));
        }
        self.targets.lock().push((x, y));
        Ok(())
    }

    fn screen_info(&self) -> ScreenInfo {
        self.screen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_targets_in_order() {
        let overlay = MockOverlay::new();

        overlay.set_normalized_target(0.1, 0.2).unwrap();
        overlay.set_normalized_target(0.3, 0.4).unwrap();

        assert_eq!(overlay.targets(), vec![(0.1, 0.2), (0.3, 0.4)]);
    }

    #[test]
    fn test_failing_overlay_records_nothing() {
        let overlay = MockOverlay::failing();

        let result = overlay.set_normalized_target(0.1, 0.2);

        assert_eq!(result, Err(OverlayError::Platform("mock failure".to_string())));
        assert!(overlay.targets().is_empty());
    }

    #[test]
    fn test_custom_screen_is_reported() {
        let screen = ScreenInfo {
            width: 800,
            height: 600,
            dpi_scale: 1.5,
        };
        assert_eq!(MockOverlay::with_screen(screen).screen_info(), screen);
    }
}
