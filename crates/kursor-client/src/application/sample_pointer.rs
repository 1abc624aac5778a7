//! Fixed-rate pointer sampling on the teacher side.
//!
//! # Why sample instead of sending every move? (for beginners)
//!
//! Operating systems report mouse moves as fast as the mouse produces them,
//! often 500–1000 times per second with a gaming mouse.  Sending each one
//! would flood the network with positions the student can never display.
//!
//! The [`PointerSampler`] decouples the two rates:
//!
//! - The input handler calls [`PointerSampler::record`] on every move, from
//!   any thread.  It only overwrites one slot.
//! - A send loop calls [`PointerSampler::tick`] at a fixed rate (60 Hz by
//!   default).  If the latest position moved noticeably since the last send,
//!   it is handed to a [`PositionSink`].
//!
//! ```text
//! input thread:  record record record record record record
//! send loop:          tick            tick            tick
//!                      └─ emit         └─ emit         └─ (unchanged)
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kursor_core::protocol::messages::clamp_unit;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default send period: 60 Hz.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(16);

/// Movements smaller than this on both axes are not sent.
pub const DEFAULT_CHANGE_THRESHOLD: f32 = 0.001;

/// Error returned by a [`PositionSink`].
#[derive(Debug, Error)]
#[error("position sink failed: {0}")]
pub struct SinkError(pub String);

/// Something that can carry a normalized position to the student.
///
/// Implemented by the datagram session and the hub client.
#[async_trait]
pub trait PositionSink: Send + Sync {
    async fn send_position(&self, x: f32, y: f32) -> Result<(), SinkError>;
}

/// Holds the latest pointer position and decides when to emit it.
#[derive(Debug)]
pub struct PointerSampler {
    latest: Mutex<Option<(f32, f32)>>,
    last_sent: Mutex<Option<(f32, f32)>>,
    interval: Duration,
    threshold: f32,
}

impl Default for PointerSampler {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_INTERVAL, DEFAULT_CHANGE_THRESHOLD)
    }
}

impl PointerSampler {
    pub fn new(interval: Duration, threshold: f32) -> Self {
        Self {
            latest: Mutex::new(None),
            last_sent: Mutex::new(None),
            interval,
            threshold,
        }
    }

    /// Stores a normalized position.  Values are clamped to `[0, 1]`.
    pub fn record(&self, x: f32, y: f32) {
        *self.latest.lock() = Some((clamp_unit(x), clamp_unit(y)));
    }

    /// Stores a pixel position inside a `width` × `height` surface.
    ///
    /// Ignored while the surface has no area (e.g. a minimized window).
    pub fn record_pixels(&self, px: f64, py: f64, width: f64, height: f64) {
        if width <= 0.0 || height <= 0.0 {
            return;
        }
        self.record((px / width) as f32, (py / height) as f32);
    }

    /// Returns the position to send now, if it changed enough since the last
    /// one, and marks it as sent.
    pub fn take_changed(&self) -> Option<(f32, f32)> {
        let current = (*self.latest.lock())?;
        let mut last_sent = self.last_sent.lock();
        if let Some((lx, ly)) = *last_sent {
            if (current.0 - lx).abs() < self.threshold && (current.1 - ly).abs() < self.threshold {
                return None;
            }
        }
        *last_sent = Some(current);
        Some(current)
    }

    /// Runs one sampling step against `sink`.  Returns `true` if a position
    /// was sent.
    pub async fn tick(&self, sink: &dyn PositionSink) -> bool {
        let Some((x, y)) = self.take_changed() else {
            return false;
        };
        match sink.send_position(x, y).await {
            Ok(()) => true,
            Err(e) => {
                debug!("position send failed: {e}");
                // Let the next tick retry the same position.
                *self.last_sent.lock() = None;
                false
            }
        }
    }

    /// Calls [`tick`](Self::tick) every interval until `cancel` fires.
    pub async fn run(self: Arc<Self>, sink: Arc<dyn PositionSink>, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick(sink.as_ref()).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        sent: Mutex<Vec<(f32, f32)>>,
        fail: bool,
    }

    #[async_trait]
    impl PositionSink for RecordingSink {
        async fn send_position(&self, x: f32, y: f32) -> Result<(), SinkError> {
            if self.fail {
                return Err(SinkError("offline".into()));
            }
            self.sent.lock().push((x, y));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_only_latest_of_many_records_is_sent() {
        // Arrange
        let sampler = PointerSampler::default();
        let sink = RecordingSink::default();

        // Act
        sampler.record(0.1, 0.1);
        sampler.record(0.2, 0.2);
        sampler.record(0.3, 0.4);
        let sent = sampler.tick(&sink).await;

        // Assert
        assert!(sent);
        assert_eq!(*sink.sent.lock(), vec![(0.3, 0.4)]);
    }

    #[tokio::test]
    async fn test_nothing_is_sent_before_first_record() {
        let sampler = PointerSampler::default();
        let sink = RecordingSink::default();
        assert!(!sampler.tick(&sink).await);
    }

    #[tokio::test]
    async fn test_unchanged_or_tiny_moves_are_not_resent() {
        let sampler = PointerSampler::default();
        let sink = RecordingSink::default();

        sampler.record(0.5, 0.5);
        sampler.tick(&sink).await;
        sampler.record(0.5005, 0.5);
        let tiny = sampler.tick(&sink).await;
        sampler.record(0.6, 0.5);
        let real = sampler.tick(&sink).await;

        assert!(!tiny);
        assert!(real);
        assert_eq!(*sink.sent.lock(), vec![(0.5, 0.5), (0.6, 0.5)]);
    }

    #[tokio::test]
    async fn test_failed_send_is_retried_on_next_tick() {
        // Arrange
        let sampler = PointerSampler::default();
        let broken = RecordingSink {
            fail: true,
            ..Default::default()
        };
        let working = RecordingSink::default();
        sampler.record(0.3, 0.3);

        // Act
        let first = sampler.tick(&broken).await;
        let second = sampler.tick(&working).await;

        // Assert
        assert!(!first);
        assert!(second);
        assert_eq!(*working.sent.lock(), vec![(0.3, 0.3)]);
    }

    #[test]
    fn test_record_pixels_normalizes_and_clamps() {
        let sampler = PointerSampler::default();

        sampler.record_pixels(960.0, 270.0, 1920.0, 1080.0);
        assert_eq!(sampler.take_changed(), Some((0.5, 0.25)));

        sampler.record_pixels(5000.0, -10.0, 1920.0, 1080.0);
        assert_eq!(sampler.take_changed(), Some((1.0, 0.0)));
    }

    #[test]
    fn test_record_pixels_ignores_empty_surface() {
        let sampler = PointerSampler::default();
        sampler.record_pixels(10.0, 10.0, 0.0, 100.0);
        assert_eq!(sampler.take_changed(), None);
    }

    #[tokio::test]
    async fn test_run_loop_emits_and_stops_on_cancel() {
        // Arrange
        let sampler = Arc::new(PointerSampler::new(Duration::from_millis(5), DEFAULT_CHANGE_THRESHOLD));
        let sink = Arc::new(RecordingSink::default());
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(Arc::clone(&sampler).run(sink.clone(), cancel.clone()));

        // Act
        sampler.record(0.7, 0.8);
        for _ in 0..100 {
            if !sink.sent.lock().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        cancel.cancel();

        // Assert
        assert_eq!(*sink.sent.lock(), vec![(0.7, 0.8)]);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("sampler did not stop")
            .unwrap();
    }
}
