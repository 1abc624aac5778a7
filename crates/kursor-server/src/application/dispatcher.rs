//! Rate-limited dispatcher for hub coordinate frames.
//!
//! # Why rate-limit? (for beginners)
//!
//! A teacher's mouse can produce hundreds of position updates per second,
//! while the student only needs about one per display frame.  Forwarding every
//! update would waste bandwidth and queue stale positions behind newer ones.
//!
//! The dispatcher therefore keeps one slot per room holding only the
//! **latest** position (last value wins, never a queue).  A single background
//! loop wakes on a fixed tick (16 ms by default), sends each changed slot to
//! the room's student connection as a 5-byte coordinate frame, and marks it
//! clean.  However fast the teacher pushes, the student receives at most one
//! frame per tick.
//!
//! ```text
//! push(x=0.1) push(x=0.2) push(x=0.3) │ tick │ → student receives x=0.3
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use kursor_core::{CoordsFrame, HubOutbound, Role, SessionToken};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::application::connections::EventSink;
use crate::application::metrics::Metrics;
use crate::application::room_registry::RoomRegistry;

/// Latest position for one room.
#[derive(Debug, Clone, Copy)]
struct Slot {
    x: u16,
    y: u16,
    seq: u32,
    dirty: bool,
    pushed_at: Instant,
}

/// Buffers the latest quantized position per room and flushes it on a tick.
///
/// Slots are keyed by the room's teacher token.
pub struct Dispatcher {
    registry: Arc<RoomRegistry>,
    sink: Arc<dyn EventSink>,
    metrics: Arc<dyn Metrics>,
    interval: Duration,
    slots: DashMap<SessionToken, Slot>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<RoomRegistry>,
        sink: Arc<dyn EventSink>,
        metrics: Arc<dyn Metrics>,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            sink,
            metrics,
            interval,
            slots: DashMap::new(),
        }
    }

    /// Stores `(x, y)` as the room's latest position and marks it dirty.
    ///
    /// The coordinates are already quantized.  The room's sequence number
    /// increments (wrapping) on every push, so the first frame carries 1.
    pub fn push(&self, room: SessionToken, x: u16, y: u16) {
        let now = Instant::now();
        self.slots
            .entry(room)
            .and_modify(|slot| {
                slot.x = x;
                slot.y = y;
                slot.seq = slot.seq.wrapping_add(1);
                slot.dirty = true;
                slot.pushed_at = now;
            })
            .or_insert(Slot {
                x,
                y,
                seq: 1,
                dirty: true,
                pushed_at: now,
            });
    }

    /// Sends every dirty slot once.  Returns the number of frames queued.
    ///
    /// Slots whose room no longer exists are dropped, sent or not.  Slots
    /// whose room has no student connection stay dirty until one joins.
    pub fn flush_once(&self) -> usize {
        let mut stale = Vec::new();
        let mut sent = 0;

        for mut entry in self.slots.iter_mut() {
            let token = *entry.key();
            let Some(room) = self.registry.resolve_by_token(&token) else {
                stale.push(token);
                continue;
            };
            if !entry.dirty {
                continue;
            }
            let Some(student) = room.connection(Role::Student) else {
                continue;
            };

            let slot = entry.value_mut();
            slot.dirty = false;
            let frame = CoordsFrame {
                seq_low: (slot.seq & 0xFF) as u8,
                x: slot.x,
                y: slot.y,
            };
            match self.sink.send(student, HubOutbound::Coords(frame)) {
                Ok(()) => {
                    sent += 1;
                    self.metrics.record_dispatch();
                    self.metrics
                        .observe_dispatch_latency(slot.pushed_at.elapsed().as_secs_f64() * 1000.0);
                }
                Err(e) => {
                    debug!(room = %room.id(), "coordinate dispatch failed: {e}");
                    self.metrics.record_dispatch_error();
                }
            }
        }

        for token in stale {
            self.slots.remove(&token);
        }
        sent
    }

    /// Number of rooms with a buffered position.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Runs the flush loop until `cancel` fires.
    ///
    /// Each iteration subtracts its own running time from the interval before
    /// sleeping, so the cadence stays close to the target under load.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        info!(interval_ms = self.interval.as_millis() as u64, "coordinate dispatcher started");
        loop {
            let started = Instant::now();
            self.flush_once();
            let pause = self.interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
        info!("coordinate dispatcher stopped");
    }
}
