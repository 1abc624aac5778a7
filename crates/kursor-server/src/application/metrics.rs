//! Relay metrics.
//!
//! Components report through the [`Metrics`] trait and never know which
//! implementation they hold.  `main.rs` picks one from configuration:
//!
//! - [`NoopMetrics`] (the default) discards everything.
//! - [`SimpleMetrics`] keeps atomic counters and the last
//!   [`LATENCY_SAMPLES`] dispatch latencies, and renders them as plain
//!   `name value` lines for `GET /metrics`.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Number of dispatch-latency samples [`SimpleMetrics`] retains.
pub const LATENCY_SAMPLES: usize = 1000;

/// Counters and gauges reported by the relay components.
pub trait Metrics: Send + Sync {
    /// A teacher position was accepted by the hub.
    fn record_push(&self);
    /// A coordinate frame was queued for a student.
    fn record_dispatch(&self);
    /// Queuing a coordinate frame failed.
    fn record_dispatch_error(&self);
    /// A cursor datagram was forwarded.
    fn record_forward(&self);
    /// A datagram was dropped.
    fn record_drop(&self);
    /// Time from push to dispatch, in milliseconds.
    fn observe_dispatch_latency(&self, ms: f64);
    /// Current number of live rooms.
    fn set_rooms(&self, count: usize);
    /// Text exposition for `GET /metrics`.
    fn render_text(&self) -> String;
}

/// Discards every observation.
#[derive(Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn record_push(&self) {}
    fn record_dispatch(&self) {}
    fn record_dispatch_error(&self) {}
    fn record_forward(&self) {}
    fn record_drop(&self) {}
    fn observe_dispatch_latency(&self, _ms: f64) {}
    fn set_rooms(&self, _count: usize) {}

    fn render_text(&self) -> String {
        "# metrics disabled\n".to_string()
    }
}

/// In-process counters with a bounded latency window.
#[derive(Debug, Default)]
pub struct SimpleMetrics {
    pushes: AtomicU64,
    dispatched: AtomicU64,
    dispatch_errors: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
    rooms: AtomicU64,
    latencies: Mutex<VecDeque<f64>>,
}

impl SimpleMetrics {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Metrics for SimpleMetrics {
    fn record_push(&self) {
        self.pushes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    fn record_dispatch_error(&self) {
        self.dispatch_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_forward(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    fn record_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    fn observe_dispatch_latency(&self, ms: f64) {
        let mut window = self.latencies.lock();
        if window.len() == LATENCY_SAMPLES {
            window.pop_front();
        }
        window.push_back(ms);
    }

    fn set_rooms(&self, count: usize) {
        self.rooms.store(count as u64, Ordering::Relaxed);
    }

    fn render_text(&self) -> String {
        let mut out = String::new();
        let counters = [
            ("kursor_push_total", &self.pushes),
            ("kursor_dispatched_total", &self.dispatched),
            ("kursor_dispatch_errors_total", &self.dispatch_errors),
            ("kursor_udp_forwarded_total", &self.forwarded),
            ("kursor_udp_dropped_total", &self.dropped),
            ("kursor_rooms_current", &self.rooms),
        ];
        for (name, value) in counters {
            let _ = writeln!(out, "{name} {}", value.load(Ordering::Relaxed));
        }

        let window = self.latencies.lock();
        if !window.is_empty() {
            let sum: f64 = window.iter().sum();
            let min = window.iter().copied().fold(f64::INFINITY, f64::min);
            let max = window.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let _ = writeln!(out, "kursor_dispatch_latency_ms_avg {:.3}", sum / window.len() as f64);
            let _ = writeln!(out, "kursor_dispatch_latency_ms_min {min:.3}");
            let _ = writeln!(out, "kursor_dispatch_latency_ms_max {max:.3}");
        }
        let _ = writeln!(out, "kursor_dispatch_latency_samples {}", window.len());
        out
    }
}
