//! Thread-safe sequence counter for pointer samples.
//!
//! # What is a sequence number? (for beginners)
//!
//! Every pointer sample carries an increasing integer called a *sequence
//! number*.  A receiver that sees 7 after 9 knows the network reordered the
//! packets and can drop the stale one.  The relay itself never inspects it.
//!
//! The datagram field is 32 bits wide, so the counter wraps from `u32::MAX`
//! back to `0`.  The hub's coordinate frame only keeps the low byte.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU32` internally.  `fetch_add` reads, increments,
//! and writes the value as one indivisible step, so a sampler thread and a
//! keepalive task can share one counter without a lock and never receive the
//! same value twice.

use std::sync::atomic::{AtomicU32, Ordering};

/// A thread-safe, wrapping counter for sample sequence numbers.
///
/// # Examples
///
/// ```rust
/// use kursor_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SequenceCounter {
    inner: AtomicU32,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `start`.
    pub fn starting_at(start: u32) -> Self {
        Self {
            inner: AtomicU32::new(start),
        }
    }

    /// Returns the next sequence number and atomically increments the counter.
    ///
    /// Wraps from `u32::MAX` to 0 without panicking.  `Relaxed` ordering is
    /// enough: the value orders samples, it does not publish memory.
    pub fn next(&self) -> u32 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) would return.
    pub fn current(&self) -> u32 {
        self.inner.load(Ordering::Relaxed)
    }
}
