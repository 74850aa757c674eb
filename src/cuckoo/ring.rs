//! The 256-position interval ring used for aging.
//!
//! Slots store the *ring position* of the interval they were last written in:
//! the raw interval number modulo 256. Ring positions cannot be compared
//! directly once the ring wraps, so comparisons go through the
//! *recency-comparable position*: the ring rotated so that the current
//! interval maps to 255 and the oldest retained interval maps to 0.
//!
//! With `u8` arithmetic both translations are a wrapping add or subtract of
//! the oldest retained position, which is exactly modulo-256 arithmetic.

use serde::{Deserialize, Serialize};

use super::config::MAX_INTERVALS;

/// Ring position of the oldest interval still retained when `current` is
/// the current interval.
pub fn oldest_position(current: u8) -> u8 {
    current.wrapping_add(1)
}

/// Ring position -> recency-comparable position (current maps to 255).
pub fn ring_to_recency(current: u8, position: u8) -> u8 {
    position.wrapping_sub(oldest_position(current))
}

/// Recency-comparable position -> ring position.
pub fn recency_to_ring(current: u8, recency: u8) -> u8 {
    recency.wrapping_add(oldest_position(current))
}

/// Whether `position` lies in the inclusive ring range `start..=end`,
/// which wraps past 255 when `end < start`.
pub fn in_ring_range(start: u8, end: u8, position: u8) -> bool {
    position.wrapping_sub(start) <= end.wrapping_sub(start)
}

/// Aging cursor of an expiring filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalRing {
    /// Ring position of the current interval
    pub current: u8,
    /// Start of the current interval, in whole seconds since the epoch
    pub current_time: u64,
    /// Oldest ring position holding entries, evicted by the next capacity
    /// sweep; `None` when unknown or empty
    pub lru: Option<u8>,
}

impl IntervalRing {
    /// A fresh ring sitting on position 255, so that timestamps from the
    /// epoch onward are inside the retained window.
    pub fn new(interval_seconds: u64) -> Self {
        let current = (MAX_INTERVALS - 1) as u8;
        Self {
            current,
            current_time: current as u64 * interval_seconds,
            lru: None,
        }
    }

    pub fn to_recency(&self, position: u8) -> u8 {
        ring_to_recency(self.current, position)
    }

    pub fn to_ring(&self, recency: u8) -> u8 {
        recency_to_ring(self.current, recency)
    }

    /// Earliest interval start (seconds) that is still inside the window.
    pub fn window_start(&self, interval_seconds: u64) -> u64 {
        self.current_time
            .saturating_sub(interval_seconds * (MAX_INTERVALS as u64 - 1))
    }

    /// Whether `incoming` is strictly more recent than `existing`.
    pub fn is_newer(&self, incoming: u8, existing: u8) -> bool {
        self.to_recency(incoming) > self.to_recency(existing)
    }

    /// Distance in ring positions between two tags.
    pub fn distance(&self, a: u8, b: u8) -> u8 {
        self.to_recency(a).abs_diff(self.to_recency(b))
    }
}
