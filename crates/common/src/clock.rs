//! Clock and presentation-timestamp utilities.
//!
//! The output timeline of a recording is zero-based: the first accepted
//! video frame defines the anchor, and every later buffer is stamped
//! relative to it. This module provides:
//! - The recording clock (monotonic epoch + wall-clock label)
//! - The first-writer-wins PTS anchor
//! - A rate controller for paced frame production

use std::time::Instant;

/// A recording clock that provides monotonic timestamps relative to
/// a fixed epoch (the moment the producer started).
#[derive(Debug, Clone)]
pub struct RecordingClock {
    /// The instant the clock was started.
    epoch: Instant,

    /// Wall-clock time at epoch (ISO 8601 string).
    epoch_wall: String,
}

impl RecordingClock {
    /// Create a new recording clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Get nanoseconds elapsed since the clock started.
    pub fn elapsed_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Get seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }

    /// Convert an elapsed nanosecond value to seconds.
    pub fn ns_to_secs(ns: u64) -> f64 {
        ns as f64 / 1_000_000_000.0
    }

    /// Convert seconds to nanoseconds.
    pub fn secs_to_ns(secs: f64) -> u64 {
        (secs * 1_000_000_000.0) as u64
    }
}

/// First-writer-wins latch for the session start timestamp.
///
/// The anchor is set from the first timestamp it observes; every
/// subsequent timestamp is returned relative to it. Producers with
/// per-channel monotonic timestamps therefore get a monotonic,
/// zero-based output timeline.
#[derive(Debug, Default, Clone, Copy)]
pub struct PtsAnchor {
    start_ns: Option<u64>,
}

impl PtsAnchor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the anchor has been latched yet.
    pub fn is_anchored(&self) -> bool {
        self.start_ns.is_some()
    }

    /// Latch the anchor if unset and return the timestamp relative to it.
    ///
    /// The first call always returns 0. Timestamps earlier than the
    /// anchor saturate to 0 rather than going negative.
    pub fn relative_ns(&mut self, source_pts_ns: u64) -> u64 {
        let start = *self.start_ns.get_or_insert(source_pts_ns);
        source_pts_ns.saturating_sub(start)
    }

    /// Relative timestamp without latching. `None` until anchored.
    pub fn peek_relative_ns(&self, source_pts_ns: u64) -> Option<u64> {
        self.start_ns.map(|start| source_pts_ns.saturating_sub(start))
    }
}

/// Frame rate controller for paced frame production.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}
