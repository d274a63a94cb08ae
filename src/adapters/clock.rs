//! Wall/monotonic clock adapter.
//!
//! Produces the [`Clock`] samples the engine threads through each cycle:
//! `std::time::Instant` for monotonic interval math, `SystemTime` for
//! wall-clock timestamps. Tests construct `Clock` values directly instead.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::chamber::Clock;

pub struct WallClock {
    start: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Sample both clocks. A wall clock before the epoch (badly skewed
    /// RTC) reads as 0 rather than panicking.
    pub fn now(&self) -> Clock {
        let uptime_ms = self.start.elapsed().as_millis() as u64;
        let unix_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Clock::new(uptime_ms, unix_secs)
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}
