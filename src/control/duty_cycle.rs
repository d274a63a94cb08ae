//! Rolling-window duty-cycle accounting and admission control.
//!
//! Tracks the ON intervals of one rate-limited actuator over a trailing
//! window and refuses new ON transitions once the on-time fraction reaches
//! the cap. Admission control only: an actuator that is already ON is never
//! forced OFF by this tracker.

use std::collections::VecDeque;

/// One ON interval. `end` is `None` while the actuator is still on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OnInterval {
    start_ms: u64,
    end_ms: Option<u64>,
}

/// Rolling on-time tracker for a single actuator.
#[derive(Debug)]
pub struct DutyCycleTracker {
    window_ms: u64,
    /// Cap on the on-time fraction, percent. `None` = uncapped.
    cap_pct: Option<f32>,
    intervals: VecDeque<OnInterval>,
}

impl DutyCycleTracker {
    pub fn new(window_ms: u64, cap_pct: Option<f32>) -> Self {
        debug_assert!(window_ms > 0);
        Self {
            window_ms,
            cap_pct,
            intervals: VecDeque::new(),
        }
    }

    /// Whether an ON transition is admissible at `now`.
    pub fn can_turn_on(&mut self, now_ms: u64) -> bool {
        match self.cap_pct {
            None => true,
            Some(cap) => self.on_time_percent(now_ms) < cap,
        }
    }

    /// Record a commanded transition. ON opens a new interval, OFF closes
    /// the open one. Redundant transitions are ignored.
    pub fn record(&mut self, now_ms: u64, on: bool) {
        let open = self.intervals.back().is_some_and(|iv| iv.end_ms.is_none());
        if on && !open {
            self.intervals.push_back(OnInterval {
                start_ms: now_ms,
                end_ms: None,
            });
        } else if !on && open {
            if let Some(iv) = self.intervals.back_mut() {
                iv.end_ms = Some(now_ms);
            }
        }
    }

    /// ON-time fraction over the trailing window, percent. Intervals are
    /// clipped at the window start; a still-open interval is truncated at
    /// `now`. Prunes intervals fully outside the window as a side effect.
    pub fn on_time_percent(&mut self, now_ms: u64) -> f32 {
        let window_start = now_ms.saturating_sub(self.window_ms);

        while let Some(front) = self.intervals.front() {
            match front.end_ms {
                Some(end) if end <= window_start => {
                    self.intervals.pop_front();
                }
                _ => break,
            }
        }

        let mut on_ms: u64 = 0;
        for iv in &self.intervals {
            let start = iv.start_ms.max(window_start);
            let end = iv.end_ms.unwrap_or(now_ms).min(now_ms);
            on_ms += end.saturating_sub(start);
        }

        (on_ms as f32 / self.window_ms as f32) * 100.0
    }
}
