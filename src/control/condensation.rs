//! Condensation guard.
//!
//! Sustained near-saturation humidity condenses on the chamber walls and
//! drowns pins, so once RH has sat at or above the trigger for the minimum
//! duration the guard becomes authoritative over ventilation: fan forced
//! ON, mist forced OFF, bypassing hysteresis and duty admission until the
//! humidity falls back below the trigger.
//!
//! Deactivation has no separate band; the guard releases the moment RH
//! drops below the trigger. Near-boundary flapping is possible and
//! intentional — both transitions are logged so it is visible in the
//! journal rather than masked by an undocumented deadband.

use log::{info, warn};

/// Guard transition reported to the caller for event emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardTransition {
    Activated,
    Deactivated,
}

/// Humidity-duration monitor. One per chamber.
#[derive(Debug)]
pub struct CondensationGuard {
    trigger_rh_pct: f32,
    min_duration_ms: u64,
    /// When RH first reached the trigger, if it is still there.
    above_since_ms: Option<u64>,
    active: bool,
}

impl CondensationGuard {
    pub fn new(trigger_rh_pct: f32, min_duration_ms: u64) -> Self {
        Self {
            trigger_rh_pct,
            min_duration_ms,
            above_since_ms: None,
            active: false,
        }
    }

    /// Feed the cycle's humidity reading. Returns a transition when the
    /// guard flips.
    pub fn update(&mut self, rh_pct: f32, now_ms: u64) -> Option<GuardTransition> {
        if rh_pct >= self.trigger_rh_pct {
            let since = *self.above_since_ms.get_or_insert(now_ms);
            if !self.active && now_ms.saturating_sub(since) >= self.min_duration_ms {
                self.active = true;
                warn!(
                    "condensation guard ACTIVE: RH {:.1}% >= {:.1}% for {}s",
                    rh_pct,
                    self.trigger_rh_pct,
                    now_ms.saturating_sub(since) / 1000
                );
                return Some(GuardTransition::Activated);
            }
        } else {
            self.above_since_ms = None;
            if self.active {
                self.active = false;
                info!(
                    "condensation guard cleared: RH {:.1}% < {:.1}%",
                    rh_pct, self.trigger_rh_pct
                );
                return Some(GuardTransition::Deactivated);
            }
        }
        None
    }

    /// Whether the guard currently forces fan ON / mist OFF.
    pub const fn active(&self) -> bool {
        self.active
    }
}
