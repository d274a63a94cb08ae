//! Light-output verification.
//!
//! The schedule itself is a pure computation on [`LightSchedule`]; this
//! module cross-checks the commanded lamp state against the photoresistor.
//! A burned-out lamp or a stuck relay shows up as a persistent mismatch,
//! which would otherwise flood the journal — failure alerts are therefore
//! rate-limited to one per window no matter how many cycles the fault
//! persists.

use log::warn;

use crate::chamber::RelayState;

/// Outcome of one verification check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Reading agrees with the commanded state.
    Ok,
    /// Lamp commanded ON but the chamber reads dark.
    DarkWhileOn { raw: u16 },
    /// Lamp commanded OFF but the chamber reads lit.
    LitWhileOff { raw: u16 },
    /// Too soon after the last transition to judge (lamp warm-up/cool-down).
    Settling,
}

impl VerifyOutcome {
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::DarkWhileOn { .. } | Self::LitWhileOff { .. })
    }
}

/// Photoresistor cross-check with alert rate limiting.
#[derive(Debug)]
pub struct LightVerifier {
    settle_ms: u64,
    on_threshold: u16,
    off_threshold: u16,
    alert_window_ms: u64,
    last_alert_ms: Option<u64>,
}

impl LightVerifier {
    pub fn new(settle_ms: u64, on_threshold: u16, off_threshold: u16, alert_window_ms: u64) -> Self {
        Self {
            settle_ms,
            on_threshold,
            off_threshold,
            alert_window_ms,
            last_alert_ms: None,
        }
    }

    /// Check the commanded state against the raw photoresistor level.
    ///
    /// `last_change_ms` is when the light relay last switched; readings
    /// inside the settle window are not judged.
    pub fn check(
        &self,
        commanded: RelayState,
        raw: u16,
        last_change_ms: u64,
        now_ms: u64,
    ) -> VerifyOutcome {
        if now_ms.saturating_sub(last_change_ms) < self.settle_ms {
            return VerifyOutcome::Settling;
        }
        match commanded {
            RelayState::On if raw < self.on_threshold => VerifyOutcome::DarkWhileOn { raw },
            RelayState::Off if raw > self.off_threshold => VerifyOutcome::LitWhileOff { raw },
            _ => VerifyOutcome::Ok,
        }
    }

    /// Admit at most one alert per window. Returns whether the caller
    /// should emit this failure.
    pub fn admit_alert(&mut self, now_ms: u64) -> bool {
        match self.last_alert_ms {
            Some(last) if now_ms.saturating_sub(last) < self.alert_window_ms => false,
            _ => {
                self.last_alert_ms = Some(now_ms);
                true
            }
        }
    }

    /// Convenience wrapper: check, log an admitted failure, and report
    /// whether verification failed this cycle (admitted or not).
    pub fn verify(
        &mut self,
        commanded: RelayState,
        raw: u16,
        last_change_ms: u64,
        now_ms: u64,
    ) -> (VerifyOutcome, bool) {
        let outcome = self.check(commanded, raw, last_change_ms, now_ms);
        let mut alert = false;
        if outcome.is_failure() && self.admit_alert(now_ms) {
            alert = true;
            match outcome {
                VerifyOutcome::DarkWhileOn { raw } => {
                    warn!("light verify failed: commanded ON, photoresistor {raw} below threshold");
                }
                VerifyOutcome::LitWhileOff { raw } => {
                    warn!("light verify failed: commanded OFF, photoresistor {raw} above threshold");
                }
                _ => {}
            }
        }
        (outcome, alert)
    }
}
