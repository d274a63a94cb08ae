//! Status bitfields published over the protocol.
//!
//! Both fields are recomputed from scratch every monitoring cycle, so a
//! stale bit can never outlive the condition that raised it.

use crate::chamber::{ReasonCode, Relay, RelayState};

// ───────────────────────────────────────────────────────────────
// System status flags
// ───────────────────────────────────────────────────────────────

/// System-level status word (Status Flags characteristic, u32 LE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(u32);

impl StatusFlags {
    pub const SENSOR_ERROR: u32 = 1 << 0;
    pub const CONTROL_ERROR: u32 = 1 << 1;
    pub const STAGE_READY: u32 = 1 << 2;
    pub const THRESHOLD_ALARM: u32 = 1 << 3;
    pub const CONNECTIVITY: u32 = 1 << 4;
    pub const SIMULATION: u32 = 1 << 7;

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn from_bits(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }

    /// Set or clear a flag based on a condition.
    pub fn assign(&mut self, flag: u32, condition: bool) {
        if condition {
            self.0 |= flag;
        } else {
            self.0 &= !flag;
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator status
// ───────────────────────────────────────────────────────────────

/// Live relay states plus the last reason code per actuator
/// (Actuator Status characteristic: u16 state bits + 4 reason bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorStatus {
    state_bits: u16,
    /// Reason bytes indexed by [`Relay::index`] (light, fan, mist, heater).
    reasons: [ReasonCode; Relay::COUNT],
}

impl ActuatorStatus {
    pub fn new() -> Self {
        Self {
            state_bits: 0,
            reasons: [ReasonCode::Startup; Relay::COUNT],
        }
    }

    pub fn set_state(&mut self, relay: Relay, state: RelayState) {
        if state.is_on() {
            self.state_bits |= relay.bit();
        } else {
            self.state_bits &= !relay.bit();
        }
    }

    pub fn set_reason(&mut self, relay: Relay, reason: ReasonCode) {
        self.reasons[relay.index()] = reason;
    }

    pub fn state(&self, relay: Relay) -> RelayState {
        RelayState::from_bool(self.state_bits & relay.bit() != 0)
    }

    pub fn reason(&self, relay: Relay) -> ReasonCode {
        self.reasons[relay.index()]
    }

    pub const fn state_bits(&self) -> u16 {
        self.state_bits
    }

    /// Reason bytes in wire order (light, fan, mist, heater).
    pub fn reason_bytes(&self) -> [u8; Relay::COUNT] {
        [
            self.reasons[Relay::Light.index()] as u8,
            self.reasons[Relay::Fan.index()] as u8,
            self.reasons[Relay::Mist.index()] as u8,
            self.reasons[Relay::Heater.index()] as u8,
        ]
    }
}

impl Default for ActuatorStatus {
    fn default() -> Self {
        Self::new()
    }
}
