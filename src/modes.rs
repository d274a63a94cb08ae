//! Stage/control mode derivation and the manual-override bitfield.
//!
//! The override word is the single client-facing knob that can take the
//! chamber out of automatic control, so decoding is strict: any reserved
//! bit rejects the whole write and the previous word stays in force.
//!
//! Mode priority, highest first:
//!
//! 1. bit 15 EMERGENCY_STOP  → `ControlMode::Safety`, all relays OFF
//! 2. bits 0–3 per-actuator  → that relay is held, mode unaffected
//! 3. bit 7 DISABLE_AUTO     → `ControlMode::Manual`
//! 4. otherwise              → mode derived from the stage mode

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::chamber::{Relay, StageMode};
use crate::error::ProtocolError;

// ───────────────────────────────────────────────────────────────
// Control mode
// ───────────────────────────────────────────────────────────────

/// Internal control state derived from the stage mode and override word.
/// Persisted across restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ControlMode {
    Automatic = 0,
    Manual = 1,
    Safety = 2,
}

impl StageMode {
    /// The control mode a stage mode maps to when no override bit holds a
    /// different one. FULL and SEMI differ only in stage advancement,
    /// which is not a control concern.
    pub const fn derived_control_mode(self) -> ControlMode {
        match self {
            Self::Full | Self::Semi => ControlMode::Automatic,
            Self::Manual => ControlMode::Manual,
        }
    }
}

impl fmt::Display for ControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => write!(f, "AUTOMATIC"),
            Self::Manual => write!(f, "MANUAL"),
            Self::Safety => write!(f, "SAFETY"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Override bitfield
// ───────────────────────────────────────────────────────────────

/// Validated 16-bit manual-override word.
///
/// Construction goes through [`OverrideBits::from_wire`], which rejects any
/// set reserved bit, so a value of this type is always well-formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OverrideBits(u16);

impl OverrideBits {
    pub const LIGHT: u16 = 1 << 0;
    pub const FAN: u16 = 1 << 1;
    pub const MIST: u16 = 1 << 2;
    pub const HEATER: u16 = 1 << 3;
    pub const DISABLE_AUTO: u16 = 1 << 7;
    pub const EMERGENCY_STOP: u16 = 1 << 15;

    /// Every bit with a defined meaning; the complement is reserved.
    pub const KNOWN_MASK: u16 = Self::LIGHT
        | Self::FAN
        | Self::MIST
        | Self::HEATER
        | Self::DISABLE_AUTO
        | Self::EMERGENCY_STOP;

    /// No overrides active.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Decode a wire value, rejecting reserved bits.
    pub fn from_wire(raw: u16) -> Result<Self, ProtocolError> {
        if raw & !Self::KNOWN_MASK != 0 {
            return Err(ProtocolError::ReservedBits);
        }
        Ok(Self(raw))
    }

    /// Construct from known-good bits. Debug-asserts the invariant rather
    /// than re-validating on every internal use.
    pub fn from_bits_truncate(raw: u16) -> Self {
        debug_assert_eq!(raw & !Self::KNOWN_MASK, 0);
        Self(raw & Self::KNOWN_MASK)
    }

    pub const fn bits(self) -> u16 {
        self.0
    }

    pub const fn emergency_stop(self) -> bool {
        self.0 & Self::EMERGENCY_STOP != 0
    }

    pub const fn disable_auto(self) -> bool {
        self.0 & Self::DISABLE_AUTO != 0
    }

    /// Whether the given relay is under a per-actuator manual hold.
    pub const fn holds(self, relay: Relay) -> bool {
        self.0 & relay.bit() != 0
    }

    /// True if any per-actuator hold bit is set.
    pub const fn any_hold(self) -> bool {
        self.0 & (Self::LIGHT | Self::FAN | Self::MIST | Self::HEATER) != 0
    }

    /// Resolve the control mode under this override word.
    ///
    /// Bits 0–3 deliberately do not influence the mode: they scope to their
    /// actuator only, while bits 7 and 15 hold a mode system-wide.
    pub const fn control_mode(self, stage_mode: StageMode) -> ControlMode {
        if self.emergency_stop() {
            ControlMode::Safety
        } else if self.disable_auto() {
            ControlMode::Manual
        } else {
            stage_mode.derived_control_mode()
        }
    }

    /// Whether this word pins the control mode regardless of stage mode
    /// (bits 7 or 15). Used when a stage write tries to re-derive the mode.
    pub const fn pins_mode(self) -> bool {
        self.emergency_stop() || self.disable_auto()
    }
}

impl fmt::Display for OverrideBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
