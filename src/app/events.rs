//! Outbound engine events and published state snapshots.
//!
//! The engine emits [`ControlEvent`]s through the
//! [`EventSink`](super::ports::EventSink) port and publishes a
//! [`ChamberSnapshot`] once per cycle for the protocol layer to serve
//! reads and notifications from.

use crate::chamber::{
    GrowthStage, ReasonCode, Relay, RelayState, SensorReading, Species, StageMode, StageState,
    TargetSet,
};
use crate::modes::{ControlMode, OverrideBits};
use crate::status::{ActuatorStatus, StatusFlags};

/// Structured events emitted by the control engine.
#[derive(Debug, Clone, Copy)]
pub enum ControlEvent {
    /// The engine has started (carries the restored control mode).
    Started { mode: ControlMode },

    /// A relay transition was applied.
    RelaySwitched {
        relay: Relay,
        from: RelayState,
        to: RelayState,
        reason: ReasonCode,
    },

    /// The control mode changed.
    ModeChanged { from: ControlMode, to: ControlMode },

    /// Emergency stop engaged (all relays forced OFF this cycle).
    EmergencyStop,

    /// Emergency stop cleared; normal arbitration resumed.
    EmergencyCleared { restored: ControlMode },

    /// Condensation guard became authoritative over fan/mist.
    GuardActivated { rh_pct: f32 },

    /// Condensation guard released.
    GuardCleared,

    /// Lamp output contradicts the commanded light state (rate-limited).
    LightVerifyFailed { commanded: RelayState, raw: u16 },

    /// A new threshold set is active.
    TargetsUpdated,

    /// A new cultivation stage is active.
    StageUpdated {
        species: Species,
        stage: GrowthStage,
        mode: StageMode,
    },

    /// A new override word is active.
    OverridesUpdated { bits: OverrideBits },

    /// The sensor poll failed this cycle; relays hold their last state.
    SensorFault,

    /// Per-cycle telemetry snapshot.
    Telemetry(TelemetrySnapshot),
}

/// A point-in-time telemetry record suitable for logging or transmission.
#[derive(Debug, Clone, Copy)]
pub struct TelemetrySnapshot {
    pub temp_c: f32,
    pub rh_pct: f32,
    pub co2_ppm: u16,
    pub light_raw: u16,
    pub mode: ControlMode,
    pub relay_bits: u16,
    pub status_bits: u32,
}

/// Everything the protocol layer needs to answer reads, replaced whole
/// once per monitoring cycle (single-writer, atomic replace).
#[derive(Debug, Clone, Copy)]
pub struct ChamberSnapshot {
    /// Last successful sensor poll, if any.
    pub reading: Option<SensorReading>,
    pub targets: TargetSet,
    pub stage: StageState,
    pub mode: ControlMode,
    pub status: StatusFlags,
    pub actuators: ActuatorStatus,
}

impl Default for ChamberSnapshot {
    fn default() -> Self {
        Self {
            reading: None,
            targets: TargetSet::default(),
            stage: StageState::default(),
            mode: ControlMode::Automatic,
            status: StatusFlags::empty(),
            actuators: ActuatorStatus::new(),
        }
    }
}
