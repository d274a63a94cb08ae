//! Port traits — the hexagonal boundary between the control engine and the
//! outside world.
//!
//! ```text
//!   SensorPort ──▶ ┌────────────────────────┐ ──▶ EventSink
//!                  │      ControlEngine      │
//!   RelayPort  ◀── │  hysteresis · duty ·    │ ──▶ SettingsPort
//!                  │  guard · schedule       │
//!                  └────────────────────────┘
//! ```
//!
//! Sensor acquisition, the GPIO relay backend and settings persistence are
//! external collaborators: the engine consumes them via these traits only,
//! so the whole control core runs against mocks on a development host.

use serde::{Deserialize, Serialize};

use crate::chamber::{Relay, RelayState, SensorReading, StageState, TargetSet};
use crate::error::{RelayError, SensorError, StoreError};
use crate::modes::ControlMode;

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → engine)
// ───────────────────────────────────────────────────────────────

/// Read-side port: the engine polls this once per monitoring cycle.
pub trait SensorPort {
    /// Read every environmental sensor and return a unified snapshot.
    fn read_environment(&mut self) -> Result<SensorReading, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: engine → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the engine commands relays through this.
pub trait RelayPort {
    /// Apply a relay state to the physical line.
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (engine → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The engine emits structured [`ControlEvent`](super::events::ControlEvent)s
/// through this port. Adapters decide where they go (journal, BLE
/// notification, test assertion buffer).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::ControlEvent);
}

// ───────────────────────────────────────────────────────────────
// Settings port (engine ↔ persistent settings)
// ───────────────────────────────────────────────────────────────

/// The runtime-writable settings that survive a restart.
///
/// Saved as one blob so a replace is all-or-nothing: a crash mid-save can
/// never leave thresholds from one write paired with a stage from another.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub targets: TargetSet,
    pub stage: StageState,
    pub mode: ControlMode,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        let stage = StageState::default();
        Self {
            targets: TargetSet::default(),
            stage,
            mode: stage.mode.derived_control_mode(),
        }
    }
}

/// Loads and persists the runtime settings.
///
/// Implementations MUST replace the stored blob atomically — no partial
/// write may ever be observable, including across power loss.
pub trait SettingsPort {
    /// Load persisted settings. [`StoreError::NotFound`] on first boot.
    fn load(&self) -> Result<PersistedSettings, StoreError>;

    /// Persist the settings atomically.
    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError>;
}
