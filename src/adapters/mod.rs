//! Adapters — concrete implementations of the port traits.
//!
//! Platform-specific adapters are feature-gated so the control core and
//! protocol logic build and test on any host:
//!
//! - `sim`   — simulated sensors/relays for development and soak runs.
//! - `rpi`   — rppal GPIO relay backend.
//! - `bluez` — BlueZ GATT server + LE advertising.

pub mod clock;
pub mod log_sink;
pub mod store;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(feature = "rpi")]
pub mod gpio;

#[cfg(feature = "bluez")]
pub mod ble;

use log::info;

use crate::app::ports::{RelayPort, SensorPort};
use crate::chamber::{Relay, RelayState, SensorReading};
use crate::error::{RelayError, SensorError};

/// Sensor port stand-in for deployments where the external sensor driver
/// is not wired up. Every poll fails, which the engine surfaces as
/// SENSOR_ERROR while holding the relays in their last known-safe state.
pub struct DisconnectedSensors;

impl SensorPort for DisconnectedSensors {
    fn read_environment(&mut self) -> Result<SensorReading, SensorError> {
        Err(SensorError::NotAttached)
    }
}

/// Relay port that only journals transitions. Used when no GPIO backend
/// is compiled in.
pub struct LogRelays;

impl RelayPort for LogRelays {
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError> {
        info!("relay {} -> {:?} (no GPIO backend)", relay.name(), state);
        Ok(())
    }
}

/// Glue for deployments where sensors and relays come from different
/// adapters; satisfies both ports by delegation so the engine still takes
/// a single `hw` argument.
pub struct SplitHardware<S, R> {
    pub sensors: S,
    pub relays: R,
}

impl<S: SensorPort, R> SensorPort for SplitHardware<S, R> {
    fn read_environment(&mut self) -> Result<SensorReading, SensorError> {
        self.sensors.read_environment()
    }
}

impl<S, R: RelayPort> RelayPort for SplitHardware<S, R> {
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError> {
        self.relays.set_relay(relay, state)
    }
}
