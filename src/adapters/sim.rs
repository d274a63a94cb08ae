//! Simulated chamber for local development.
//!
//! Models the environment well enough to exercise the whole control loop
//! closed-loop on a workstation:
//!
//! - Temporal coherence via random walk with mean reversion
//! - Per-reading sensor noise
//! - Actuator response: fan vents heat/CO₂/humidity, mist raises RH,
//!   heater raises temperature, light drives the photoresistor
//!
//! One `SimChamber` satisfies both [`SensorPort`] and [`RelayPort`], so it
//! drops into the engine exactly where real hardware would.

use log::debug;

use crate::app::ports::{RelayPort, SensorPort};
use crate::chamber::{Relay, RelayState, SensorReading};
use crate::error::{RelayError, SensorError};

/// Approximate a sample from N(0,1): sum of 12 uniforms minus 6.
fn approx_std_normal() -> f32 {
    let mut sum: f32 = 0.0;
    for _ in 0..12 {
        sum += fastrand::f32();
    }
    sum - 6.0
}

fn gaussian(mean: f32, sigma: f32) -> f32 {
    mean + sigma * approx_std_normal()
}

/// Stateful chamber simulator.
pub struct SimChamber {
    temp_c: f32,
    rh_pct: f32,
    co2_ppm: f32,
    relays: [RelayState; Relay::COUNT],
    ticks: u32,
}

impl SimChamber {
    pub fn new() -> Self {
        Self {
            temp_c: 21.0,
            rh_pct: 88.0,
            co2_ppm: 800.0,
            relays: [RelayState::Off; Relay::COUNT],
            ticks: 0,
        }
    }

    fn relay_on(&self, relay: Relay) -> bool {
        self.relays[relay.index()].is_on()
    }

    /// Advance the environment one tick under the current relay states.
    fn evolve(&mut self) {
        // Mean reversion toward ambient, plus metabolic drift: the
        // mycelium exhales CO₂ and moisture, the room leaks heat in.
        self.temp_c += 0.05 * (22.0 - self.temp_c) + 0.05 + gaussian(0.0, 0.08);
        self.rh_pct += 0.10 + gaussian(0.0, 0.25);
        self.co2_ppm += 12.0 + gaussian(0.0, 8.0);

        if self.relay_on(Relay::Fan) {
            self.temp_c -= 0.25;
            self.rh_pct -= 1.2;
            self.co2_ppm -= 60.0;
        }
        if self.relay_on(Relay::Mist) {
            self.rh_pct += 2.5;
        }
        if self.relay_on(Relay::Heater) {
            self.temp_c += 0.4;
        }

        self.temp_c = self.temp_c.clamp(5.0, 45.0);
        self.rh_pct = self.rh_pct.clamp(20.0, 100.0);
        self.co2_ppm = self.co2_ppm.clamp(400.0, 10_000.0);
        self.ticks += 1;
    }
}

impl Default for SimChamber {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for SimChamber {
    fn read_environment(&mut self) -> Result<SensorReading, SensorError> {
        self.evolve();
        // The photoresistor tracks the lamp with a little noise.
        let light_raw = if self.relay_on(Relay::Light) {
            (520.0 + gaussian(0.0, 30.0)).clamp(0.0, 1023.0) as u16
        } else {
            (12.0 + gaussian(0.0, 6.0)).clamp(0.0, 1023.0) as u16
        };
        Ok(SensorReading {
            temp_c: self.temp_c + gaussian(0.0, 0.05),
            rh_pct: (self.rh_pct + gaussian(0.0, 0.2)).clamp(0.0, 100.0),
            co2_ppm: (self.co2_ppm + gaussian(0.0, 5.0)).clamp(400.0, 10_000.0) as u16,
            light_raw,
            uptime_ms: self.ticks.wrapping_mul(1000),
        })
    }
}

impl RelayPort for SimChamber {
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError> {
        debug!("sim relay {} -> {:?}", relay.name(), state);
        self.relays[relay.index()] = state;
        Ok(())
    }
}
