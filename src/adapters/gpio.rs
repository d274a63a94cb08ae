//! Raspberry Pi GPIO relay backend (`rpi` feature).
//!
//! Drives the four-channel relay board through rppal. Relay boards in this
//! class are active-high; the lines are initialised low (everything OFF)
//! before the engine takes over.

use log::info;
use rppal::gpio::{Gpio, OutputPin};

use crate::app::ports::RelayPort;
use crate::chamber::{Relay, RelayState};
use crate::config::RelayPins;
use crate::error::RelayError;

pub struct GpioRelays {
    // Indexed by Relay::index(): light, fan, mist, heater.
    lines: [OutputPin; Relay::COUNT],
}

impl GpioRelays {
    /// Claim the configured lines and drive them all low.
    pub fn new(pins: &RelayPins) -> anyhow::Result<Self> {
        let gpio = Gpio::new()?;
        let mut claim = |bcm: u8| -> anyhow::Result<OutputPin> {
            let mut line = gpio.get(bcm)?.into_output();
            line.set_low();
            Ok(line)
        };
        let lines = [
            claim(pins.light)?,
            claim(pins.fan)?,
            claim(pins.mist)?,
            claim(pins.heater)?,
        ];
        info!(
            "GPIO relays claimed (light={}, fan={}, mist={}, heater={})",
            pins.light, pins.fan, pins.mist, pins.heater
        );
        Ok(Self { lines })
    }
}

impl RelayPort for GpioRelays {
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError> {
        let line = &mut self.lines[relay.index()];
        if state.is_on() {
            line.set_high();
        } else {
            line.set_low();
        }
        Ok(())
    }
}
