//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured control events to the
//! journal. A BLE or MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::ControlEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`ControlEvent`].
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &ControlEvent) {
        match event {
            ControlEvent::Telemetry(t) => {
                info!(
                    "TELEM | T={:.1}\u{00b0}C RH={:.1}% CO2={}ppm light={} | \
                     mode={} relays=0b{:04b} status=0b{:08b}",
                    t.temp_c,
                    t.rh_pct,
                    t.co2_ppm,
                    t.light_raw,
                    t.mode,
                    t.relay_bits,
                    t.status_bits,
                );
            }
            ControlEvent::RelaySwitched {
                relay,
                from,
                to,
                reason,
            } => {
                info!("RELAY | {} {:?} -> {:?} ({:?})", relay.name(), from, to, reason);
            }
            ControlEvent::ModeChanged { from, to } => {
                info!("MODE  | {from} -> {to}");
            }
            ControlEvent::EmergencyStop => {
                warn!("ESTOP | engaged, all relays OFF");
            }
            ControlEvent::EmergencyCleared { restored } => {
                info!("ESTOP | cleared, mode {restored}");
            }
            ControlEvent::GuardActivated { rh_pct } => {
                warn!("GUARD | condensation guard active at RH {rh_pct:.1}%");
            }
            ControlEvent::GuardCleared => {
                info!("GUARD | condensation guard cleared");
            }
            ControlEvent::LightVerifyFailed { commanded, raw } => {
                warn!("LIGHT | verify failed: commanded {commanded:?}, photoresistor {raw}");
            }
            ControlEvent::TargetsUpdated => {
                info!("WRITE | control targets replaced");
            }
            ControlEvent::StageUpdated {
                species,
                stage,
                mode,
            } => {
                info!(
                    "STAGE | {} {} ({:?} mode)",
                    species.name(),
                    stage.name(),
                    mode
                );
            }
            ControlEvent::OverridesUpdated { bits } => {
                info!("WRITE | overrides = {bits}");
            }
            ControlEvent::SensorFault => {
                warn!("SENSE | poll failed, relays holding");
            }
            ControlEvent::Started { mode } => {
                info!("START | mode={mode}");
            }
        }
    }
}
