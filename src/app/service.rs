//! Control engine — the per-cycle orchestrator.
//!
//! One explicit instance owns every piece of live control state (relay
//! states, duty windows, guard, history, status) for the process lifetime;
//! the protocol layer only ever talks to it through the command channel and
//! the published snapshot.
//!
//! Cycle shape:
//!
//! ```text
//!  drain commands → read sensors → guard → per-relay arbitration
//!      → apply via RelayPort (min-hold gated) → verify light
//!      → recompute status → snapshot/telemetry
//! ```
//!
//! Arbitration order per relay, highest priority first: emergency stop,
//! condensation guard (fan/mist), per-actuator manual hold, manual mode,
//! then hysteresis gated by duty-cycle admission.

use log::{info, warn};

use crate::chamber::{
    Clock, ReasonCode, Relay, RelayState, SensorReading, StageState, TargetSet,
};
use crate::config::ChamberConfig;
use crate::control::condensation::{CondensationGuard, GuardTransition};
use crate::control::duty_cycle::DutyCycleTracker;
use crate::control::hysteresis::{Bound, Hysteresis};
use crate::control::light::LightVerifier;
use crate::history::{ActionHistory, RelayAction};
use crate::modes::{ControlMode, OverrideBits};
use crate::status::{ActuatorStatus, StatusFlags};

use super::commands::EngineCommand;
use super::events::{ChamberSnapshot, ControlEvent, TelemetrySnapshot};
use super::ports::{EventSink, PersistedSettings, RelayPort, SensorPort, SettingsPort};

/// One relay's resolved outcome for a cycle.
#[derive(Debug, Clone, Copy)]
struct Decision {
    desired: RelayState,
    reason: ReasonCode,
    /// Safety-class transitions bypass the minimum-hold window.
    forced: bool,
}

/// The control decision engine.
pub struct ControlEngine {
    // Active settings (replaced atomically by protocol writes).
    targets: TargetSet,
    stage: StageState,
    overrides: OverrideBits,
    mode: ControlMode,

    // Live relay state, exclusively owned.
    relays: [RelayState; Relay::COUNT],
    last_change_ms: [Option<u64>; Relay::COUNT],

    // Sub-controllers.
    temp_high: Hysteresis,
    co2_high: Hysteresis,
    rh_low: Hysteresis,
    temp_low: Hysteresis,
    duty: [DutyCycleTracker; Relay::COUNT],
    guard: CondensationGuard,
    verifier: LightVerifier,

    // Bookkeeping.
    history: ActionHistory,
    status: StatusFlags,
    actuators: ActuatorStatus,
    last_reading: Option<SensorReading>,
    min_hold_ms: u64,
    cycle_count: u64,
}

impl ControlEngine {
    /// Construct the engine from configuration and restored settings.
    ///
    /// All relays start OFF with reason `Startup`; the first cycle
    /// re-evaluates everything from live readings.
    pub fn new(config: &ChamberConfig, persisted: PersistedSettings, simulated: bool) -> Self {
        let window_ms = u64::from(config.duty_window_secs) * 1000;
        let duty = [
            // Indexed by Relay::index(): light, fan, mist, heater.
            DutyCycleTracker::new(window_ms, None),
            DutyCycleTracker::new(window_ms, Some(config.fan_duty_cap_pct)),
            DutyCycleTracker::new(window_ms, Some(config.mist_duty_cap_pct)),
            DutyCycleTracker::new(window_ms, None),
        ];

        let mut status = StatusFlags::empty();
        status.assign(StatusFlags::SIMULATION, simulated);

        Self {
            targets: persisted.targets,
            stage: persisted.stage,
            overrides: OverrideBits::none(),
            mode: persisted.mode,
            relays: [RelayState::Off; Relay::COUNT],
            last_change_ms: [None; Relay::COUNT],
            temp_high: Hysteresis::new(Bound::Max, config.temp_band_c),
            co2_high: Hysteresis::new(Bound::Max, config.co2_band_ppm),
            rh_low: Hysteresis::new(Bound::Min, config.rh_band_pct),
            temp_low: Hysteresis::new(Bound::Min, config.temp_band_c),
            duty,
            guard: CondensationGuard::new(
                config.guard_rh_pct,
                u64::from(config.guard_min_duration_secs) * 1000,
            ),
            verifier: LightVerifier::new(
                u64::from(config.light_settle_secs) * 1000,
                config.light_on_threshold,
                config.light_off_threshold,
                u64::from(config.light_alert_window_secs) * 1000,
            ),
            history: ActionHistory::new(u64::from(config.history_retention_secs)),
            status,
            actuators: ActuatorStatus::new(),
            last_reading: None,
            min_hold_ms: u64::from(config.min_hold_secs) * 1000,
            cycle_count: 0,
        }
    }

    /// Announce startup. Call once before the first cycle.
    pub fn start(&mut self, sink: &mut impl EventSink) {
        info!("control engine started in {} mode", self.mode);
        sink.emit(&ControlEvent::Started { mode: self.mode });
    }

    // ── Command handling ──────────────────────────────────────

    /// Process one protocol command. Settings changes persist through
    /// `store`; persistence failure is logged and does not reject the
    /// runtime change.
    pub fn handle_command(
        &mut self,
        cmd: EngineCommand,
        store: &impl SettingsPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            EngineCommand::SetTargets(targets) => {
                self.targets = targets;
                info!(
                    "targets updated: temp {:.1}-{:.1}C, RH>={:.1}%, CO2<={}ppm",
                    targets.temp_min_c(),
                    targets.temp_max_c(),
                    targets.rh_min_pct(),
                    targets.co2_max_ppm
                );
                self.persist(store);
                sink.emit(&ControlEvent::TargetsUpdated);
            }
            EngineCommand::SetStage(stage) => {
                self.stage = stage;
                if self.overrides.pins_mode() {
                    info!(
                        "stage updated ({} {}); mode pinned at {} by overrides",
                        stage.species.name(),
                        stage.stage.name(),
                        self.mode
                    );
                } else {
                    let derived = stage.mode.derived_control_mode();
                    self.switch_mode(derived, sink);
                }
                self.persist(store);
                sink.emit(&ControlEvent::StageUpdated {
                    species: stage.species,
                    stage: stage.stage,
                    mode: stage.mode,
                });
            }
            EngineCommand::SetOverrides(bits) => {
                let prev = self.overrides;
                self.overrides = bits;
                let new_mode = bits.control_mode(self.stage.mode);

                if bits.emergency_stop() && !prev.emergency_stop() {
                    warn!("EMERGENCY STOP engaged");
                    sink.emit(&ControlEvent::EmergencyStop);
                } else if prev.emergency_stop() && !bits.emergency_stop() {
                    info!("emergency stop cleared, restoring {}", new_mode);
                    sink.emit(&ControlEvent::EmergencyCleared { restored: new_mode });
                }

                self.switch_mode(new_mode, sink);
                self.persist(store);
                sink.emit(&ControlEvent::OverridesUpdated { bits });
            }
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// Run one full monitoring cycle.
    ///
    /// `hw` satisfies both [`SensorPort`] and [`RelayPort`] — this avoids a
    /// double mutable borrow while keeping the port boundary explicit.
    pub fn run_cycle(
        &mut self,
        clock: Clock,
        hw: &mut (impl SensorPort + RelayPort),
        sink: &mut impl EventSink,
    ) {
        self.cycle_count += 1;

        // 1. Poll sensors. On failure the relays hold their last
        //    known-safe state and no decisions are taken this cycle.
        let reading = match hw.read_environment() {
            Ok(r) => {
                self.status.assign(StatusFlags::SENSOR_ERROR, false);
                self.last_reading = Some(r);
                r
            }
            Err(e) => {
                warn!("sensor poll failed: {e}; holding last relay states");
                self.status.assign(StatusFlags::SENSOR_ERROR, true);
                self.refresh_passive_status(clock);
                sink.emit(&ControlEvent::SensorFault);
                return;
            }
        };

        // 2. Condensation guard runs before any per-relay logic so its
        //    verdict is visible to fan and mist arbitration below.
        match self.guard.update(reading.rh_pct, clock.uptime_ms) {
            Some(GuardTransition::Activated) => {
                sink.emit(&ControlEvent::GuardActivated {
                    rh_pct: reading.rh_pct,
                });
            }
            Some(GuardTransition::Deactivated) => sink.emit(&ControlEvent::GuardCleared),
            None => {}
        }

        // 3. Arbitrate and apply, fixed order.
        let mut relay_fault = false;
        for relay in Relay::EVAL_ORDER {
            let decision = self.decide(relay, &reading, clock);
            if let Some(d) = decision {
                if !self.apply(relay, d, clock, hw, sink) {
                    relay_fault = true;
                }
            }
        }

        // 4. Light-output verification against the photoresistor.
        let light_state = self.relays[Relay::Light.index()];
        let light_changed = self.last_change_ms[Relay::Light.index()].unwrap_or(0);
        let (outcome, alert) =
            self.verifier
                .verify(light_state, reading.light_raw, light_changed, clock.uptime_ms);
        if alert {
            sink.emit(&ControlEvent::LightVerifyFailed {
                commanded: light_state,
                raw: reading.light_raw,
            });
        }

        // 5. Status bookkeeping, recomputed every cycle.
        self.status
            .assign(StatusFlags::CONTROL_ERROR, relay_fault || outcome.is_failure());
        self.status
            .assign(StatusFlags::THRESHOLD_ALARM, self.threshold_alarm(&reading));
        self.status
            .assign(StatusFlags::STAGE_READY, self.stage.is_ready(clock.unix_secs));
        self.history.prune(clock.unix_secs);

        sink.emit(&ControlEvent::Telemetry(self.telemetry(&reading)));
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot for the protocol layer, replaced whole per cycle.
    pub fn snapshot(&self) -> ChamberSnapshot {
        ChamberSnapshot {
            reading: self.last_reading,
            targets: self.targets,
            stage: self.stage,
            mode: self.mode,
            status: self.status,
            actuators: self.actuators,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.mode
    }

    pub fn relay_state(&self, relay: Relay) -> RelayState {
        self.relays[relay.index()]
    }

    pub fn overrides(&self) -> OverrideBits {
        self.overrides
    }

    pub fn targets(&self) -> TargetSet {
        self.targets
    }

    pub fn stage(&self) -> StageState {
        self.stage
    }

    pub fn history(&self) -> &ActionHistory {
        &self.history
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    // ── Internal ──────────────────────────────────────────────

    /// Resolve one relay's desired state. `None` means "no evaluation this
    /// cycle" (manual hold) — the relay keeps its state untouched.
    fn decide(&mut self, relay: Relay, reading: &SensorReading, clock: Clock) -> Option<Decision> {
        // Priority 1: emergency stop enforces OFF everywhere.
        if self.mode == ControlMode::Safety {
            return Some(Decision {
                desired: RelayState::Off,
                reason: ReasonCode::EmergencyStop,
                forced: true,
            });
        }

        let current = self.relays[relay.index()];

        // Priority 2: the condensation guard is safety-critical and is
        // authoritative over fan and mist, manual holds included; only
        // emergency stop outranks it.
        if self.guard.active() {
            match relay {
                Relay::Fan => {
                    return Some(Decision {
                        desired: RelayState::On,
                        reason: ReasonCode::CondensationGuard,
                        forced: true,
                    });
                }
                Relay::Mist => {
                    return Some(Decision {
                        desired: RelayState::Off,
                        reason: ReasonCode::CondensationGuard,
                        forced: true,
                    });
                }
                Relay::Light | Relay::Heater => {}
            }
        }

        // Priority 3: per-actuator manual hold.
        if self.overrides.holds(relay) {
            self.actuators.set_reason(
                relay,
                if current.is_on() {
                    ReasonCode::ManualOverrideOn
                } else {
                    ReasonCode::ManualOverrideOff
                },
            );
            return None;
        }

        // Priority 4: manual mode holds every non-overridden relay.
        if self.mode == ControlMode::Manual {
            self.actuators.set_reason(relay, ReasonCode::ManualMode);
            return None;
        }

        // Priority 5: automatic control.
        let decision = match relay {
            Relay::Fan => {
                let temp_on = self.temp_high.evaluate(
                    reading.temp_c,
                    self.targets.temp_max_c(),
                    current.is_on(),
                );
                let co2_on = self.co2_high.evaluate(
                    f32::from(reading.co2_ppm),
                    f32::from(self.targets.co2_max_ppm),
                    current.is_on(),
                );
                self.gated_on(
                    relay,
                    temp_on || co2_on,
                    current,
                    clock,
                    if temp_on {
                        ReasonCode::TempHigh
                    } else {
                        ReasonCode::Co2High
                    },
                    ReasonCode::None,
                )
            }
            Relay::Mist => {
                let rh_on = self.rh_low.evaluate(
                    reading.rh_pct,
                    self.targets.rh_min_pct(),
                    current.is_on(),
                );
                self.gated_on(
                    relay,
                    rh_on,
                    current,
                    clock,
                    ReasonCode::HumidityLow,
                    ReasonCode::HumidityHigh,
                )
            }
            Relay::Light => Decision {
                desired: self.targets.light.state_at(clock.unix_secs),
                reason: ReasonCode::Schedule,
                forced: false,
            },
            Relay::Heater => {
                let heat_on = self.temp_low.evaluate(
                    reading.temp_c,
                    self.targets.temp_min_c(),
                    current.is_on(),
                );
                Decision {
                    desired: RelayState::from_bool(heat_on),
                    reason: if heat_on {
                        ReasonCode::TempLow
                    } else {
                        ReasonCode::None
                    },
                    forced: false,
                }
            }
        };
        Some(decision)
    }

    /// Gate a requested ON through duty-cycle admission. Never evicts an
    /// actuator that is already ON.
    fn gated_on(
        &mut self,
        relay: Relay,
        want_on: bool,
        current: RelayState,
        clock: Clock,
        on_reason: ReasonCode,
        off_reason: ReasonCode,
    ) -> Decision {
        if want_on && !current.is_on() && !self.duty[relay.index()].can_turn_on(clock.uptime_ms) {
            info!(
                "{}: ON request denied by duty cycle ({:.0}% of window)",
                relay.name(),
                self.duty[relay.index()].on_time_percent(clock.uptime_ms)
            );
            self.actuators.set_reason(relay, ReasonCode::DutyCycleLimited);
            return Decision {
                desired: RelayState::Off,
                reason: ReasonCode::DutyCycleLimited,
                forced: false,
            };
        }
        Decision {
            desired: RelayState::from_bool(want_on),
            reason: if want_on { on_reason } else { off_reason },
            forced: false,
        }
    }

    /// Apply a decision through the relay port, honoring the minimum-hold
    /// window for non-forced transitions. Returns `false` on a backend
    /// fault (the relay keeps its last known-safe state).
    fn apply(
        &mut self,
        relay: Relay,
        decision: Decision,
        clock: Clock,
        hw: &mut impl RelayPort,
        sink: &mut impl EventSink,
    ) -> bool {
        let idx = relay.index();
        let current = self.relays[idx];
        if decision.desired == current {
            return true;
        }

        if !decision.forced {
            if let Some(changed) = self.last_change_ms[idx] {
                let elapsed = clock.uptime_ms.saturating_sub(changed);
                if elapsed < self.min_hold_ms {
                    // Deferred, not dropped: the request is recomputed next
                    // cycle once the hold expires.
                    info!(
                        "{}: {:?} deferred, {}ms left in hold window",
                        relay.name(),
                        decision.desired,
                        self.min_hold_ms - elapsed
                    );
                    return true;
                }
            }
        }

        if let Err(e) = hw.set_relay(relay, decision.desired) {
            warn!("{}: relay apply failed: {e}", relay.name());
            return false;
        }

        self.relays[idx] = decision.desired;
        self.last_change_ms[idx] = Some(clock.uptime_ms);
        if matches!(relay, Relay::Fan | Relay::Mist) {
            self.duty[idx].record(clock.uptime_ms, decision.desired.is_on());
        }
        self.actuators.set_state(relay, decision.desired);
        self.actuators.set_reason(relay, decision.reason);
        self.history.push(RelayAction {
            unix_secs: clock.unix_secs,
            relay,
            state: decision.desired,
            previous: current,
            reason: decision.reason,
        });
        info!(
            "{}: {:?} -> {:?} ({:?})",
            relay.name(),
            current,
            decision.desired,
            decision.reason
        );
        sink.emit(&ControlEvent::RelaySwitched {
            relay,
            from: current,
            to: decision.desired,
            reason: decision.reason,
        });
        true
    }

    fn switch_mode(&mut self, new_mode: ControlMode, sink: &mut impl EventSink) {
        if new_mode != self.mode {
            let from = self.mode;
            self.mode = new_mode;
            info!("control mode: {from} -> {new_mode}");
            sink.emit(&ControlEvent::ModeChanged {
                from,
                to: new_mode,
            });
        }
    }

    /// Persist the current settings. SAFETY is transient (bound to the
    /// volatile emergency bit) and is never written out; the mode that
    /// would apply without it is stored instead.
    fn persist(&self, store: &impl SettingsPort) {
        let mode = if self.overrides.disable_auto() {
            ControlMode::Manual
        } else {
            self.stage.mode.derived_control_mode()
        };
        let settings = PersistedSettings {
            targets: self.targets,
            stage: self.stage,
            mode,
        };
        if let Err(e) = store.save(&settings) {
            warn!("settings persist failed: {e}");
        }
    }

    /// Status bits that do not depend on a fresh reading, for cycles where
    /// the sensor poll failed.
    fn refresh_passive_status(&mut self, clock: Clock) {
        self.status
            .assign(StatusFlags::STAGE_READY, self.stage.is_ready(clock.unix_secs));
        self.history.prune(clock.unix_secs);
    }

    fn threshold_alarm(&self, reading: &SensorReading) -> bool {
        reading.temp_c > self.targets.temp_max_c()
            || reading.temp_c < self.targets.temp_min_c()
            || reading.rh_pct < self.targets.rh_min_pct()
            || reading.co2_ppm > self.targets.co2_max_ppm
    }

    fn telemetry(&self, reading: &SensorReading) -> TelemetrySnapshot {
        TelemetrySnapshot {
            temp_c: reading.temp_c,
            rh_pct: reading.rh_pct,
            co2_ppm: reading.co2_ppm,
            light_raw: reading.light_raw,
            mode: self.mode,
            relay_bits: self.actuators.state_bits(),
            status_bits: self.status.bits(),
        }
    }
}
