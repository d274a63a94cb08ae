//! Manual-override arbitration scenarios.

use crate::mock_hw::{reading, CollectSink, MemStore, MockChamber};

use mushpi::app::commands::EngineCommand;
use mushpi::app::ports::PersistedSettings;
use mushpi::app::service::ControlEngine;
use mushpi::chamber::{Clock, ReasonCode, Relay, RelayState};
use mushpi::config::ChamberConfig;
use mushpi::modes::{ControlMode, OverrideBits};

const EPOCH: u64 = 1_700_000_000;

fn clock(secs: u64) -> Clock {
    Clock::new(secs * 1000, EPOCH + secs)
}

fn engine() -> ControlEngine {
    let config = ChamberConfig {
        min_hold_secs: 0,
        ..ChamberConfig::default()
    };
    ControlEngine::new(&config, PersistedSettings::default(), false)
}

fn set_overrides(eng: &mut ControlEngine, store: &MemStore, sink: &mut CollectSink, raw: u16) {
    eng.handle_command(
        EngineCommand::SetOverrides(OverrideBits::from_wire(raw).unwrap()),
        store,
        sink,
    );
}

// ── The 0x0006 contract scenario ──────────────────────────────

#[test]
fn fan_mist_hold_leaves_light_and_heater_automatic() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut hw = MockChamber::with_reading(reading(21.0, 90.0, 800));
    let mut sink = CollectSink::new();

    // Settle: everything off, quiescent chamber.
    eng.run_cycle(clock(0), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::Off);

    // 0x0006 = FAN | MIST manual hold.
    set_overrides(&mut eng, &store, &mut sink, 0x0006);
    assert_eq!(eng.mode(), ControlMode::Automatic);

    // Temperature violation: fan would engage, heater would too on the
    // cold side. Use a cold, dry reading: fan/mist must NOT move, heater
    // must engage normally.
    hw.push_reading(reading(15.0, 70.0, 1500));
    eng.run_cycle(clock(60), &mut hw, &mut sink);

    assert_eq!(
        eng.relay_state(Relay::Fan),
        RelayState::Off,
        "held fan must not react to the CO2 violation"
    );
    assert_eq!(
        eng.relay_state(Relay::Mist),
        RelayState::Off,
        "held mist must not react to the dry chamber"
    );
    assert_eq!(
        eng.relay_state(Relay::Heater),
        RelayState::On,
        "heater is not held and must engage on the cold reading"
    );

    let snap = eng.snapshot();
    assert_eq!(snap.actuators.reason(Relay::Fan), ReasonCode::ManualOverrideOff);
    assert_eq!(snap.actuators.reason(Relay::Mist), ReasonCode::ManualOverrideOff);
    assert_eq!(snap.actuators.reason(Relay::Heater), ReasonCode::TempLow);
}

#[test]
fn hold_keeps_an_on_actuator_on() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut hw = MockChamber::with_reading(reading(26.0, 90.0, 400));
    let mut sink = CollectSink::new();

    // Fan engages on heat.
    eng.run_cycle(clock(0), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::On);

    // Hold it, then cool the chamber: fan must stay on.
    set_overrides(&mut eng, &store, &mut sink, OverrideBits::FAN);
    hw.push_reading(reading(18.5, 90.0, 400));
    eng.run_cycle(clock(60), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::On);
    assert_eq!(
        eng.snapshot().actuators.reason(Relay::Fan),
        ReasonCode::ManualOverrideOn
    );
}

#[test]
fn clearing_a_hold_recomputes_fresh_not_restores() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut hw = MockChamber::with_reading(reading(26.0, 90.0, 400));
    let mut sink = CollectSink::new();

    // Fan on (hot), then held on while the chamber cools.
    eng.run_cycle(clock(0), &mut hw, &mut sink);
    set_overrides(&mut eng, &store, &mut sink, OverrideBits::FAN);
    hw.push_reading(reading(18.5, 90.0, 400));
    eng.run_cycle(clock(60), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::On);

    // Clear the hold: the next cycle evaluates fresh against the cold
    // reading and turns the fan off; nothing is "restored".
    set_overrides(&mut eng, &store, &mut sink, 0x0000);
    eng.run_cycle(clock(120), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::Off);
}

// ── Disable automation (bit 7) ────────────────────────────────

#[test]
fn disable_auto_freezes_all_relays() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut hw = MockChamber::with_reading(reading(21.0, 90.0, 800));
    let mut sink = CollectSink::new();

    eng.run_cycle(clock(0), &mut hw, &mut sink);
    set_overrides(&mut eng, &store, &mut sink, OverrideBits::DISABLE_AUTO);
    assert_eq!(eng.mode(), ControlMode::Manual);

    // Gross threshold violations across the board: nothing may move.
    hw.push_reading(reading(35.0, 40.0, 5000));
    let calls_before = hw.calls.len();
    eng.run_cycle(clock(60), &mut hw, &mut sink);
    assert_eq!(hw.calls.len(), calls_before);
    assert_eq!(
        eng.snapshot().actuators.reason(Relay::Fan),
        ReasonCode::ManualMode
    );
}

// ── Emergency stop clearing semantics ─────────────────────────

#[test]
fn clearing_estop_restores_manual_when_bit7_remains() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut sink = CollectSink::new();

    set_overrides(
        &mut eng,
        &store,
        &mut sink,
        OverrideBits::EMERGENCY_STOP | OverrideBits::DISABLE_AUTO,
    );
    assert_eq!(eng.mode(), ControlMode::Safety);

    set_overrides(&mut eng, &store, &mut sink, OverrideBits::DISABLE_AUTO);
    assert_eq!(eng.mode(), ControlMode::Manual);

    set_overrides(&mut eng, &store, &mut sink, 0x0000);
    assert_eq!(eng.mode(), ControlMode::Automatic);
}

#[test]
fn clearing_estop_with_actuator_holds_keeps_holds_scoped() {
    let mut eng = engine();
    let store = MemStore::new();
    let mut hw = MockChamber::with_reading(reading(26.0, 90.0, 400));
    let mut sink = CollectSink::new();

    set_overrides(
        &mut eng,
        &store,
        &mut sink,
        OverrideBits::EMERGENCY_STOP | OverrideBits::MIST,
    );
    eng.run_cycle(clock(0), &mut hw, &mut sink);
    assert_eq!(eng.mode(), ControlMode::Safety);

    // Drop the estop bit, keep the mist hold: mode derives from the stage
    // (AUTOMATIC), mist stays held at OFF, fan re-engages on heat.
    set_overrides(&mut eng, &store, &mut sink, OverrideBits::MIST);
    assert_eq!(eng.mode(), ControlMode::Automatic);
    eng.run_cycle(clock(60), &mut hw, &mut sink);
    assert_eq!(eng.relay_state(Relay::Fan), RelayState::On);
    assert_eq!(eng.relay_state(Relay::Mist), RelayState::Off);
    assert_eq!(
        eng.snapshot().actuators.reason(Relay::Mist),
        ReasonCode::ManualOverrideOff
    );
}

#[test]
fn estop_event_emitted_once_per_engage() {
    use mushpi::app::events::ControlEvent;

    let mut eng = engine();
    let store = MemStore::new();
    let mut sink = CollectSink::new();

    set_overrides(&mut eng, &store, &mut sink, OverrideBits::EMERGENCY_STOP);
    // Re-writing the same word must not re-announce the stop.
    set_overrides(&mut eng, &store, &mut sink, OverrideBits::EMERGENCY_STOP);
    set_overrides(&mut eng, &store, &mut sink, 0x0000);

    assert_eq!(
        sink.count_matching(|e| matches!(e, ControlEvent::EmergencyStop)),
        1
    );
    assert_eq!(
        sink.count_matching(|e| matches!(e, ControlEvent::EmergencyCleared { .. })),
        1
    );
}
