//! Mock hardware and ports for integration tests.
//!
//! Records every relay call so tests can assert on the full command
//! history without touching real GPIO, and scripts sensor readings per
//! cycle.

use std::cell::RefCell;
use std::collections::VecDeque;

use mushpi::app::events::ControlEvent;
use mushpi::app::ports::{
    EventSink, PersistedSettings, RelayPort, SensorPort, SettingsPort,
};
use mushpi::chamber::{Relay, RelayState, SensorReading};
use mushpi::error::{RelayError, SensorError, StoreError};

// ── Relay call record ─────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayCall {
    pub relay: Relay,
    pub state: RelayState,
}

// ── MockChamber ───────────────────────────────────────────────

/// Scripted sensors plus recording relays in one adapter.
pub struct MockChamber {
    /// Readings returned in order; the last one repeats when exhausted.
    readings: VecDeque<Result<SensorReading, SensorError>>,
    last: Result<SensorReading, SensorError>,
    pub calls: Vec<RelayCall>,
    pub fail_relays: bool,
}

#[allow(dead_code)]
impl MockChamber {
    pub fn new() -> Self {
        Self {
            readings: VecDeque::new(),
            last: Ok(reading(21.0, 88.0, 800)),
            calls: Vec::new(),
            fail_relays: false,
        }
    }

    pub fn with_reading(reading: SensorReading) -> Self {
        let mut hw = Self::new();
        hw.last = Ok(reading);
        hw
    }

    pub fn push_reading(&mut self, reading: SensorReading) {
        self.readings.push_back(Ok(reading));
    }

    pub fn push_failure(&mut self) {
        self.readings.push_back(Err(SensorError::ReadFailed));
    }

    pub fn last_state(&self, relay: Relay) -> Option<RelayState> {
        self.calls
            .iter()
            .rev()
            .find(|c| c.relay == relay)
            .map(|c| c.state)
    }

    pub fn calls_for(&self, relay: Relay) -> Vec<RelayCall> {
        self.calls.iter().copied().filter(|c| c.relay == relay).collect()
    }
}

impl Default for MockChamber {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockChamber {
    fn read_environment(&mut self) -> Result<SensorReading, SensorError> {
        if let Some(next) = self.readings.pop_front() {
            self.last = next;
        }
        self.last
    }
}

impl RelayPort for MockChamber {
    fn set_relay(&mut self, relay: Relay, state: RelayState) -> Result<(), RelayError> {
        if self.fail_relays {
            return Err(RelayError::GpioWriteFailed);
        }
        self.calls.push(RelayCall { relay, state });
        Ok(())
    }
}

/// Build a reading with the fields the engine cares about.
pub fn reading(temp_c: f32, rh_pct: f32, co2_ppm: u16) -> SensorReading {
    SensorReading {
        temp_c,
        rh_pct,
        co2_ppm,
        light_raw: 10,
        uptime_ms: 0,
    }
}

// ── MemStore ──────────────────────────────────────────────────

/// In-memory settings store.
pub struct MemStore {
    saved: RefCell<Option<PersistedSettings>>,
    pub fail_saves: bool,
}

#[allow(dead_code)]
impl MemStore {
    pub fn new() -> Self {
        Self {
            saved: RefCell::new(None),
            fail_saves: false,
        }
    }

    pub fn saved(&self) -> Option<PersistedSettings> {
        *self.saved.borrow()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsPort for MemStore {
    fn load(&self) -> Result<PersistedSettings, StoreError> {
        self.saved.borrow().ok_or(StoreError::NotFound)
    }

    fn save(&self, settings: &PersistedSettings) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::IoError);
        }
        *self.saved.borrow_mut() = Some(*settings);
        Ok(())
    }
}

// ── CollectSink ───────────────────────────────────────────────

/// Event sink that keeps every emitted event for assertions.
pub struct CollectSink {
    pub events: Vec<ControlEvent>,
}

#[allow(dead_code)]
impl CollectSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn count_matching(&self, pred: impl Fn(&ControlEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl Default for CollectSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for CollectSink {
    fn emit(&mut self, event: &ControlEvent) {
        self.events.push(*event);
    }
}
