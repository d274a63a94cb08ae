//! Chamber domain types.
//!
//! Shared value types for sensor readings, thresholds, light schedules and
//! cultivation stage state. Threshold fields are stored in their wire units
//! (deci-degrees, deci-percent, ppm) so a protocol round-trip is exact;
//! control math uses the f32 accessors.

use serde::{Deserialize, Serialize};

// ───────────────────────────────────────────────────────────────
// Time
// ───────────────────────────────────────────────────────────────

/// Point-in-time clock sample threaded through a monitoring cycle.
///
/// `uptime_ms` is monotonic (interval math: duty windows, hold timers);
/// `unix_secs` is wall time (light schedule phase, stage elapsed, history).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    pub uptime_ms: u64,
    pub unix_secs: u64,
}

impl Clock {
    pub const fn new(uptime_ms: u64, unix_secs: u64) -> Self {
        Self {
            uptime_ms,
            unix_secs,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Sensor reading
// ───────────────────────────────────────────────────────────────

/// One environmental poll. Immutable once produced by the sensor port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    /// Chamber air temperature, °C.
    pub temp_c: f32,
    /// Relative humidity, %.
    pub rh_pct: f32,
    /// CO₂ concentration, ppm.
    pub co2_ppm: u16,
    /// Raw photoresistor level (unitless ADC counts).
    pub light_raw: u16,
    /// Controller uptime at the time of the poll, milliseconds.
    pub uptime_ms: u32,
}

// ───────────────────────────────────────────────────────────────
// Actuators
// ───────────────────────────────────────────────────────────────

/// The four chamber actuators, in protocol bit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Relay {
    Light = 0,
    Fan = 1,
    Mist = 2,
    Heater = 3,
}

impl Relay {
    pub const COUNT: usize = 4;

    /// Engine evaluation order: fan (temp/CO₂), mist (humidity),
    /// light (schedule), heater (temp).
    pub const EVAL_ORDER: [Self; 4] = [Self::Fan, Self::Mist, Self::Light, Self::Heater];

    /// Bit position within override and actuator-status bitfields.
    pub const fn bit(self) -> u16 {
        1 << (self as u16)
    }

    /// Index into per-actuator arrays.
    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Fan => "fan",
            Self::Mist => "mist",
            Self::Heater => "heater",
        }
    }
}

/// Commanded relay state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelayState {
    On,
    #[default]
    Off,
}

impl RelayState {
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    pub const fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }
}

/// Why a relay was last commanded (or held) the way it is.
///
/// The discriminants are the wire values carried in the Actuator Status
/// characteristic's reason bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ReasonCode {
    None = 0,
    TempHigh = 1,
    Co2High = 2,
    HumidityLow = 3,
    HumidityHigh = 4,
    TempLow = 5,
    Schedule = 6,
    CondensationGuard = 7,
    ManualOverrideOn = 8,
    ManualOverrideOff = 9,
    ManualMode = 10,
    EmergencyStop = 11,
    DutyCycleLimited = 12,
    Startup = 13,
}

// ───────────────────────────────────────────────────────────────
// Thresholds / light schedule
// ───────────────────────────────────────────────────────────────

/// Light schedule mode, wire-coded 0/1/2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum LightMode {
    Off = 0,
    On = 1,
    Cycle = 2,
}

/// Photoperiod definition. `Cycle` wraps modulo `on_min + off_min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightSchedule {
    pub mode: LightMode,
    pub on_min: u16,
    pub off_min: u16,
}

impl LightSchedule {
    /// Scheduled state at the given wall-clock time. Cycle phase is
    /// minutes since the unix epoch modulo the full period.
    pub fn state_at(&self, unix_secs: u64) -> RelayState {
        match self.mode {
            LightMode::Off => RelayState::Off,
            LightMode::On => RelayState::On,
            LightMode::Cycle => {
                let period = u64::from(self.on_min) + u64::from(self.off_min);
                if period == 0 {
                    // Rejected at decode; defensively dark here.
                    return RelayState::Off;
                }
                let phase = (unix_secs / 60) % period;
                RelayState::from_bool(phase < u64::from(self.on_min))
            }
        }
    }
}

impl Default for LightSchedule {
    fn default() -> Self {
        // 12 h on / 12 h off photoperiod.
        Self {
            mode: LightMode::Cycle,
            on_min: 720,
            off_min: 720,
        }
    }
}

/// The active threshold set for the chamber. Replaced atomically by a
/// Control Targets write; one active set per chamber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSet {
    /// Heater engages at or below this, deci-°C.
    pub temp_min_dc: i16,
    /// Fan engages at or above this, deci-°C.
    pub temp_max_dc: i16,
    /// Mist engages at or below this, deci-%RH.
    pub rh_min_dpct: u16,
    /// Fan engages at or above this, ppm.
    pub co2_max_ppm: u16,
    /// Photoperiod definition.
    pub light: LightSchedule,
}

impl TargetSet {
    pub fn temp_min_c(&self) -> f32 {
        f32::from(self.temp_min_dc) / 10.0
    }

    pub fn temp_max_c(&self) -> f32 {
        f32::from(self.temp_max_dc) / 10.0
    }

    pub fn rh_min_pct(&self) -> f32 {
        f32::from(self.rh_min_dpct) / 10.0
    }
}

impl Default for TargetSet {
    fn default() -> Self {
        // Oyster fruiting ballpark: 18–24 °C, ≥85 %RH, ≤1000 ppm CO₂.
        Self {
            temp_min_dc: 180,
            temp_max_dc: 240,
            rh_min_dpct: 850,
            co2_max_ppm: 1000,
            light: LightSchedule::default(),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cultivation stage
// ───────────────────────────────────────────────────────────────

/// User-facing automation level for the current cultivation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum StageMode {
    /// Fully automatic control and stage advancement.
    Full = 0,
    /// Automatic control; the grower advances stages by hand.
    Semi = 1,
    /// Grower drives the relays directly.
    Manual = 2,
}

/// Species catalogue, wire-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Species {
    Oyster = 1,
    Shiitake = 2,
    LionsMane = 3,
    Custom = 99,
}

impl Species {
    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Oyster),
            2 => Some(Self::Shiitake),
            3 => Some(Self::LionsMane),
            99 => Some(Self::Custom),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Oyster => "Oyster",
            Self::Shiitake => "Shiitake",
            Self::LionsMane => "LionsMane",
            Self::Custom => "Custom",
        }
    }
}

/// Growth stage catalogue, wire-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum GrowthStage {
    Incubation = 1,
    Pinning = 2,
    Fruiting = 3,
}

impl GrowthStage {
    pub fn from_wire(v: u8) -> Option<Self> {
        match v {
            1 => Some(Self::Incubation),
            2 => Some(Self::Pinning),
            3 => Some(Self::Fruiting),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Incubation => "Incubation",
            Self::Pinning => "Pinning",
            Self::Fruiting => "Fruiting",
        }
    }
}

/// Current cultivation stage as written by the client (or defaults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageState {
    pub mode: StageMode,
    pub species: Species,
    pub stage: GrowthStage,
    /// Unix timestamp of the stage start.
    pub started_unix: u32,
    /// Expected stage duration in days; 0 = open-ended.
    pub expected_days: u16,
}

impl StageState {
    /// Whether the stage has run its expected course.
    pub fn is_ready(&self, unix_secs: u64) -> bool {
        if self.expected_days == 0 {
            return false;
        }
        let end = u64::from(self.started_unix) + u64::from(self.expected_days) * 86_400;
        unix_secs >= end
    }
}

impl Default for StageState {
    fn default() -> Self {
        Self {
            mode: StageMode::Full,
            species: Species::Oyster,
            stage: GrowthStage::Incubation,
            started_unix: 0,
            expected_days: 14,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
