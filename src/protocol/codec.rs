//! Fixed-layout packet codecs.
//!
//! Every characteristic payload is a fixed-size little-endian struct.
//! Decoding validates length first, then reserved fields, then enum
//! discriminants; any failure rejects the whole payload and mutates
//! nothing. Encoding is infallible for in-range values.

use crate::chamber::{
    GrowthStage, LightMode, LightSchedule, SensorReading, Species, StageMode, StageState,
    TargetSet,
};
use crate::error::ProtocolError;
use crate::modes::OverrideBits;
use crate::status::ActuatorStatus;

// ───────────────────────────────────────────────────────────────
// Payload sizes
// ───────────────────────────────────────────────────────────────

pub const ENVIRONMENTAL_LEN: usize = 12;
pub const CONTROL_TARGETS_LEN: usize = 15;
pub const STAGE_STATE_LEN: usize = 10;
pub const OVERRIDE_BITS_LEN: usize = 2;
pub const STATUS_FLAGS_LEN: usize = 4;
pub const ACTUATOR_STATUS_LEN: usize = 6;

fn check_len(payload: &[u8], expected: usize) -> Result<(), ProtocolError> {
    if payload.len() != expected {
        return Err(ProtocolError::BadLength {
            expected,
            got: payload.len(),
        });
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Environmental (read/notify)
// ───────────────────────────────────────────────────────────────

/// Environmental payload in wire units.
///
/// Layout: u16 CO₂ ppm, s16 temp×10, u16 RH×10, u16 light raw, u32 uptime ms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentalFrame {
    pub co2_ppm: u16,
    pub temp_dc: i16,
    pub rh_dpct: u16,
    pub light_raw: u16,
    pub uptime_ms: u32,
}

impl EnvironmentalFrame {
    pub fn from_reading(r: &SensorReading) -> Self {
        Self {
            co2_ppm: r.co2_ppm,
            temp_dc: (r.temp_c * 10.0).round().clamp(-32768.0, 32767.0) as i16,
            rh_dpct: (r.rh_pct * 10.0).round().clamp(0.0, 65535.0) as u16,
            light_raw: r.light_raw,
            uptime_ms: r.uptime_ms,
        }
    }

    pub fn encode(&self) -> [u8; ENVIRONMENTAL_LEN] {
        let mut buf = [0u8; ENVIRONMENTAL_LEN];
        buf[0..2].copy_from_slice(&self.co2_ppm.to_le_bytes());
        buf[2..4].copy_from_slice(&self.temp_dc.to_le_bytes());
        buf[4..6].copy_from_slice(&self.rh_dpct.to_le_bytes());
        buf[6..8].copy_from_slice(&self.light_raw.to_le_bytes());
        buf[8..12].copy_from_slice(&self.uptime_ms.to_le_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, ProtocolError> {
        check_len(payload, ENVIRONMENTAL_LEN)?;
        Ok(Self {
            co2_ppm: u16::from_le_bytes([payload[0], payload[1]]),
            temp_dc: i16::from_le_bytes([payload[2], payload[3]]),
            rh_dpct: u16::from_le_bytes([payload[4], payload[5]]),
            light_raw: u16::from_le_bytes([payload[6], payload[7]]),
            uptime_ms: u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]),
        })
    }
}

// ───────────────────────────────────────────────────────────────
// Control Targets (read/write)
// ───────────────────────────────────────────────────────────────

/// Layout: s16 tempMin×10, s16 tempMax×10, u16 RHmin×10, u16 CO₂max,
/// u8 lightMode, u16 onMin, u16 offMin, u16 reserved=0.
pub fn encode_targets(t: &TargetSet) -> [u8; CONTROL_TARGETS_LEN] {
    let mut buf = [0u8; CONTROL_TARGETS_LEN];
    buf[0..2].copy_from_slice(&t.temp_min_dc.to_le_bytes());
    buf[2..4].copy_from_slice(&t.temp_max_dc.to_le_bytes());
    buf[4..6].copy_from_slice(&t.rh_min_dpct.to_le_bytes());
    buf[6..8].copy_from_slice(&t.co2_max_ppm.to_le_bytes());
    buf[8] = t.light.mode as u8;
    buf[9..11].copy_from_slice(&t.light.on_min.to_le_bytes());
    buf[11..13].copy_from_slice(&t.light.off_min.to_le_bytes());
    // buf[13..15] reserved, zero.
    buf
}

pub fn decode_targets(payload: &[u8]) -> Result<TargetSet, ProtocolError> {
    check_len(payload, CONTROL_TARGETS_LEN)?;

    let reserved = u16::from_le_bytes([payload[13], payload[14]]);
    if reserved != 0 {
        return Err(ProtocolError::ReservedBits);
    }

    let mode = match payload[8] {
        0 => LightMode::Off,
        1 => LightMode::On,
        2 => LightMode::Cycle,
        v => {
            return Err(ProtocolError::UnknownEnum {
                field: "lightMode",
                value: v,
            });
        }
    };
    let on_min = u16::from_le_bytes([payload[9], payload[10]]);
    let off_min = u16::from_le_bytes([payload[11], payload[12]]);
    if mode == LightMode::Cycle && on_min == 0 && off_min == 0 {
        return Err(ProtocolError::BadValue("zero-length light cycle"));
    }

    Ok(TargetSet {
        temp_min_dc: i16::from_le_bytes([payload[0], payload[1]]),
        temp_max_dc: i16::from_le_bytes([payload[2], payload[3]]),
        rh_min_dpct: u16::from_le_bytes([payload[4], payload[5]]),
        co2_max_ppm: u16::from_le_bytes([payload[6], payload[7]]),
        light: LightSchedule {
            mode,
            on_min,
            off_min,
        },
    })
}

// ───────────────────────────────────────────────────────────────
// Stage State (read/write)
// ───────────────────────────────────────────────────────────────

/// Layout: u8 mode, u8 speciesId, u8 stageId, u32 unixTimestamp,
/// u16 expectedDays, u8 reserved=0.
pub fn encode_stage(s: &StageState) -> [u8; STAGE_STATE_LEN] {
    let mut buf = [0u8; STAGE_STATE_LEN];
    buf[0] = s.mode as u8;
    buf[1] = s.species as u8;
    buf[2] = s.stage as u8;
    buf[3..7].copy_from_slice(&s.started_unix.to_le_bytes());
    buf[7..9].copy_from_slice(&s.expected_days.to_le_bytes());
    // buf[9] reserved, zero.
    buf
}

pub fn decode_stage(payload: &[u8]) -> Result<StageState, ProtocolError> {
    check_len(payload, STAGE_STATE_LEN)?;

    if payload[9] != 0 {
        return Err(ProtocolError::ReservedBits);
    }

    let mode = match payload[0] {
        0 => StageMode::Full,
        1 => StageMode::Semi,
        2 => StageMode::Manual,
        v => {
            return Err(ProtocolError::UnknownEnum {
                field: "stageMode",
                value: v,
            });
        }
    };
    let species = Species::from_wire(payload[1]).ok_or(ProtocolError::UnknownEnum {
        field: "speciesId",
        value: payload[1],
    })?;
    let stage = GrowthStage::from_wire(payload[2]).ok_or(ProtocolError::UnknownEnum {
        field: "stageId",
        value: payload[2],
    })?;

    Ok(StageState {
        mode,
        species,
        stage,
        started_unix: u32::from_le_bytes([payload[3], payload[4], payload[5], payload[6]]),
        expected_days: u16::from_le_bytes([payload[7], payload[8]]),
    })
}

// ───────────────────────────────────────────────────────────────
// Override Bits (write only)
// ───────────────────────────────────────────────────────────────

pub fn decode_overrides(payload: &[u8]) -> Result<OverrideBits, ProtocolError> {
    check_len(payload, OVERRIDE_BITS_LEN)?;
    OverrideBits::from_wire(u16::from_le_bytes([payload[0], payload[1]]))
}

pub fn encode_overrides(bits: OverrideBits) -> [u8; OVERRIDE_BITS_LEN] {
    bits.bits().to_le_bytes()
}

// ───────────────────────────────────────────────────────────────
// Status Flags (read/notify)
// ───────────────────────────────────────────────────────────────

pub fn encode_status(bits: u32) -> [u8; STATUS_FLAGS_LEN] {
    bits.to_le_bytes()
}

pub fn decode_status(payload: &[u8]) -> Result<u32, ProtocolError> {
    check_len(payload, STATUS_FLAGS_LEN)?;
    Ok(u32::from_le_bytes([
        payload[0], payload[1], payload[2], payload[3],
    ]))
}

// ───────────────────────────────────────────────────────────────
// Actuator Status (read/notify)
// ───────────────────────────────────────────────────────────────

/// Layout: u16 state bits + reason bytes (light, fan, mist, heater).
pub fn encode_actuators(st: &ActuatorStatus) -> [u8; ACTUATOR_STATUS_LEN] {
    let mut buf = [0u8; ACTUATOR_STATUS_LEN];
    buf[0..2].copy_from_slice(&st.state_bits().to_le_bytes());
    buf[2..6].copy_from_slice(&st.reason_bytes());
    buf
}

/// Decoded actuator payload in wire form (client-side view).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorFrame {
    pub state_bits: u16,
    pub reasons: [u8; 4],
}

pub fn decode_actuators(payload: &[u8]) -> Result<ActuatorFrame, ProtocolError> {
    check_len(payload, ACTUATOR_STATUS_LEN)?;
    Ok(ActuatorFrame {
        state_bits: u16::from_le_bytes([payload[0], payload[1]]),
        reasons: [payload[2], payload[3], payload[4], payload[5]],
    })
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
