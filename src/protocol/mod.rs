//! BLE GATT protocol layer.
//!
//! Fixed-layout little-endian packet codecs for the six characteristics,
//! a latest-value-wins notification hub, the engine⇄protocol link, and the
//! advertisement lifecycle manager. The platform BLE stack itself lives in
//! `adapters::ble` behind the `bluez` feature; everything here is pure
//! logic and runs on any host.
//!
//! ## GATT Service Layout
//!
//! | Characteristic  | UUID suffix | Props        | Size |
//! |-----------------|-------------|--------------|------|
//! | Environmental   | `…def1`     | Read, Notify | 12 B |
//! | Control Targets | `…def2`     | Read, Write  | 15 B |
//! | Stage State     | `…def3`     | Read, Write  | 10 B |
//! | Override Bits   | `…def4`     | Write        |  2 B |
//! | Status Flags    | `…def5`     | Read, Notify |  4 B |
//! | Actuator Status | `…def6`     | Read, Notify |  6 B |

pub mod advertise;
pub mod codec;
pub mod link;
pub mod notify;

// ───────────────────────────────────────────────────────────────
// Service / characteristic UUIDs
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x12345678_1234_5678_1234_56789abcdef0;
pub const CHAR_ENVIRONMENTAL: u128 = 0x12345678_1234_5678_1234_56789abcdef1;
pub const CHAR_CONTROL_TARGETS: u128 = 0x12345678_1234_5678_1234_56789abcdef2;
pub const CHAR_STAGE_STATE: u128 = 0x12345678_1234_5678_1234_56789abcdef3;
pub const CHAR_OVERRIDE_BITS: u128 = 0x12345678_1234_5678_1234_56789abcdef4;
pub const CHAR_STATUS_FLAGS: u128 = 0x12345678_1234_5678_1234_56789abcdef5;
pub const CHAR_ACTUATOR_STATUS: u128 = 0x12345678_1234_5678_1234_56789abcdef6;

/// The three writable characteristics, for dispatching inbound writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteTarget {
    ControlTargets,
    StageState,
    OverrideBits,
}

impl WriteTarget {
    pub const fn name(self) -> &'static str {
        match self {
            Self::ControlTargets => "control-targets",
            Self::StageState => "stage-state",
            Self::OverrideBits => "override-bits",
        }
    }
}
