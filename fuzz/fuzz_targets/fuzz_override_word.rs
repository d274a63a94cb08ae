//! Fuzz target: override-word validation.
//!
//! For every possible wire word, decoding must accept exactly the words
//! with no reserved bit set, and the resolved control mode must respect
//! the bit-15 > bit-7 > stage-mode priority.
//!
//! cargo fuzz run fuzz_override_word

#![no_main]

use libfuzzer_sys::fuzz_target;
use mushpi::chamber::StageMode;
use mushpi::modes::{ControlMode, OverrideBits};

fuzz_target!(|raw: u16| {
    match OverrideBits::from_wire(raw) {
        Ok(bits) => {
            assert_eq!(raw & !OverrideBits::KNOWN_MASK, 0);
            for stage_mode in [StageMode::Full, StageMode::Semi, StageMode::Manual] {
                let mode = bits.control_mode(stage_mode);
                if bits.emergency_stop() {
                    assert_eq!(mode, ControlMode::Safety);
                } else if bits.disable_auto() {
                    assert_eq!(mode, ControlMode::Manual);
                } else {
                    assert_eq!(mode, stage_mode.derived_control_mode());
                }
            }
        }
        Err(_) => assert_ne!(raw & !OverrideBits::KNOWN_MASK, 0),
    }
});
