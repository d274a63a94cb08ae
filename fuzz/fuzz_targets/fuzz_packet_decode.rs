//! Fuzz target: characteristic payload decoders.
//!
//! Drives arbitrary byte sequences through every decoder and asserts that
//! they never panic and that any accepted payload re-encodes to exactly
//! the bytes that were decoded (the layouts have no dead bits besides the
//! reserved fields, which must be zero to decode at all).
//!
//! cargo fuzz run fuzz_packet_decode

#![no_main]

use libfuzzer_sys::fuzz_target;
use mushpi::protocol::codec::{
    decode_actuators, decode_overrides, decode_stage, decode_status, decode_targets,
    encode_overrides, encode_stage, encode_targets, EnvironmentalFrame,
};

fuzz_target!(|data: &[u8]| {
    if let Ok(t) = decode_targets(data) {
        assert_eq!(encode_targets(&t).as_slice(), data);
    }
    if let Ok(s) = decode_stage(data) {
        assert_eq!(encode_stage(&s).as_slice(), data);
    }
    if let Ok(bits) = decode_overrides(data) {
        assert_eq!(encode_overrides(bits).as_slice(), data);
    }
    if let Ok(frame) = EnvironmentalFrame::decode(data) {
        assert_eq!(frame.encode().as_slice(), data);
    }
    let _ = decode_status(data);
    let _ = decode_actuators(data);
});
