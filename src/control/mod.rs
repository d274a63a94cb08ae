//! Control sub-controllers composed by the engine each monitoring cycle.

pub mod condensation;
pub mod duty_cycle;
pub mod hysteresis;
pub mod light;
