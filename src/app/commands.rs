//! Inbound commands to the control engine.
//!
//! Every characteristic write that survives validation becomes one of
//! these, queued on the protocol link and drained by the engine at the
//! start of its next monitoring cycle — protocol events never mutate
//! engine state from the BLE stack's thread.

use crate::chamber::{StageState, TargetSet};
use crate::modes::OverrideBits;

/// Commands the protocol layer can send into the control engine.
#[derive(Debug, Clone, Copy)]
pub enum EngineCommand {
    /// Replace the active threshold set (Control Targets write).
    SetTargets(TargetSet),

    /// Replace the cultivation stage (Stage State write).
    SetStage(StageState),

    /// Replace the manual-override word (Override Bits write).
    SetOverrides(OverrideBits),
}
