//! Engine ⇄ protocol link.
//!
//! One `Arc<ProtocolLink>` is constructed at startup and handed to both
//! sides; there are no ambient globals. The two directions never share a
//! lock with each other:
//!
//! ```text
//! ┌──────────────┐  EngineCommand   ┌────────────────┐
//! │ BLE adapter  │─────────────────▶│ monitoring loop │
//! │ (writes)     │                  │ (drains at cycle│
//! │              │◀─────────────────│  start)         │
//! └──────────────┘  snapshot +      └────────────────┘
//!                   notify slots
//! ```
//!
//! Inbound writes are validated *before* they are queued, so a malformed
//! payload is rejected on the BLE thread and never reaches the engine.

use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use burster::Limiter;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::warn;

use crate::app::commands::EngineCommand;
use crate::app::events::ChamberSnapshot;
use crate::config::ChamberConfig;
use crate::error::ProtocolError;
use crate::status::StatusFlags;

use super::codec::{
    self, ACTUATOR_STATUS_LEN, CONTROL_TARGETS_LEN, ENVIRONMENTAL_LEN, STAGE_STATE_LEN,
    STATUS_FLAGS_LEN,
};
use super::notify::NotifyHub;
use super::WriteTarget;

/// Depth of the inbound command queue. Writes arrive at human cadence;
/// a full queue means the client is flooding and gets throttled.
const COMMAND_DEPTH: usize = 8;

// ── Write gate ────────────────────────────────────────────────

fn gate_uptime() -> core::time::Duration {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed()
}

/// Token-bucket admission for inbound characteristic writes.
struct WriteGate {
    bucket: burster::TokenBucket<fn() -> core::time::Duration>,
}

impl WriteGate {
    fn new(rate_per_sec: u32, burst: u32) -> Self {
        Self {
            bucket: burster::TokenBucket::new_with_time_provider(
                u64::from(rate_per_sec),
                u64::from(burst),
                gate_uptime as fn() -> core::time::Duration,
            ),
        }
    }

    fn admit(&mut self) -> bool {
        self.bucket.try_consume(1).is_ok()
    }
}

// ── Change tracking for notify-on-change characteristics ──────

#[derive(Default)]
struct PrevFrames {
    status: Option<[u8; STATUS_FLAGS_LEN]>,
    actuators: Option<[u8; ACTUATOR_STATUS_LEN]>,
}

// ── ProtocolLink ──────────────────────────────────────────────

/// Shared state between the protocol stack and the monitoring loop.
pub struct ProtocolLink {
    commands: Channel<CriticalSectionRawMutex, EngineCommand, COMMAND_DEPTH>,
    snapshot: Mutex<ChamberSnapshot>,
    notify: NotifyHub,
    connected: AtomicBool,
    write_gate: Mutex<WriteGate>,
    prev: Mutex<PrevFrames>,
}

impl ProtocolLink {
    pub fn new(config: &ChamberConfig) -> Self {
        Self {
            commands: Channel::new(),
            snapshot: Mutex::new(ChamberSnapshot::default()),
            notify: NotifyHub::new(),
            connected: AtomicBool::new(false),
            write_gate: Mutex::new(WriteGate::new(config.write_rate_per_sec, config.write_burst)),
            prev: Mutex::new(PrevFrames::default()),
        }
    }

    // ── Inbound (protocol → engine) ───────────────────────────

    /// Validate and queue one characteristic write. Any error leaves the
    /// engine state untouched; the caller reports failure to the client.
    pub fn handle_write(&self, target: WriteTarget, payload: &[u8]) -> Result<(), ProtocolError> {
        if !self.admit_write() {
            warn!("{} write throttled", target.name());
            return Err(ProtocolError::Busy);
        }

        let cmd = match target {
            WriteTarget::ControlTargets => {
                EngineCommand::SetTargets(codec::decode_targets(payload).inspect_err(|e| {
                    warn!("{} write rejected: {e}", target.name());
                })?)
            }
            WriteTarget::StageState => {
                EngineCommand::SetStage(codec::decode_stage(payload).inspect_err(|e| {
                    warn!("{} write rejected: {e}", target.name());
                })?)
            }
            WriteTarget::OverrideBits => {
                EngineCommand::SetOverrides(codec::decode_overrides(payload).inspect_err(|e| {
                    warn!("{} write rejected: {e}", target.name());
                })?)
            }
        };

        if self.commands.try_send(cmd).is_err() {
            warn!("{} write dropped: command queue full", target.name());
            return Err(ProtocolError::Busy);
        }
        Ok(())
    }

    /// Next queued command, if any. Drained by the engine at cycle start.
    pub fn next_command(&self) -> Option<EngineCommand> {
        self.commands.try_receive().ok()
    }

    // ── Outbound (engine → protocol) ──────────────────────────

    /// Publish the cycle's snapshot: replace the read state whole, push an
    /// Environmental notification, and push Status/Actuator notifications
    /// only when their encoding changed.
    pub fn publish(&self, mut snapshot: ChamberSnapshot) {
        let mut status = snapshot.status;
        status.assign(StatusFlags::CONNECTIVITY, self.client_connected());
        snapshot.status = status;

        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot;
        }

        if let Some(reading) = snapshot.reading {
            let frame = codec::EnvironmentalFrame::from_reading(&reading).encode();
            self.notify.publish_environmental(frame);
        }

        let status_frame = codec::encode_status(snapshot.status.bits());
        let actuator_frame = codec::encode_actuators(&snapshot.actuators);
        if let Ok(mut prev) = self.prev.lock() {
            if prev.status != Some(status_frame) {
                prev.status = Some(status_frame);
                self.notify.publish_status(status_frame);
            }
            if prev.actuators != Some(actuator_frame) {
                prev.actuators = Some(actuator_frame);
                self.notify.publish_actuators(actuator_frame);
            }
        }
    }

    pub fn notify(&self) -> &NotifyHub {
        &self.notify
    }

    // ── Characteristic reads ──────────────────────────────────

    pub fn snapshot(&self) -> ChamberSnapshot {
        self.snapshot
            .lock()
            .map(|guard| *guard)
            .unwrap_or_default()
    }

    pub fn read_environmental(&self) -> [u8; ENVIRONMENTAL_LEN] {
        match self.snapshot().reading {
            Some(reading) => codec::EnvironmentalFrame::from_reading(&reading).encode(),
            None => [0; ENVIRONMENTAL_LEN],
        }
    }

    pub fn read_targets(&self) -> [u8; CONTROL_TARGETS_LEN] {
        codec::encode_targets(&self.snapshot().targets)
    }

    pub fn read_stage(&self) -> [u8; STAGE_STATE_LEN] {
        codec::encode_stage(&self.snapshot().stage)
    }

    pub fn read_status(&self) -> [u8; STATUS_FLAGS_LEN] {
        codec::encode_status(self.snapshot().status.bits())
    }

    pub fn read_actuators(&self) -> [u8; ACTUATOR_STATUS_LEN] {
        codec::encode_actuators(&self.snapshot().actuators)
    }

    // ── Connection state ──────────────────────────────────────

    pub fn set_client_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }

    pub fn client_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    fn admit_write(&self) -> bool {
        self.write_gate
            .lock()
            .map(|mut gate| gate.admit())
            .unwrap_or(false)
    }
}
