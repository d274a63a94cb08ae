//! Latest-value-wins notification slots.
//!
//! The monitoring cycle publishes encoded frames here without ever
//! blocking; the BLE side awaits them at its own pace. Each characteristic
//! has a depth-1 slot — if the consumer is slow, a newer frame simply
//! replaces the unsent one. A stalled BLE stack therefore costs stale
//! notifications, never a stalled control cycle.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

use super::codec::{ACTUATOR_STATUS_LEN, ENVIRONMENTAL_LEN, STATUS_FLAGS_LEN};

type Slot<const N: usize> = Signal<CriticalSectionRawMutex, [u8; N]>;

/// One slot per notifying characteristic.
pub struct NotifyHub {
    environmental: Slot<ENVIRONMENTAL_LEN>,
    status: Slot<STATUS_FLAGS_LEN>,
    actuators: Slot<ACTUATOR_STATUS_LEN>,
}

impl NotifyHub {
    pub const fn new() -> Self {
        Self {
            environmental: Signal::new(),
            status: Signal::new(),
            actuators: Signal::new(),
        }
    }

    // ── Producer side (monitoring cycle) ──────────────────────

    pub fn publish_environmental(&self, frame: [u8; ENVIRONMENTAL_LEN]) {
        self.environmental.signal(frame);
    }

    pub fn publish_status(&self, frame: [u8; STATUS_FLAGS_LEN]) {
        self.status.signal(frame);
    }

    pub fn publish_actuators(&self, frame: [u8; ACTUATOR_STATUS_LEN]) {
        self.actuators.signal(frame);
    }

    // ── Consumer side (BLE stack / sim pump) ──────────────────

    pub async fn wait_environmental(&self) -> [u8; ENVIRONMENTAL_LEN] {
        self.environmental.wait().await
    }

    pub async fn wait_status(&self) -> [u8; STATUS_FLAGS_LEN] {
        self.status.wait().await
    }

    pub async fn wait_actuators(&self) -> [u8; ACTUATOR_STATUS_LEN] {
        self.actuators.wait().await
    }

    /// Non-blocking poll, used by tests and the sim pump.
    pub fn try_take_environmental(&self) -> Option<[u8; ENVIRONMENTAL_LEN]> {
        self.environmental.try_take()
    }

    pub fn try_take_status(&self) -> Option<[u8; STATUS_FLAGS_LEN]> {
        self.status.try_take()
    }

    pub fn try_take_actuators(&self) -> Option<[u8; ACTUATOR_STATUS_LEN]> {
        self.actuators.try_take()
    }
}

impl Default for NotifyHub {
    fn default() -> Self {
        Self::new()
    }
}
