//! LE advertisement lifecycle.
//!
//! Registration against the host BLE stack can fail in three distinct
//! ways, each with its own recovery:
//!
//! - **Timeout** — log and continue *without* the service-UUID
//!   advertisement; the adapter stays connectable by name (degraded, not
//!   down).
//! - **Already exists** — a stale advertisement from a previous
//!   incarnation is squatting on the path; unregister it and retry under a
//!   fresh uniquely-numbered instance.
//! - **Transient bus failure** — bounded exponential backoff
//!   (2 s → 4 s → … capped), then degrade.
//!
//! The manager holds the policy and state machine; the actual D-Bus calls
//! live behind [`AdvertisingPort`] so the whole lifecycle is testable with
//! a scripted mock.

use core::fmt;
use core::time::Duration;

use log::{info, warn};

use crate::chamber::{GrowthStage, Species};
use crate::config::ChamberConfig;

// ───────────────────────────────────────────────────────────────
// Advertising name
// ───────────────────────────────────────────────────────────────

/// Build the advertised local name, e.g. `MushPi-OysterPinning`.
pub fn advertising_name(prefix: &str, species: Species, stage: GrowthStage) -> heapless::String<32> {
    let mut name = heapless::String::new();
    // Truncation below 32 bytes cannot happen with the catalogued names;
    // a pathological prefix just yields a shortened name.
    let _ = name.push_str(prefix);
    let _ = name.push('-');
    let _ = name.push_str(species.name());
    let _ = name.push_str(stage.name());
    name
}

// ───────────────────────────────────────────────────────────────
// Port + errors
// ───────────────────────────────────────────────────────────────

/// What the manager asks the platform stack to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisementSpec {
    pub name: heapless::String<32>,
    pub service_uuid: u128,
    /// Unique instance number, namespacing the registration path.
    pub instance: u32,
    /// How long the port may block waiting for the stack.
    pub timeout: Duration,
}

/// Registration failures, classified for recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvertiseError {
    /// The stack did not acknowledge within the timeout.
    Timeout,
    /// An advertisement already exists at the requested path.
    AlreadyExists,
    /// Transient bus/stack failure.
    Bus(&'static str),
}

impl fmt::Display for AdvertiseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "registration timed out"),
            Self::AlreadyExists => write!(f, "advertisement already exists"),
            Self::Bus(msg) => write!(f, "bus failure: {msg}"),
        }
    }
}

/// Platform registration surface. The `bluez` adapter implements this
/// against BlueZ; tests script it.
pub trait AdvertisingPort {
    fn register(&mut self, spec: &AdvertisementSpec) -> Result<(), AdvertiseError>;

    /// Tear down a (possibly stale) registration. Best-effort.
    fn unregister(&mut self, instance: u32);
}

// ───────────────────────────────────────────────────────────────
// Retry policy
// ───────────────────────────────────────────────────────────────

/// Bounded exponential backoff for transient failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
    pub cap: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &ChamberConfig) -> Self {
        Self {
            max_attempts: config.adv_max_attempts,
            base: Duration::from_secs(u64::from(config.adv_backoff_base_secs)),
            cap: Duration::from_secs(u64::from(config.adv_backoff_cap_secs)),
        }
    }

    /// Backoff before retry number `attempt` (0-based): base · 2^attempt,
    /// capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base.saturating_mul(factor).min(self.cap)
    }
}

// ───────────────────────────────────────────────────────────────
// Manager
// ───────────────────────────────────────────────────────────────

/// Where the advertisement ended up after `bring_up`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisingState {
    /// Service-UUID advertisement registered under the given instance.
    Registered { instance: u32 },
    /// No service advertisement; device remains connectable by name only.
    Degraded,
}

/// Advertisement registration state machine.
pub struct AdvertisingManager {
    policy: RetryPolicy,
    timeout: Duration,
    next_instance: u32,
}

impl AdvertisingManager {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            policy,
            timeout,
            next_instance: 0,
        }
    }

    pub fn from_config(config: &ChamberConfig) -> Self {
        Self::new(
            RetryPolicy::from_config(config),
            Duration::from_secs(u64::from(config.adv_timeout_secs)),
        )
    }

    /// Register the advertisement, applying the recovery rules above.
    /// `sleep` is injected so tests run without wall-clock delays.
    pub fn bring_up(
        &mut self,
        port: &mut impl AdvertisingPort,
        name: heapless::String<32>,
        service_uuid: u128,
        sleep: &mut impl FnMut(Duration),
    ) -> AdvertisingState {
        let mut backoff_attempt = 0u32;

        for attempt in 0..self.policy.max_attempts {
            let spec = AdvertisementSpec {
                name: name.clone(),
                service_uuid,
                instance: self.alloc_instance(),
                timeout: self.timeout,
            };

            match port.register(&spec) {
                Ok(()) => {
                    info!(
                        "advertisement '{}' registered (instance {})",
                        spec.name, spec.instance
                    );
                    return AdvertisingState::Registered {
                        instance: spec.instance,
                    };
                }
                Err(AdvertiseError::Timeout) => {
                    // The stack is alive but unresponsive; the device is
                    // still connectable by name, so degrade rather than
                    // hammer the bus.
                    warn!(
                        "advertisement registration timed out after {:?}; \
                         continuing name-only",
                        self.timeout
                    );
                    return AdvertisingState::Degraded;
                }
                Err(AdvertiseError::AlreadyExists) => {
                    warn!(
                        "stale advertisement at instance {}; unregistering and retrying",
                        spec.instance
                    );
                    port.unregister(spec.instance);
                    // Retry immediately under a fresh instance; no backoff
                    // because the bus itself answered.
                }
                Err(AdvertiseError::Bus(msg)) => {
                    let delay = self.policy.backoff(backoff_attempt);
                    backoff_attempt += 1;
                    warn!(
                        "advertisement registration failed ({msg}), attempt {}/{}, \
                         retrying in {:?}",
                        attempt + 1,
                        self.policy.max_attempts,
                        delay
                    );
                    sleep(delay);
                }
            }
        }

        warn!("advertisement registration exhausted retries; continuing name-only");
        AdvertisingState::Degraded
    }

    fn alloc_instance(&mut self) -> u32 {
        let instance = self.next_instance;
        self.next_instance = self.next_instance.wrapping_add(1);
        instance
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
