//! MushPi chamber controller — daemon entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  SimChamber / GpioRelays   LogEventSink   FileStore  WallClock │
//! │  (Sensor+Relay ports)      (EventSink)    (Settings) (time)    │
//! │  BlueZ GATT stack ── ProtocolLink ── notification hub          │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ControlEngine (pure logic)                  │    │
//! │  │  hysteresis · duty cycle · guard · schedule · modes    │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Two execution contexts: this thread runs the monitoring cycle at a
//! fixed interval (overrun ticks are dropped, not queued); the protocol
//! stack runs on its own thread and talks to the engine only through the
//! [`ProtocolLink`].

#![deny(unused_must_use)]

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use log::{info, warn};

use mushpi::adapters::clock::WallClock;
use mushpi::adapters::log_sink::LogEventSink;
use mushpi::adapters::store::FileStore;
use mushpi::app::ports::{PersistedSettings, SettingsPort};
use mushpi::app::service::ControlEngine;
use mushpi::config::ChamberConfig;
use mushpi::error::StoreError;
use mushpi::protocol::link::ProtocolLink;

const DEFAULT_CONFIG_PATH: &str = "/etc/mushpi/config.json";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("MushPi chamber controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 1. Configuration ──────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = match ChamberConfig::load(&config_path) {
        Ok(cfg) => {
            info!("config loaded from {config_path}");
            cfg
        }
        Err(e) => {
            warn!("config load failed ({e}), using defaults");
            ChamberConfig::default()
        }
    };

    // ── 2. Persisted settings ─────────────────────────────────
    let store = FileStore::new(&config.settings_path);
    let persisted = match store.load() {
        Ok(s) => {
            info!("settings restored ({} mode persisted)", s.mode);
            s
        }
        Err(StoreError::NotFound) => {
            info!("no persisted settings (first boot), using defaults");
            PersistedSettings::default()
        }
        Err(e) => {
            warn!("settings load failed ({e}), using defaults");
            PersistedSettings::default()
        }
    };

    // ── 3. Hardware adapters ──────────────────────────────────
    let (mut hw, simulated) = build_hardware(&config)?;
    if simulated {
        info!("running against the simulated chamber");
    }

    // ── 4. Protocol link + stack thread ───────────────────────
    let link = Arc::new(ProtocolLink::new(&config));
    spawn_protocol_stack(link.clone(), config.clone())?;

    // ── 5. Control engine ─────────────────────────────────────
    let mut engine = ControlEngine::new(&config, persisted, simulated);
    let mut sink = LogEventSink::new();
    engine.start(&mut sink);

    // Seed the snapshot so early reads see the restored settings.
    link.publish(engine.snapshot());

    // ── 6. Monitoring loop ────────────────────────────────────
    let wall = WallClock::new();
    let interval = Duration::from_secs(u64::from(config.monitor_interval_secs));
    let mut next_deadline = Instant::now() + interval;

    info!(
        "monitoring loop up, {}s interval",
        config.monitor_interval_secs
    );

    loop {
        // Protocol writes land at the cycle boundary, never mid-cycle.
        while let Some(cmd) = link.next_command() {
            engine.handle_command(cmd, &store, &mut sink);
        }

        engine.run_cycle(wall.now(), &mut hw, &mut sink);
        link.publish(engine.snapshot());

        // Back-pressure by dropping ticks: if a cycle overran the
        // interval, skip the missed deadlines rather than queueing them.
        let now = Instant::now();
        if now >= next_deadline {
            let mut skipped = 0u32;
            while next_deadline <= now {
                next_deadline += interval;
                skipped += 1;
            }
            warn!("monitoring cycle overran; dropped {skipped} tick(s)");
        }
        thread::sleep(next_deadline.saturating_duration_since(Instant::now()));
        next_deadline += interval;
    }
}

// ── Hardware selection ────────────────────────────────────────

#[cfg(feature = "sim")]
#[allow(clippy::unnecessary_wraps)]
fn build_hardware(
    _config: &ChamberConfig,
) -> Result<(mushpi::adapters::sim::SimChamber, bool)> {
    Ok((mushpi::adapters::sim::SimChamber::new(), true))
}

#[cfg(all(not(feature = "sim"), feature = "rpi"))]
fn build_hardware(
    config: &ChamberConfig,
) -> Result<(
    mushpi::adapters::SplitHardware<
        mushpi::adapters::DisconnectedSensors,
        mushpi::adapters::gpio::GpioRelays,
    >,
    bool,
)> {
    Ok((
        mushpi::adapters::SplitHardware {
            sensors: mushpi::adapters::DisconnectedSensors,
            relays: mushpi::adapters::gpio::GpioRelays::new(&config.relay_pins)?,
        },
        false,
    ))
}

#[cfg(all(not(feature = "sim"), not(feature = "rpi")))]
#[allow(clippy::unnecessary_wraps)]
fn build_hardware(
    _config: &ChamberConfig,
) -> Result<(
    mushpi::adapters::SplitHardware<mushpi::adapters::DisconnectedSensors, mushpi::adapters::LogRelays>,
    bool,
)> {
    Ok((
        mushpi::adapters::SplitHardware {
            sensors: mushpi::adapters::DisconnectedSensors,
            relays: mushpi::adapters::LogRelays,
        },
        false,
    ))
}

// ── Protocol stack ────────────────────────────────────────────

#[cfg(feature = "bluez")]
fn spawn_protocol_stack(link: Arc<ProtocolLink>, config: ChamberConfig) -> Result<()> {
    thread::Builder::new().name("ble-stack".into()).spawn(move || {
        let rt = match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(rt) => rt,
            Err(e) => {
                warn!("BLE runtime init failed: {e}; protocol stack disabled");
                return;
            }
        };
        if let Err(e) = rt.block_on(mushpi::adapters::ble::run(link, config)) {
            warn!("BLE stack exited: {e}; continuing without protocol front end");
        }
    })?;
    Ok(())
}

/// Without BlueZ compiled in, a pump thread drains the notification hub
/// into the journal so the protocol side of the loop is still exercised.
#[cfg(not(feature = "bluez"))]
fn spawn_protocol_stack(link: Arc<ProtocolLink>, _config: ChamberConfig) -> Result<()> {
    thread::Builder::new()
        .name("notify-pump".into())
        .spawn(move || {
            futures_lite::future::block_on(async move {
                loop {
                    let frame = link.notify().wait_environmental().await;
                    log::debug!("env notification: {frame:02x?}");
                }
            });
        })?;
    Ok(())
}
