//! Controller configuration parameters
//!
//! All tunable parameters for the MushPi chamber controller. Values are
//! loaded from a JSON file at startup (falling back to defaults) and are
//! fixed for the process lifetime; thresholds and stage state are runtime
//! data and live in the settings store instead.

use serde::{Deserialize, Serialize};

/// GPIO line assignments (BCM numbering) for the relay board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelayPins {
    pub fan: u8,
    pub mist: u8,
    pub light: u8,
    pub heater: u8,
}

impl Default for RelayPins {
    fn default() -> Self {
        Self {
            fan: 17,
            mist: 27,
            light: 22,
            heater: 23,
        }
    }
}

/// Core controller configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChamberConfig {
    // --- Monitoring cycle ---
    /// Monitoring cycle interval (seconds)
    pub monitor_interval_secs: u32,
    /// Minimum time between two transitions of the same relay (seconds)
    pub min_hold_secs: u32,

    // --- Hysteresis bands ---
    /// Temperature deadband (°C)
    pub temp_band_c: f32,
    /// CO₂ deadband (ppm)
    pub co2_band_ppm: f32,
    /// Relative-humidity deadband (%RH)
    pub rh_band_pct: f32,

    // --- Duty-cycle limiting ---
    /// Trailing window length (seconds)
    pub duty_window_secs: u32,
    /// Fan on-time cap within the window (percent)
    pub fan_duty_cap_pct: f32,
    /// Mist on-time cap within the window (percent)
    pub mist_duty_cap_pct: f32,

    // --- Condensation guard ---
    /// Humidity at or above which the guard arms (%RH)
    pub guard_rh_pct: f32,
    /// Continuous time at/above `guard_rh_pct` before the guard activates (seconds)
    pub guard_min_duration_secs: u32,

    // --- Light verification ---
    /// Settle time after a light transition before sampling the photoresistor (seconds)
    pub light_settle_secs: u32,
    /// Photoresistor reading expected at or above this when the lamp is on
    pub light_on_threshold: u16,
    /// Photoresistor reading expected at or below this when the lamp is off
    pub light_off_threshold: u16,
    /// Minimum gap between two verification-failure alerts (seconds)
    pub light_alert_window_secs: u32,

    // --- History ---
    /// Relay-action history retention (seconds)
    pub history_retention_secs: u32,

    // --- Advertising ---
    /// Advertised name prefix (species/stage suffix is appended)
    pub adv_name_prefix: heapless::String<16>,
    /// Registration timeout (seconds)
    pub adv_timeout_secs: u32,
    /// Maximum registration attempts before degrading to name-only
    pub adv_max_attempts: u32,
    /// Base backoff between attempts (seconds), doubled per attempt
    pub adv_backoff_base_secs: u32,
    /// Backoff cap (seconds)
    pub adv_backoff_cap_secs: u32,

    // --- Protocol write gate ---
    /// Sustained characteristic writes admitted per second
    pub write_rate_per_sec: u32,
    /// Write burst capacity
    pub write_burst: u32,

    // --- Paths / pins ---
    /// Settings-store file path
    pub settings_path: String,
    /// Relay GPIO lines
    pub relay_pins: RelayPins,
}

impl Default for ChamberConfig {
    fn default() -> Self {
        Self {
            // Monitoring cycle
            monitor_interval_secs: 30,
            min_hold_secs: 30,

            // Hysteresis
            temp_band_c: 1.0,
            co2_band_ppm: 100.0,
            rh_band_pct: 3.0,

            // Duty cycle
            duty_window_secs: 1800,
            fan_duty_cap_pct: 60.0,
            mist_duty_cap_pct: 40.0,

            // Condensation guard
            guard_rh_pct: 95.0,
            guard_min_duration_secs: 300,

            // Light verification
            light_settle_secs: 30,
            light_on_threshold: 200,
            light_off_threshold: 50,
            light_alert_window_secs: 300,

            // History
            history_retention_secs: 86_400,

            // Advertising
            adv_name_prefix: heapless::String::try_from("MushPi").unwrap_or_default(),
            adv_timeout_secs: 60,
            adv_max_attempts: 3,
            adv_backoff_base_secs: 2,
            adv_backoff_cap_secs: 60,

            // Write gate
            write_rate_per_sec: 10,
            write_burst: 10,

            // Paths / pins
            settings_path: "/var/lib/mushpi/settings.bin".to_string(),
            relay_pins: RelayPins::default(),
        }
    }
}

impl ChamberConfig {
    /// Load from a JSON file. I/O and parse errors are returned for the
    /// caller to warn-and-fallback on; a missing file is not fatal policy
    /// here either.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        cfg.validate().map_err(crate::error::Error::Config)?;
        Ok(cfg)
    }

    /// Range-check every tunable. Invalid configs are rejected, not
    /// clamped, so a bad file cannot quietly disable a safety margin.
    pub fn validate(&self) -> core::result::Result<(), &'static str> {
        if self.monitor_interval_secs == 0 {
            return Err("monitor_interval_secs must be positive");
        }
        if self.temp_band_c <= 0.0 || self.co2_band_ppm <= 0.0 || self.rh_band_pct <= 0.0 {
            return Err("hysteresis bands must be positive");
        }
        if self.duty_window_secs == 0 {
            return Err("duty_window_secs must be positive");
        }
        if !(0.0..=100.0).contains(&self.fan_duty_cap_pct)
            || !(0.0..=100.0).contains(&self.mist_duty_cap_pct)
        {
            return Err("duty caps must be within 0-100%");
        }
        if !(0.0..=100.0).contains(&self.guard_rh_pct) {
            return Err("guard_rh_pct must be within 0-100%");
        }
        if self.light_off_threshold >= self.light_on_threshold {
            return Err("light_off_threshold must be below light_on_threshold");
        }
        if self.adv_max_attempts == 0 {
            return Err("adv_max_attempts must be positive");
        }
        if self.write_rate_per_sec == 0 || self.write_burst == 0 {
            return Err("write gate rate and burst must be positive");
        }
        Ok(())
    }
}
