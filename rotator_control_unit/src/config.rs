//! TOML configuration loader with validation.
//!
//! One file describes a rotator station:
//!
//! ```toml
//! store_path = "rotator_settings.json"
//!
//! [shared]
//! service_name = "dish-north"
//!
//! [cycle]
//! control_period_ms = 100
//! safety_period_ms = 500
//!
//! [sensors]
//! az_address = 0x40
//! el_address = 0x36
//!
//! [defaults]
//! gain_az = 5
//!
//! [wind]
//! manual_override_timeout_s = 60
//!
//! [features]
//! stall_recovery = false
//! ```
//!
//! Every section except `[shared]` may be omitted.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rotator_common::config::{ConfigError, ConfigLoader, SharedConfig};
use rotator_common::consts::{
    AZ_SENSOR_ADDRESS, DEFAULT_BUS_TIMEOUT_US, DEFAULT_CONTROL_PERIOD_MS,
    DEFAULT_MANUAL_OVERRIDE_TIMEOUT_S, DEFAULT_SAFETY_PERIOD_MS, DEFAULT_SAMPLES,
    DEFAULT_STORE_PATH, DEFAULT_STOW_POLL_MS, DEFAULT_TRACKING_POLL_MS, EL_SENSOR_ADDRESS,
    EMERGENCY_GAIN_AZ, EMERGENCY_GAIN_EL,
};
use rotator_common::settings::{ControlSettings, GAIN_RANGE};

use crate::sensor::reader::MAX_SAMPLES;

// ─── Sections ───────────────────────────────────────────────────────

fn default_control_period_ms() -> u64 {
    DEFAULT_CONTROL_PERIOD_MS
}
fn default_safety_period_ms() -> u64 {
    DEFAULT_SAFETY_PERIOD_MS
}
fn default_cpu_core() -> usize {
    1
}
fn default_rt_priority() -> i32 {
    80
}

/// Task periods and RT placement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_control_period_ms")]
    pub control_period_ms: u64,
    #[serde(default = "default_safety_period_ms")]
    pub safety_period_ms: u64,
    /// Core the control thread is pinned to (`rt` feature only).
    #[serde(default = "default_cpu_core")]
    pub cpu_core: usize,
    /// SCHED_FIFO priority of the control thread (`rt` feature only).
    #[serde(default = "default_rt_priority")]
    pub rt_priority: i32,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            control_period_ms: default_control_period_ms(),
            safety_period_ms: default_safety_period_ms(),
            cpu_core: default_cpu_core(),
            rt_priority: default_rt_priority(),
        }
    }
}

fn default_az_address() -> u8 {
    AZ_SENSOR_ADDRESS
}
fn default_el_address() -> u8 {
    EL_SENSOR_ADDRESS
}
fn default_samples() -> usize {
    DEFAULT_SAMPLES
}
fn default_bus_timeout_us() -> u64 {
    DEFAULT_BUS_TIMEOUT_US
}

/// Angle sensor wiring and sampling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorConfig {
    #[serde(default = "default_az_address")]
    pub az_address: u8,
    #[serde(default = "default_el_address")]
    pub el_address: u8,
    /// Samples averaged per reading.
    #[serde(default = "default_samples")]
    pub samples: usize,
    /// Deadline for one register exchange [µs].
    #[serde(default = "default_bus_timeout_us")]
    pub bus_timeout_us: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            az_address: default_az_address(),
            el_address: default_el_address(),
            samples: default_samples(),
            bus_timeout_us: default_bus_timeout_us(),
        }
    }
}

fn default_manual_override_timeout_s() -> u64 {
    DEFAULT_MANUAL_OVERRIDE_TIMEOUT_S
}
fn default_stow_poll_ms() -> u64 {
    DEFAULT_STOW_POLL_MS
}
fn default_tracking_poll_ms() -> u64 {
    DEFAULT_TRACKING_POLL_MS
}
fn default_emergency_gain_az() -> i32 {
    EMERGENCY_GAIN_AZ
}
fn default_emergency_gain_el() -> i32 {
    EMERGENCY_GAIN_EL
}

/// Wind stow and tracking cadence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindConfig {
    /// Quiet period after a manual command before tracking may engage [s].
    #[serde(default = "default_manual_override_timeout_s")]
    pub manual_override_timeout_s: u64,
    #[serde(default = "default_stow_poll_ms")]
    pub stow_poll_interval_ms: u64,
    #[serde(default = "default_tracking_poll_ms")]
    pub tracking_poll_interval_ms: u64,
    /// Gains used while an emergency stow is active.
    #[serde(default = "default_emergency_gain_az")]
    pub emergency_gain_az: i32,
    #[serde(default = "default_emergency_gain_el")]
    pub emergency_gain_el: i32,
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            manual_override_timeout_s: default_manual_override_timeout_s(),
            stow_poll_interval_ms: default_stow_poll_ms(),
            tracking_poll_interval_ms: default_tracking_poll_ms(),
            emergency_gain_az: default_emergency_gain_az(),
            emergency_gain_el: default_emergency_gain_el(),
        }
    }
}

/// Optional behaviors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Jitter a motor whose error stops shrinking.
    #[serde(default)]
    pub stall_recovery: bool,
}

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

/// Complete station configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotatorConfig {
    pub shared: SharedConfig,
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub sensors: SensorConfig,
    /// Tunables used when the store has no value yet.
    #[serde(default)]
    pub defaults: ControlSettings,
    #[serde(default)]
    pub wind: WindConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    /// JSON settings store location.
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            shared: SharedConfig::default(),
            cycle: CycleConfig::default(),
            sensors: SensorConfig::default(),
            defaults: ControlSettings::default(),
            wind: WindConfig::default(),
            features: FeatureConfig::default(),
            store_path: default_store_path(),
        }
    }
}

// ─── Validation ─────────────────────────────────────────────────────

fn check(ok: bool, message: impl FnOnce() -> String) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(message()))
    }
}

impl RotatorConfig {
    /// Check every section's bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let c = &self.cycle;
        check((10..=1_000).contains(&c.control_period_ms), || {
            format!("cycle.control_period_ms {} outside [10, 1000]", c.control_period_ms)
        })?;
        check((50..=10_000).contains(&c.safety_period_ms), || {
            format!("cycle.safety_period_ms {} outside [50, 10000]", c.safety_period_ms)
        })?;
        check(c.safety_period_ms >= c.control_period_ms, || {
            "cycle.safety_period_ms must not be shorter than control_period_ms".to_string()
        })?;
        check((1..=99).contains(&c.rt_priority), || {
            format!("cycle.rt_priority {} outside [1, 99]", c.rt_priority)
        })?;

        let s = &self.sensors;
        check(s.az_address <= 0x7F && s.el_address <= 0x7F, || {
            "sensors addresses must be 7-bit".to_string()
        })?;
        check(s.az_address != s.el_address, || {
            format!("sensors share address 0x{:02X}", s.az_address)
        })?;
        check((1..=MAX_SAMPLES).contains(&s.samples), || {
            format!("sensors.samples {} outside [1, {MAX_SAMPLES}]", s.samples)
        })?;
        check((100..=100_000).contains(&s.bus_timeout_us), || {
            format!("sensors.bus_timeout_us {} outside [100, 100000]", s.bus_timeout_us)
        })?;

        self.defaults
            .validate()
            .map_err(|e| ConfigError::ValidationError(format!("defaults: {e}")))?;

        let w = &self.wind;
        check(w.manual_override_timeout_s <= 3_600, || {
            format!("wind.manual_override_timeout_s {} above 3600", w.manual_override_timeout_s)
        })?;
        check((100..=60_000).contains(&w.stow_poll_interval_ms), || {
            format!("wind.stow_poll_interval_ms {} outside [100, 60000]", w.stow_poll_interval_ms)
        })?;
        check((100..=600_000).contains(&w.tracking_poll_interval_ms), || {
            format!(
                "wind.tracking_poll_interval_ms {} outside [100, 600000]",
                w.tracking_poll_interval_ms
            )
        })?;
        let gains = GAIN_RANGE.0..=GAIN_RANGE.1;
        check(
            gains.contains(&(w.emergency_gain_az as f64)) && gains.contains(&(w.emergency_gain_el as f64)),
            || "wind emergency gains outside [-1000, 1000]".to_string(),
        )?;

        check(!self.store_path.as_os_str().is_empty(), || {
            "store_path cannot be empty".to_string()
        })?;
        Ok(())
    }

    /// Load and validate a configuration file.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }
}
