//! Operator-tunable control settings.
//!
//! [`ControlSettings`] is the plain snapshot used for configuration defaults
//! and persistence. [`Setting`] names each tunable, carries its storage key
//! and its accepted range.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Axis;

// ─── Bounds ─────────────────────────────────────────────────────────

/// Accepted proportional gain range (inclusive).
pub const GAIN_RANGE: (f64, f64) = (-1000.0, 1000.0);

/// Accepted minimum-speed and speed-ceiling range (inclusive duty values).
pub const SPEED_RANGE: (f64, f64) = (0.0, 255.0);

/// Accepted tolerance range: `(0, 10]` degrees.
pub const TOLERANCE_RANGE: (f64, f64) = (0.0, 10.0);

/// Accepted power limit range: `(0, 25)` watts.
pub const MAX_POWER_RANGE: (f64, f64) = (0.0, 25.0);

/// Accepted voltage limit range: `(0, 20)` volts.
pub const MIN_VOLTAGE_RANGE: (f64, f64) = (0.0, 20.0);

/// Rejected parameter update.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParameterError {
    #[error("{setting} = {value} is outside {range}")]
    OutOfRange {
        setting: &'static str,
        value: f64,
        range: &'static str,
    },

    #[error("{setting} must be a whole number, got {value}")]
    NotInteger { setting: &'static str, value: f64 },
}

/// Which ceiling table a speed limit belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CeilingMode {
    /// Both motors may run.
    Dual,
    /// Only one motor runs at a time.
    Single,
}

/// A named tunable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Setting {
    Gain(Axis),
    MinSpeed(Axis),
    Tolerance(Axis),
    SpeedCeiling(CeilingMode, Axis),
    MaxPower,
    MinVoltage,
}

impl Setting {
    /// Storage key.
    pub const fn key(self) -> &'static str {
        match self {
            Self::Gain(Axis::Azimuth) => "gain_az",
            Self::Gain(Axis::Elevation) => "gain_el",
            Self::MinSpeed(Axis::Azimuth) => "min_speed_az",
            Self::MinSpeed(Axis::Elevation) => "min_speed_el",
            Self::Tolerance(Axis::Azimuth) => "tolerance_az",
            Self::Tolerance(Axis::Elevation) => "tolerance_el",
            Self::SpeedCeiling(CeilingMode::Dual, Axis::Azimuth) => "max_dual_speed_az",
            Self::SpeedCeiling(CeilingMode::Dual, Axis::Elevation) => "max_dual_speed_el",
            Self::SpeedCeiling(CeilingMode::Single, Axis::Azimuth) => "max_single_speed_az",
            Self::SpeedCeiling(CeilingMode::Single, Axis::Elevation) => "max_single_speed_el",
            Self::MaxPower => "max_power_w",
            Self::MinVoltage => "min_voltage_v",
        }
    }

    /// True for settings stored as whole numbers.
    pub const fn is_integer(self) -> bool {
        !matches!(self, Self::Tolerance(_))
    }

    /// Check `value` against this setting's range.
    pub fn validate(self, value: f64) -> Result<(), ParameterError> {
        let setting = self.key();
        if self.is_integer() && value.fract() != 0.0 {
            return Err(ParameterError::NotInteger { setting, value });
        }
        let (lo, hi) = self.range();
        let ok = match self {
            Self::Gain(_) | Self::MinSpeed(_) | Self::SpeedCeiling(..) => {
                value >= lo && value <= hi
            }
            Self::Tolerance(_) => value > lo && value <= hi,
            Self::MaxPower | Self::MinVoltage => value > lo && value < hi,
        };
        if ok {
            Ok(())
        } else {
            Err(ParameterError::OutOfRange {
                setting,
                value,
                range: self.range_text(),
            })
        }
    }

    fn range(self) -> (f64, f64) {
        match self {
            Self::Gain(_) => GAIN_RANGE,
            Self::MinSpeed(_) | Self::SpeedCeiling(..) => SPEED_RANGE,
            Self::Tolerance(_) => TOLERANCE_RANGE,
            Self::MaxPower => MAX_POWER_RANGE,
            Self::MinVoltage => MIN_VOLTAGE_RANGE,
        }
    }

    fn range_text(self) -> &'static str {
        match self {
            Self::Gain(_) => "[-1000, 1000]",
            Self::MinSpeed(_) | Self::SpeedCeiling(..) => "[0, 255]",
            Self::Tolerance(_) => "(0, 10]",
            Self::MaxPower => "(0, 25)",
            Self::MinVoltage => "(0, 20)",
        }
    }
}

// ─── Snapshot ───────────────────────────────────────────────────────

fn default_gain_az() -> i32 {
    5
}
fn default_gain_el() -> i32 {
    100
}
fn default_min_speed_az() -> i32 {
    100
}
fn default_min_speed_el() -> i32 {
    50
}
fn default_tolerance_az() -> f32 {
    1.5
}
fn default_tolerance_el() -> f32 {
    0.1
}
fn default_max_power_w() -> i32 {
    10
}
fn default_min_voltage_v() -> i32 {
    6
}

/// All tunables in one value.
///
/// Deserializes from the `[defaults]` table of the control unit config;
/// omitted fields take the factory value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlSettings {
    #[serde(default = "default_gain_az")]
    pub gain_az: i32,
    #[serde(default = "default_gain_el")]
    pub gain_el: i32,
    #[serde(default = "default_min_speed_az")]
    pub min_speed_az: i32,
    #[serde(default = "default_min_speed_el")]
    pub min_speed_el: i32,
    #[serde(default = "default_tolerance_az")]
    pub tolerance_az: f32,
    #[serde(default = "default_tolerance_el")]
    pub tolerance_el: f32,
    #[serde(default = "default_max_power_w")]
    pub max_power_w: i32,
    #[serde(default = "default_min_voltage_v")]
    pub min_voltage_v: i32,
    /// Duty ceilings; 0 allows full drive.
    #[serde(default)]
    pub max_dual_speed_az: i32,
    #[serde(default)]
    pub max_dual_speed_el: i32,
    #[serde(default)]
    pub max_single_speed_az: i32,
    #[serde(default)]
    pub max_single_speed_el: i32,
    #[serde(default)]
    pub single_motor_mode: bool,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            gain_az: default_gain_az(),
            gain_el: default_gain_el(),
            min_speed_az: default_min_speed_az(),
            min_speed_el: default_min_speed_el(),
            tolerance_az: default_tolerance_az(),
            tolerance_el: default_tolerance_el(),
            max_power_w: default_max_power_w(),
            min_voltage_v: default_min_voltage_v(),
            max_dual_speed_az: 0,
            max_dual_speed_el: 0,
            max_single_speed_az: 0,
            max_single_speed_el: 0,
            single_motor_mode: false,
        }
    }
}

impl ControlSettings {
    /// Value of a numeric setting.
    pub fn get(&self, setting: Setting) -> f64 {
        match setting {
            Setting::Gain(Axis::Azimuth) => self.gain_az as f64,
            Setting::Gain(Axis::Elevation) => self.gain_el as f64,
            Setting::MinSpeed(Axis::Azimuth) => self.min_speed_az as f64,
            Setting::MinSpeed(Axis::Elevation) => self.min_speed_el as f64,
            Setting::Tolerance(Axis::Azimuth) => self.tolerance_az as f64,
            Setting::Tolerance(Axis::Elevation) => self.tolerance_el as f64,
            Setting::SpeedCeiling(CeilingMode::Dual, Axis::Azimuth) => self.max_dual_speed_az as f64,
            Setting::SpeedCeiling(CeilingMode::Dual, Axis::Elevation) => self.max_dual_speed_el as f64,
            Setting::SpeedCeiling(CeilingMode::Single, Axis::Azimuth) => {
                self.max_single_speed_az as f64
            }
            Setting::SpeedCeiling(CeilingMode::Single, Axis::Elevation) => {
                self.max_single_speed_el as f64
            }
            Setting::MaxPower => self.max_power_w as f64,
            Setting::MinVoltage => self.min_voltage_v as f64,
        }
    }

    /// Every numeric setting, in a fixed order.
    pub const ALL: [Setting; 12] = [
        Setting::Gain(Axis::Azimuth),
        Setting::Gain(Axis::Elevation),
        Setting::MinSpeed(Axis::Azimuth),
        Setting::MinSpeed(Axis::Elevation),
        Setting::Tolerance(Axis::Azimuth),
        Setting::Tolerance(Axis::Elevation),
        Setting::SpeedCeiling(CeilingMode::Dual, Axis::Azimuth),
        Setting::SpeedCeiling(CeilingMode::Dual, Axis::Elevation),
        Setting::SpeedCeiling(CeilingMode::Single, Axis::Azimuth),
        Setting::SpeedCeiling(CeilingMode::Single, Axis::Elevation),
        Setting::MaxPower,
        Setting::MinVoltage,
    ];

    /// Check every field against its range.
    pub fn validate(&self) -> Result<(), ParameterError> {
        Self::ALL
            .iter()
            .try_for_each(|&setting| setting.validate(self.get(setting)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_defaults_are_valid() {
        let defaults = ControlSettings::default();
        assert!(defaults.validate().is_ok());
        assert_eq!(defaults.gain_el, 100);
        assert_eq!(defaults.min_speed_az, 100);
        assert!((defaults.tolerance_el - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn gain_bounds_are_inclusive() {
        assert!(Setting::Gain(Axis::Azimuth).validate(1000.0).is_ok());
        assert!(Setting::Gain(Axis::Azimuth).validate(-1000.0).is_ok());
        assert!(Setting::Gain(Axis::Azimuth).validate(1001.0).is_err());
    }

    #[test]
    fn tolerance_excludes_zero() {
        let tol = Setting::Tolerance(Axis::Elevation);
        assert!(tol.validate(0.0).is_err());
        assert!(tol.validate(10.0).is_ok());
        assert!(tol.validate(0.05).is_ok());
        assert!(tol.validate(10.01).is_err());
    }

    #[test]
    fn power_and_voltage_are_open_ranges() {
        assert!(Setting::MaxPower.validate(25.0).is_err());
        assert!(Setting::MaxPower.validate(24.0).is_ok());
        assert!(Setting::MinVoltage.validate(0.0).is_err());
        assert!(Setting::MinVoltage.validate(12.0).is_ok());
    }

    #[test]
    fn integer_settings_reject_fractions() {
        let err = Setting::MinSpeed(Axis::Azimuth).validate(12.5).unwrap_err();
        assert!(matches!(err, ParameterError::NotInteger { .. }));
        assert!(err.to_string().contains("min_speed_az"));
    }

    #[test]
    fn keys_are_unique() {
        let mut keys: Vec<_> = ControlSettings::ALL.iter().map(|s| s.key()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), ControlSettings::ALL.len());
    }

    #[test]
    fn settings_index_a_hash_set() {
        let set: std::collections::HashSet<Setting> = ControlSettings::ALL.into_iter().collect();
        assert_eq!(set.len(), ControlSettings::ALL.len());
        assert!(set.contains(&Setting::SpeedCeiling(CeilingMode::Single, Axis::Elevation)));
        assert_ne!(
            Setting::SpeedCeiling(CeilingMode::Dual, Axis::Azimuth),
            Setting::SpeedCeiling(CeilingMode::Single, Axis::Azimuth)
        );
    }

    #[test]
    fn partial_table_fills_factory_values() {
        let parsed: ControlSettings = toml::from_str("gain_az = 7\nsingle_motor_mode = true").unwrap();
        assert_eq!(parsed.gain_az, 7);
        assert_eq!(parsed.gain_el, 100);
        assert!(parsed.single_motor_mode);
    }

    #[test]
    fn out_of_range_field_fails_validation() {
        let settings = ControlSettings {
            min_speed_el: 300,
            ..ControlSettings::default()
        };
        let err = settings.validate().unwrap_err();
        assert_eq!(
            err,
            ParameterError::OutOfRange {
                setting: "min_speed_el",
                value: 300.0,
                range: "[0, 255]",
            }
        );
    }
}
