//! Runtime tunables.
//!
//! Every setting lives in its own atomic so the control loop reads it
//! without locking while a caller updates it. Writers validate first, update
//! the atomic, then persist (the persistence step belongs to the caller).

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU32, Ordering};

use tracing::warn;

use rotator_common::consts::KEY_SINGLE_MOTOR_MODE;
use rotator_common::settings::{CeilingMode, ControlSettings, ParameterError, Setting};
use rotator_common::state::{Axis, PerAxis};
use rotator_common::store::KeyValueStore;

/// `f32` stored as its bit pattern.
#[derive(Debug, Default)]
pub(crate) struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub(crate) fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub(crate) fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    #[inline]
    pub(crate) fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Release);
    }
}

#[derive(Debug)]
pub struct Tunables {
    gain: PerAxis<AtomicI32>,
    min_speed: PerAxis<AtomicI32>,
    tolerance: PerAxis<AtomicF32>,
    dual_ceiling: PerAxis<AtomicI32>,
    single_ceiling: PerAxis<AtomicI32>,
    max_power_w: AtomicI32,
    min_voltage_v: AtomicI32,
    single_motor_mode: AtomicBool,
}

impl Tunables {
    pub fn new(settings: &ControlSettings) -> Self {
        let int = |s: Setting| AtomicI32::new(settings.get(s) as i32);
        Self {
            gain: PerAxis::from_fn(|a| int(Setting::Gain(a))),
            min_speed: PerAxis::from_fn(|a| int(Setting::MinSpeed(a))),
            tolerance: PerAxis::from_fn(|a| {
                AtomicF32::new(settings.get(Setting::Tolerance(a)) as f32)
            }),
            dual_ceiling: PerAxis::from_fn(|a| int(Setting::SpeedCeiling(CeilingMode::Dual, a))),
            single_ceiling: PerAxis::from_fn(|a| {
                int(Setting::SpeedCeiling(CeilingMode::Single, a))
            }),
            max_power_w: int(Setting::MaxPower),
            min_voltage_v: int(Setting::MinVoltage),
            single_motor_mode: AtomicBool::new(settings.single_motor_mode),
        }
    }

    /// Start from `defaults` and overlay every valid value found in `store`.
    ///
    /// Stored values that fail validation are ignored with a warning.
    pub fn load(store: &dyn KeyValueStore, defaults: &ControlSettings) -> Self {
        let tunables = Self::new(defaults);
        for setting in ControlSettings::ALL {
            let Some(value) = store.get(setting.key()).and_then(|v| v.as_f64()) else {
                continue;
            };
            if let Err(e) = tunables.apply(setting, value) {
                warn!("ignoring stored setting: {e}");
            }
        }
        let single = store.get_bool_or(KEY_SINGLE_MOTOR_MODE, defaults.single_motor_mode);
        tunables.set_single_motor_mode(single);
        tunables
    }

    /// Validate and apply one setting.
    pub fn apply(&self, setting: Setting, value: f64) -> Result<(), ParameterError> {
        setting.validate(value)?;
        let int = value as i32;
        match setting {
            Setting::Gain(axis) => self.gain[axis].store(int, Ordering::Release),
            Setting::MinSpeed(axis) => self.min_speed[axis].store(int, Ordering::Release),
            Setting::Tolerance(axis) => self.tolerance[axis].store(value as f32),
            Setting::SpeedCeiling(CeilingMode::Dual, axis) => {
                self.dual_ceiling[axis].store(int, Ordering::Release)
            }
            Setting::SpeedCeiling(CeilingMode::Single, axis) => {
                self.single_ceiling[axis].store(int, Ordering::Release)
            }
            Setting::MaxPower => self.max_power_w.store(int, Ordering::Release),
            Setting::MinVoltage => self.min_voltage_v.store(int, Ordering::Release),
        }
        Ok(())
    }

    /// Current value of a numeric setting.
    pub fn get(&self, setting: Setting) -> f64 {
        match setting {
            Setting::Gain(axis) => self.gain(axis) as f64,
            Setting::MinSpeed(axis) => self.min_speed(axis) as f64,
            Setting::Tolerance(axis) => self.tolerance(axis) as f64,
            Setting::SpeedCeiling(mode, axis) => self.ceiling(mode, axis) as f64,
            Setting::MaxPower => self.max_power_w() as f64,
            Setting::MinVoltage => self.min_voltage_v() as f64,
        }
    }

    #[inline]
    pub fn gain(&self, axis: Axis) -> i32 {
        self.gain[axis].load(Ordering::Acquire)
    }

    #[inline]
    pub fn min_speed(&self, axis: Axis) -> i32 {
        self.min_speed[axis].load(Ordering::Acquire)
    }

    #[inline]
    pub fn tolerance(&self, axis: Axis) -> f32 {
        self.tolerance[axis].load()
    }

    pub fn tolerances(&self) -> PerAxis<f32> {
        PerAxis::from_fn(|axis| self.tolerance(axis))
    }

    #[inline]
    pub fn ceiling(&self, mode: CeilingMode, axis: Axis) -> i32 {
        match mode {
            CeilingMode::Dual => self.dual_ceiling[axis].load(Ordering::Acquire),
            CeilingMode::Single => self.single_ceiling[axis].load(Ordering::Acquire),
        }
    }

    pub fn max_power_w(&self) -> i32 {
        self.max_power_w.load(Ordering::Acquire)
    }

    pub fn min_voltage_v(&self) -> i32 {
        self.min_voltage_v.load(Ordering::Acquire)
    }

    pub fn single_motor_mode(&self) -> bool {
        self.single_motor_mode.load(Ordering::Acquire)
    }

    pub fn set_single_motor_mode(&self, enabled: bool) {
        self.single_motor_mode.store(enabled, Ordering::Release);
    }

    /// Plain copy of every tunable.
    pub fn snapshot(&self) -> ControlSettings {
        ControlSettings {
            gain_az: self.gain(Axis::Azimuth),
            gain_el: self.gain(Axis::Elevation),
            min_speed_az: self.min_speed(Axis::Azimuth),
            min_speed_el: self.min_speed(Axis::Elevation),
            tolerance_az: self.tolerance(Axis::Azimuth),
            tolerance_el: self.tolerance(Axis::Elevation),
            max_power_w: self.max_power_w(),
            min_voltage_v: self.min_voltage_v(),
            max_dual_speed_az: self.ceiling(CeilingMode::Dual, Axis::Azimuth),
            max_dual_speed_el: self.ceiling(CeilingMode::Dual, Axis::Elevation),
            max_single_speed_az: self.ceiling(CeilingMode::Single, Axis::Azimuth),
            max_single_speed_el: self.ceiling(CeilingMode::Single, Axis::Elevation),
            single_motor_mode: self.single_motor_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotator_common::store::{MemoryStore, StoredValue};

    #[test]
    fn new_mirrors_settings() {
        let defaults = ControlSettings::default();
        assert_eq!(Tunables::new(&defaults).snapshot(), defaults);
    }

    #[test]
    fn apply_rejects_out_of_range_and_keeps_old_value() {
        let t = Tunables::new(&ControlSettings::default());
        assert!(t.apply(Setting::Gain(Axis::Azimuth), 2000.0).is_err());
        assert_eq!(t.gain(Axis::Azimuth), 5);
        assert!(t.apply(Setting::Tolerance(Axis::Elevation), 0.0).is_err());
        assert!((t.tolerance(Axis::Elevation) - 0.1).abs() < 1e-6);

        t.apply(Setting::Tolerance(Axis::Elevation), 0.5).unwrap();
        assert!((t.tolerance(Axis::Elevation) - 0.5).abs() < 1e-6);
        t.apply(Setting::SpeedCeiling(CeilingMode::Single, Axis::Azimuth), 40.0)
            .unwrap();
        assert_eq!(t.ceiling(CeilingMode::Single, Axis::Azimuth), 40);
    }

    #[test]
    fn load_overlays_store_and_skips_invalid() {
        let mut store = MemoryStore::new();
        store.put("gain_el", StoredValue::Int(150)).unwrap();
        store.put("min_speed_az", StoredValue::Int(999)).unwrap();
        store.put("single_motor_mode", StoredValue::Bool(true)).unwrap();

        let t = Tunables::load(&store, &ControlSettings::default());
        assert_eq!(t.gain(Axis::Elevation), 150);
        assert_eq!(t.min_speed(Axis::Azimuth), 100);
        assert!(t.single_motor_mode());
    }

    #[test]
    fn get_matches_apply() {
        let t = Tunables::new(&ControlSettings::default());
        for setting in ControlSettings::ALL {
            let value = if setting.is_integer() { 3.0 } else { 2.5 };
            t.apply(setting, value).unwrap();
            assert_eq!(t.get(setting), value, "{}", setting.key());
        }
    }
}
