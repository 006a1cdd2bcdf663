//! Thread-safe entry points for command parsers and user interfaces.
//!
//! A [`ControllerHandle`] is cheap to clone. Setters take effect on the
//! next control tick; tunable setters validate, update the in-memory value,
//! then persist it.

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{info, warn};

use rotator_common::consts::KEY_SINGLE_MOTOR_MODE;
use rotator_common::fault::FaultFlags;
use rotator_common::settings::{CeilingMode, ControlSettings, ParameterError, Setting};
use rotator_common::state::Axis;
use rotator_common::store::StoredValue;
use rotator_common::wind::WindSafety;

use crate::controller::{SharedMotors, persist};
use crate::state::{ControllerState, lock};
use crate::store::SharedStore;
use crate::wind::WindIntegration;

/// Rejected command.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CommandError {
    #[error("setpoint rejected: emergency wind stow active ({reason})")]
    WindStowActive { reason: String },

    #[error("calibration mode is not active")]
    CalibrationInactive,

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

#[derive(Clone)]
pub struct ControllerHandle {
    state: Arc<ControllerState>,
    motors: SharedMotors,
    store: SharedStore,
    wind: Arc<dyn WindSafety>,
}

impl ControllerHandle {
    pub fn new(
        state: Arc<ControllerState>,
        motors: SharedMotors,
        store: SharedStore,
        wind: Arc<dyn WindSafety>,
    ) -> Self {
        Self {
            state,
            motors,
            store,
            wind,
        }
    }

    // ─── Setpoints ──────────────────────────────────────────────────

    pub fn set_setpoint_az(&self, degrees: f32) -> Result<(), CommandError> {
        self.set_setpoint_at(Axis::Azimuth, degrees, Instant::now())
    }

    pub fn set_setpoint_el(&self, degrees: f32) -> Result<(), CommandError> {
        self.set_setpoint_at(Axis::Elevation, degrees, Instant::now())
    }

    /// Manual setpoint issued at `now`.
    ///
    /// Rejected during an emergency stow unless calibrating. Accepted
    /// commands restart the manual-override window and end wind tracking.
    pub fn set_setpoint_at(&self, axis: Axis, degrees: f32, now: Instant) -> Result<(), CommandError> {
        if self.state.is_wind_stow_active() && !self.state.is_calibrating() {
            let reason = self.state.wind_stow_reason();
            warn!("{axis} setpoint {degrees:.2} rejected: emergency wind stow active ({reason})");
            return Err(CommandError::WindStowActive { reason });
        }
        self.state.set_setpoint_manual(axis, degrees, now);
        Ok(())
    }

    pub fn setpoint(&self, axis: Axis) -> f32 {
        self.state.setpoints()[axis]
    }

    pub fn setpoint_az(&self) -> f32 {
        self.setpoint(Axis::Azimuth)
    }

    pub fn setpoint_el(&self) -> f32 {
        self.setpoint(Axis::Elevation)
    }

    // ─── Readings ───────────────────────────────────────────────────

    pub fn corrected_angle(&self, axis: Axis) -> f32 {
        self.state.readings().corrected[axis]
    }

    pub fn corrected_angle_az(&self) -> f32 {
        self.corrected_angle(Axis::Azimuth)
    }

    pub fn corrected_angle_el(&self) -> f32 {
        self.corrected_angle(Axis::Elevation)
    }

    pub fn error(&self, axis: Axis) -> f32 {
        self.state.readings().error[axis]
    }

    pub fn error_az(&self) -> f32 {
        self.error(Axis::Azimuth)
    }

    pub fn error_el(&self) -> f32 {
        self.error(Axis::Elevation)
    }

    // ─── Status ─────────────────────────────────────────────────────

    pub fn faults(&self) -> FaultFlags {
        self.state.faults()
    }

    pub fn global_fault(&self) -> bool {
        self.state.global_fault()
    }

    pub fn hard_stop_engaged(&self) -> bool {
        self.state.hard_stop_engaged()
    }

    pub fn wind_count(&self) -> i32 {
        self.state.wind_count()
    }

    pub fn motor_active(&self, axis: Axis) -> bool {
        self.state.motor_active(axis)
    }

    pub fn motor_latched(&self, axis: Axis) -> bool {
        self.state.motor_latched(axis)
    }

    // ─── Calibration ────────────────────────────────────────────────

    /// Enter or leave calibration mode; both motors stop either way.
    pub fn activate_cal_mode(&self, enabled: bool) {
        self.state.set_calibration_mode(enabled);
        lock(&self.motors).stop_all();
        info!("calibration mode {}", if enabled { "on" } else { "off" });
    }

    pub fn is_calibrating(&self) -> bool {
        self.state.is_calibrating()
    }

    /// Queue a timed full-speed move; the sign of `run_time_ms` selects
    /// the direction.
    pub fn cal_move_motor(&self, run_time_ms: i64, axis: Axis) -> Result<(), CommandError> {
        if !self.state.is_calibrating() {
            warn!("calibration move ignored: calibration mode is off");
            return Err(CommandError::CalibrationInactive);
        }
        self.state.request_timed_move(run_time_ms, axis);
        Ok(())
    }

    /// Tare the elevation start angle to the current raw reading on the
    /// next tick.
    pub fn calibrate_elevation(&self) -> Result<(), CommandError> {
        if !self.state.is_calibrating() {
            warn!("elevation calibration ignored: calibration mode is off");
            return Err(CommandError::CalibrationInactive);
        }
        self.state.request_elevation_tare();
        Ok(())
    }

    pub fn el_start_angle(&self) -> f32 {
        self.state.el_start_angle()
    }

    // ─── Tunables ───────────────────────────────────────────────────

    pub fn setting(&self, setting: Setting) -> f64 {
        self.state.tunables().get(setting)
    }

    pub fn settings(&self) -> ControlSettings {
        self.state.tunables().snapshot()
    }

    /// Validate, apply, then persist one setting.
    pub fn set_setting(&self, setting: Setting, value: f64) -> Result<(), CommandError> {
        if let Err(e) = self.state.tunables().apply(setting, value) {
            warn!("setting rejected: {e}");
            return Err(e.into());
        }
        let stored = if setting.is_integer() {
            StoredValue::Int(value as i64)
        } else {
            StoredValue::Float(value)
        };
        persist(&self.store, setting.key(), stored);
        info!("{} set to {value}", setting.key());
        Ok(())
    }

    pub fn gain(&self, axis: Axis) -> i32 {
        self.state.tunables().gain(axis)
    }

    pub fn set_gain(&self, axis: Axis, gain: i32) -> Result<(), CommandError> {
        self.set_setting(Setting::Gain(axis), gain as f64)
    }

    pub fn min_speed(&self, axis: Axis) -> i32 {
        self.state.tunables().min_speed(axis)
    }

    pub fn set_min_speed(&self, axis: Axis, speed: i32) -> Result<(), CommandError> {
        self.set_setting(Setting::MinSpeed(axis), speed as f64)
    }

    pub fn tolerance(&self, axis: Axis) -> f32 {
        self.state.tunables().tolerance(axis)
    }

    pub fn set_tolerance(&self, axis: Axis, degrees: f32) -> Result<(), CommandError> {
        self.set_setting(Setting::Tolerance(axis), degrees as f64)
    }

    pub fn speed_ceiling(&self, mode: CeilingMode, axis: Axis) -> i32 {
        self.state.tunables().ceiling(mode, axis)
    }

    pub fn set_speed_ceiling(&self, mode: CeilingMode, axis: Axis, duty: i32) -> Result<(), CommandError> {
        self.set_setting(Setting::SpeedCeiling(mode, axis), duty as f64)
    }

    pub fn max_power_w(&self) -> i32 {
        self.state.tunables().max_power_w()
    }

    pub fn set_max_power_w(&self, watts: i32) -> Result<(), CommandError> {
        self.set_setting(Setting::MaxPower, watts as f64)
    }

    pub fn min_voltage_v(&self) -> i32 {
        self.state.tunables().min_voltage_v()
    }

    pub fn set_min_voltage_v(&self, volts: i32) -> Result<(), CommandError> {
        self.set_setting(Setting::MinVoltage, volts as f64)
    }

    pub fn single_motor_mode(&self) -> bool {
        self.state.tunables().single_motor_mode()
    }

    pub fn set_single_motor_mode(&self, enabled: bool) {
        self.state.tunables().set_single_motor_mode(enabled);
        persist(&self.store, KEY_SINGLE_MOTOR_MODE, enabled.into());
        info!("single motor mode {}", if enabled { "on" } else { "off" });
    }

    /// Speed percentage (0 = minimum speed, 100 = full drive) to duty,
    /// relative to the azimuth minimum speed.
    pub fn percentage_to_speed(&self, percent: f32) -> i32 {
        let min = self.min_speed(Axis::Azimuth) as f32;
        ((1.0 - percent.clamp(0.0, 100.0) / 100.0) * min).round() as i32
    }

    /// Inverse of [`Self::percentage_to_speed`].
    pub fn speed_to_percentage(&self, speed: i32) -> f32 {
        let min = self.min_speed(Axis::Azimuth);
        if min == 0 {
            return 100.0;
        }
        ((1.0 - speed as f32 / min as f32) * 100.0).clamp(0.0, 100.0)
    }

    // ─── Wind ───────────────────────────────────────────────────────

    pub fn is_wind_stow_active(&self) -> bool {
        self.state.is_wind_stow_active()
    }

    pub fn wind_stow_reason(&self) -> String {
        self.state.wind_stow_reason()
    }

    pub fn wind_stow_direction(&self) -> f32 {
        self.state.wind_stow_direction()
    }

    pub fn is_wind_tracking_active(&self) -> bool {
        self.state.is_wind_tracking_active()
    }

    pub fn wind_tracking_status(&self) -> String {
        WindIntegration::tracking_status(self.wind.as_ref(), &self.state)
    }

    /// Whether manual setpoints are currently refused.
    pub fn is_movement_blocked(&self) -> bool {
        self.state.is_wind_stow_active() && !self.state.is_calibrating()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rotator_common::hal::MotorDriver;
    use rotator_common::store::{KeyValueStore, MemoryStore};
    use rotator_common::wind::NoWindSafety;

    use crate::sim::SimDish;
    use crate::store::shared;
    use crate::tunables::Tunables;

    fn handle() -> (ControllerHandle, SharedStore, SimDish) {
        let state = Arc::new(ControllerState::new(
            Tunables::new(&ControlSettings::default()),
            0,
            0.0,
            Instant::now(),
        ));
        let dish = SimDish::default();
        let motors: SharedMotors = Arc::new(Mutex::new(Box::new(dish.clone())));
        let store = shared(MemoryStore::new());
        let h = ControllerHandle::new(state, motors, store.clone(), Arc::new(NoWindSafety));
        (h, store, dish)
    }

    #[test]
    fn stow_rejects_manual_setpoints() {
        let (h, _, _) = handle();
        h.state.activate_wind_stow("gusts", 200.0);
        h.state.set_setpoint_internal(Axis::Azimuth, 200.0);

        let err = h.set_setpoint_az(50.0).unwrap_err();
        assert_eq!(
            err,
            CommandError::WindStowActive {
                reason: "gusts".to_string()
            }
        );
        assert_eq!(h.setpoint_az(), 200.0);
        assert!(h.is_movement_blocked());

        h.activate_cal_mode(true);
        assert!(!h.is_movement_blocked());
        h.set_setpoint_az(50.0).unwrap();
        assert_eq!(h.setpoint_az(), 50.0);
    }

    #[test]
    fn calibration_commands_need_cal_mode() {
        let (h, _, _) = handle();
        assert_eq!(h.cal_move_motor(500, Axis::Azimuth), Err(CommandError::CalibrationInactive));
        assert_eq!(h.calibrate_elevation(), Err(CommandError::CalibrationInactive));
        h.activate_cal_mode(true);
        h.cal_move_motor(500, Axis::Azimuth).unwrap();
        h.calibrate_elevation().unwrap();
    }

    #[test]
    fn settings_persist_after_validation() {
        let (h, store, _) = handle();
        h.set_gain(Axis::Elevation, 120).unwrap();
        h.set_tolerance(Axis::Azimuth, 2.5).unwrap();
        assert_eq!(h.gain(Axis::Elevation), 120);
        assert_eq!(lock(&store).get("gain_el"), Some(StoredValue::Int(120)));
        assert_eq!(lock(&store).get("tolerance_az"), Some(StoredValue::Float(2.5)));

        assert!(matches!(
            h.set_min_speed(Axis::Azimuth, 300),
            Err(CommandError::Parameter(_))
        ));
        assert_eq!(h.min_speed(Axis::Azimuth), 100);
        assert_eq!(lock(&store).get("min_speed_az"), None);
    }

    #[test]
    fn percentage_conversion_round_trips_on_min_speed() {
        let (h, _, _) = handle();
        assert_eq!(h.percentage_to_speed(0.0), 100);
        assert_eq!(h.percentage_to_speed(100.0), 0);
        assert_eq!(h.percentage_to_speed(25.0), 75);
        assert!((h.speed_to_percentage(75) - 25.0).abs() < 1e-4);
    }

    #[test]
    fn cal_mode_stops_motors() {
        let (h, _, mut dish) = handle();
        dish.set_duty(Axis::Azimuth, 0);
        h.activate_cal_mode(true);
        assert!(h.is_calibrating());
        assert!(!dish.is_moving(Axis::Azimuth));
    }

    #[test]
    fn single_motor_mode_persists() {
        let (h, store, _) = handle();
        h.set_single_motor_mode(true);
        assert!(h.single_motor_mode());
        assert_eq!(lock(&store).get(KEY_SINGLE_MOTOR_MODE), Some(StoredValue::Bool(true)));
    }
}
