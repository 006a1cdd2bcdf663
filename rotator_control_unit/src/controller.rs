//! Startup and the periodic control tick.
//!
//! [`Rotator::initialize`] performs the startup sequence and splits the
//! system into its three parts: the [`ControlLoop`] (owns the sensor bus),
//! the [`SafetyLoop`] (owns the power monitor) and a cloneable
//! [`ControllerHandle`]. Motors and the settings store are shared.
//!
//! ## Control tick
//!
//! 1. Wind stow and tracking polls, then take pending setpoints.
//! 2. Calibration requests (timed move, elevation tare).
//! 3. Read azimuth, correct, update the wind counter; read elevation.
//! 4. Compute and publish errors; merge sensor faults.
//! 5. Outside calibration: latch, convergence, priority, actuation.
//!    In calibration: advance the timed move.
//! 6. Persist a changed wind count and check for oscillation.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use tracing::{error, info, warn};

use rotator_common::consts::{AZ_START_ANGLE, KEY_EL_START_ANGLE, KEY_WIND_COUNT};
use rotator_common::fault::FaultFlags;
use rotator_common::hal::{MotorDriver, PowerMonitor, RegisterBus};
use rotator_common::settings::CeilingMode;
use rotator_common::state::{Axis, PerAxis};
use rotator_common::store::StoredValue;
use rotator_common::wind::WindSafety;

use crate::angle::error::{error_el, shortest_error_az};
use crate::angle::tracker::{UnwindTracker, correct_angle};
use crate::calibration::CalibrationRunner;
use crate::config::RotatorConfig;
use crate::control::actuator::{ActuatorInput, AxisActuator, MotorCommand};
use crate::control::latch::AxisLatch;
use crate::control::priority::{PriorityArbiter, speed_ceilings};
use crate::convergence::ConvergenceMonitor;
use crate::handle::ControllerHandle;
use crate::safety::oscillation::{OscillationDetector, nudge_for};
use crate::safety::supervisor::SafetyLoop;
use crate::sensor::averaging::wrap_degrees;
use crate::sensor::reader::AngleSensorReader;
use crate::sim::SimDish;
use crate::state::{AxisReadings, ControllerState, lock};
use crate::store::SharedStore;
use crate::tunables::Tunables;
use crate::wind::WindIntegration;

/// Motor driver shared by the control loop, safety loop and handles.
pub type SharedMotors = Arc<Mutex<Box<dyn MotorDriver>>>;

/// Platform hardware handed to [`Rotator::initialize`].
pub struct Hardware {
    pub bus: Box<dyn RegisterBus>,
    pub motors: Box<dyn MotorDriver>,
    pub power: Box<dyn PowerMonitor>,
}

impl Hardware {
    /// All three seams backed by one simulated dish.
    pub fn simulated(dish: &SimDish) -> Self {
        Self {
            bus: Box::new(dish.clone()),
            motors: Box::new(dish.clone()),
            power: Box::new(dish.clone()),
        }
    }
}

/// Write one value, logging a failure. The in-memory value stays.
pub(crate) fn persist(store: &SharedStore, key: &str, value: StoredValue) {
    if let Err(e) = lock(store).put(key, value) {
        warn!("failed to persist {key}: {e}");
    }
}

/// The initialized system.
pub struct Rotator {
    pub handle: ControllerHandle,
    pub control: ControlLoop,
    pub safety: SafetyLoop,
}

impl Rotator {
    /// Startup sequence.
    ///
    /// Logs magnet status, restores tunables, wind count and elevation
    /// start from `store` (the elevation start defaults to the first raw
    /// reading and is persisted), establishes the initial angles and homes
    /// both setpoints to 0°.
    pub fn initialize(
        config: &RotatorConfig,
        hardware: Hardware,
        store: SharedStore,
        wind: Arc<dyn WindSafety>,
        now: Instant,
    ) -> Self {
        let Hardware {
            mut bus,
            motors,
            power,
        } = hardware;
        let mut reader = AngleSensorReader::new(&config.sensors);

        // ── Magnets ──
        for axis in Axis::ALL {
            reader.report_magnet(bus.as_mut(), axis);
        }

        // ── Persisted state ──
        let (tunables, wind_count, stored_el_start) = {
            let s = lock(&store);
            (
                Tunables::load(s.as_ref(), &config.defaults),
                s.get_i32_or(KEY_WIND_COUNT, 0),
                s.get(KEY_EL_START_ANGLE).and_then(StoredValue::as_f64),
            )
        };
        let el_start = match stored_el_start {
            Some(angle) => angle as f32,
            None => {
                let raw = reader
                    .read_angle(bus.as_mut(), Axis::Elevation)
                    .unwrap_or(0.0);
                info!("no elevation calibration stored, using first reading {raw:.2} deg");
                persist(&store, KEY_EL_START_ANGLE, raw.into());
                raw
            }
        };
        info!("restored wind count {wind_count}, elevation start {el_start:.2} deg");

        let state = Arc::new(ControllerState::new(tunables, wind_count, el_start, now));

        // ── Initial angles ──
        let raw_az = reader.read_angle(bus.as_mut(), Axis::Azimuth).unwrap_or(0.0);
        let raw_el = reader
            .read_angle(bus.as_mut(), Axis::Elevation)
            .unwrap_or(0.0);
        let corrected = PerAxis::new(
            correct_angle(AZ_START_ANGLE, raw_az),
            correct_angle(el_start, raw_el),
        );
        let mut unwind = UnwindTracker::new(wind_count);
        unwind.update(corrected.az, false);
        state.publish_readings(AxisReadings {
            corrected,
            error: PerAxis::default(),
        });
        state.raise_faults(reader.faults());
        info!(
            "initial position: AZ {:.2} deg, EL {:.2} deg",
            corrected.az, corrected.el
        );

        // ── Home ──
        state.force_setpoints(PerAxis::new(0.0, 0.0));

        let motors: SharedMotors = Arc::new(Mutex::new(motors));
        lock(&motors).stop_all();

        let handle = ControllerHandle::new(state.clone(), motors.clone(), store.clone(), wind.clone());
        let min_speed = PerAxis::from_fn(|axis| state.tunables().min_speed(axis));
        let control = ControlLoop {
            state: state.clone(),
            bus,
            motors: motors.clone(),
            store,
            reader,
            unwind,
            wind: WindIntegration::new(wind, &config.wind),
            convergence: ConvergenceMonitor::new(now),
            latches: PerAxis::default(),
            actuators: PerAxis::from_fn(|axis| AxisActuator::new(axis, min_speed[axis])),
            priority: PriorityArbiter::new(),
            calibration: CalibrationRunner::new(),
            oscillation: OscillationDetector::default(),
            emergency_gains: PerAxis::new(config.wind.emergency_gain_az, config.wind.emergency_gain_el),
            stall_recovery: config.features.stall_recovery,
        };
        let safety = SafetyLoop::new(state, motors, power);

        Self {
            handle,
            control,
            safety,
        }
    }
}

/// Periodic control task.
pub struct ControlLoop {
    state: Arc<ControllerState>,
    bus: Box<dyn RegisterBus>,
    motors: SharedMotors,
    store: SharedStore,
    reader: AngleSensorReader,
    unwind: UnwindTracker,
    wind: WindIntegration,
    convergence: ConvergenceMonitor,
    latches: PerAxis<AxisLatch>,
    actuators: PerAxis<AxisActuator>,
    priority: PriorityArbiter,
    calibration: CalibrationRunner,
    oscillation: OscillationDetector,
    emergency_gains: PerAxis<i32>,
    stall_recovery: bool,
}

impl ControlLoop {
    pub fn convergence(&self) -> &ConvergenceMonitor {
        &self.convergence
    }

    pub fn calibration(&self) -> &CalibrationRunner {
        &self.calibration
    }

    /// One control tick. Returns the readings it published.
    pub fn tick(&mut self, now: Instant) -> AxisReadings {
        let state = Arc::clone(&self.state);

        // ── Wind and setpoints ──
        self.wind.update_stow(&state, now);
        self.wind.update_tracking(&state, now);
        let (setpoints, updated) = state.take_setpoints();
        let calibrating = state.is_calibrating();
        let stowing = state.is_wind_stow_active();

        // ── Calibration requests ──
        let requests = state.take_calibration_requests();
        if calibrating {
            if let Some((run_time_ms, axis)) = requests.timed_move {
                self.calibration.start(run_time_ms, axis, now);
            }
            if requests.tare_elevation {
                self.tare_elevation();
            }
        } else if self.calibration.is_moving() {
            self.calibration.cancel();
        }

        // ── Sense ──
        // A failed read has latched BAD_ANGLE; 0 is the unreliable default.
        let raw_az = self
            .reader
            .read_angle(self.bus.as_mut(), Axis::Azimuth)
            .unwrap_or(0.0);
        let corrected_az = correct_angle(AZ_START_ANGLE, raw_az);
        let wind_change = self.unwind.update(corrected_az, !calibrating);
        if let Some(count) = wind_change {
            state.set_wind_count(count);
        }
        let raw_el = self
            .reader
            .read_angle(self.bus.as_mut(), Axis::Elevation)
            .unwrap_or(0.0);
        let corrected_el = correct_angle(state.el_start_angle(), raw_el);

        let wind_count = self.unwind.wind_count();
        let readings = AxisReadings {
            corrected: PerAxis::new(corrected_az, corrected_el),
            error: PerAxis::new(
                shortest_error_az(setpoints.az, corrected_az, wind_count),
                error_el(setpoints.el, corrected_el),
            ),
        };
        state.publish_readings(readings);
        state.raise_faults(self.reader.faults());

        // ── Actuate ──
        if calibrating {
            self.calibration.tick(lock(&self.motors).as_mut(), now);
        } else {
            self.drive(now, readings.error, updated, stowing);
        }

        // ── Wind counter ──
        if let Some(count) = wind_change {
            persist(&self.store, KEY_WIND_COUNT, count.into());
            self.check_oscillation(now, corrected_az);
        }
        self.oscillation.expire(now);

        readings
    }

    fn drive(&mut self, now: Instant, errors: PerAxis<f32>, updated: PerAxis<bool>, stowing: bool) {
        let state = Arc::clone(&self.state);
        let tunables = state.tunables();
        let tolerances = tunables.tolerances();
        let global_fault = state.global_fault();

        // ── Latch ──
        let mut active = PerAxis::splat(false);
        let mut latched = PerAxis::splat(false);
        for axis in Axis::ALL {
            let update = self.latches[axis].update(errors[axis], tolerances[axis], updated[axis]);
            if update.setpoint_changed {
                self.convergence.reset(axis, now);
                state.clear_faults(FaultFlags::ERROR_DIVERGENCE);
            }
            active[axis] = update.active;
            latched[axis] = update.latched;
        }

        // ── Convergence ──
        let should_move = PerAxis::from_fn(|axis| active[axis] && !latched[axis] && !global_fault);
        self.convergence.record(now, errors, should_move);
        if !stowing
            && let Some(axis) = self.convergence.check_divergence(now, tolerances)
            && !state.raise_faults(FaultFlags::ERROR_DIVERGENCE).is_empty()
        {
            error!(
                "{axis} positioning error diverging: |error| {:.2} deg, rate {:.3} deg/s",
                errors[axis].abs(),
                self.convergence.tracker(axis).error_change_rate()
            );
        }
        if self.stall_recovery {
            let stalled = self.convergence.check_stall(now, tolerances);
            for axis in Axis::ALL {
                if stalled[axis] && should_move[axis] {
                    self.actuators[axis].request_jitter();
                }
            }
        }

        // ── Priority ──
        // Latched axes are parked and yield single-motor priority.
        let setpoint_changed = updated.az || updated.el;
        let runnable = PerAxis::from_fn(|axis| active[axis] && !latched[axis]);
        let running = self.priority.arbitrate(
            tunables.single_motor_mode(),
            setpoint_changed,
            errors,
            runnable,
        );
        let active = PerAxis::from_fn(|axis| active[axis] && (running[axis] || latched[axis]));
        let ceilings = speed_ceilings(
            active,
            PerAxis::from_fn(|axis| tunables.ceiling(CeilingMode::Dual, axis)),
            PerAxis::from_fn(|axis| tunables.ceiling(CeilingMode::Single, axis)),
        );

        // ── Motors ──
        let gains = if stowing {
            self.emergency_gains
        } else {
            PerAxis::from_fn(|axis| tunables.gain(axis))
        };
        let mut motors = lock(&self.motors);
        for axis in Axis::ALL {
            let input = ActuatorInput {
                error: errors[axis],
                gain: gains[axis],
                min_speed: tunables.min_speed(axis),
                ceiling: ceilings[axis],
                active: active[axis],
                latched: latched[axis],
                global_fault,
                emergency: stowing,
            };
            let MotorCommand { direction, duty } = self.actuators[axis].actuate(&input, now);
            motors.set_direction(axis, direction);
            motors.set_duty(axis, duty);
            state.publish_motor_state(axis, active[axis], latched[axis]);
        }
    }

    fn tare_elevation(&mut self) {
        match self.reader.read_angle(self.bus.as_mut(), Axis::Elevation) {
            Ok(raw) => {
                self.state.set_el_start_angle(raw);
                persist(&self.store, KEY_EL_START_ANGLE, raw.into());
                info!("elevation calibrated: start angle {raw:.2} deg");
            }
            Err(e) => error!("elevation calibration failed: {e}"),
        }
    }

    fn check_oscillation(&mut self, now: Instant, corrected_az: f32) {
        if !self.oscillation.record_change(now) {
            return;
        }
        let parked = wrap_degrees(corrected_az + nudge_for(corrected_az));
        warn!(
            "azimuth oscillating across the seam at {corrected_az:.2} deg, parking at {parked:.2} deg"
        );
        self.state.set_setpoint_internal(Axis::Azimuth, parked);
    }
}
