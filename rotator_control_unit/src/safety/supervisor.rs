//! Periodic safety loop.
//!
//! Runs at a lower rate than the control loop. Each tick evaluates the
//! position and supply limits, latches new faults with their measurement,
//! folds every applicable flag into the global fault and, unless a mode
//! that tolerates it is active, forces a latching hard stop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use rotator_common::consts::STOW_POWER_LOG_MS;
use rotator_common::fault::FaultFlags;
use rotator_common::hal::PowerMonitor;

use super::flags::{SafetyFlagInput, evaluate_limits, limit_message};
use super::stop::{Throttle, fault_summary, hard_stop};
use crate::controller::SharedMotors;
use crate::state::{ControllerState, lock};

pub struct SafetyLoop {
    state: Arc<ControllerState>,
    motors: SharedMotors,
    power: Box<dyn PowerMonitor>,
    fault_log: Throttle,
    stow_power_log: Throttle,
}

impl SafetyLoop {
    pub fn new(
        state: Arc<ControllerState>,
        motors: SharedMotors,
        power: Box<dyn PowerMonitor>,
    ) -> Self {
        Self {
            state,
            motors,
            power,
            fault_log: Throttle::default(),
            stow_power_log: Throttle::new(Duration::from_millis(STOW_POWER_LOG_MS)),
        }
    }

    /// One safety evaluation.
    pub fn tick(&mut self, now: Instant) {
        let state = &*self.state;
        let calibrating = state.is_calibrating();
        let stowing = state.is_wind_stow_active();
        let tunables = state.tunables();

        let input = SafetyFlagInput {
            corrected_el: state.readings().corrected.el,
            wind_count: state.wind_count(),
            power_w: self.power.power_w(),
            voltage_v: self.power.load_voltage_v(),
            max_power_w: tunables.max_power_w(),
            min_voltage_v: tunables.min_voltage_v(),
            calibrating,
            stowing,
        };

        // ── Limits ──
        let fresh = state.raise_faults(evaluate_limits(&input));
        for flag in fresh.iter() {
            error!("{}", limit_message(flag, &input));
        }

        // ── Stow bypass ──
        if stowing {
            if state.faults().intersects(FaultFlags::POWER_MASK) {
                state.release_power_faults();
            }
            if self.stow_power_log.allow(now) {
                info!(
                    "wind stow: power {:.2} W, voltage {:.2} V (limits bypassed)",
                    input.power_w, input.voltage_v
                );
            }
        }

        // ── Global fault ──
        let considered = state.faults().considered(calibrating, stowing);
        if !considered.is_empty() {
            if !state.global_fault() {
                error!("global fault: {}", fault_summary(considered));
            }
            state.latch_global_fault();
        }

        // ── Hard stop ──
        if state.global_fault() && !calibrating && !stowing && !state.is_wind_tracking_active() {
            hard_stop(lock(&self.motors).as_mut());
            if state.engage_hard_stop() {
                error!("hard stop engaged, restart required");
            }
            if self.fault_log.allow(now) {
                error!(
                    "motors held stopped: {}",
                    fault_summary(state.faults())
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use rotator_common::consts::STOP_DUTY;
    use rotator_common::hal::MotorDriver;
    use rotator_common::settings::ControlSettings;
    use rotator_common::state::{Axis, PerAxis};

    use crate::sim::SimDish;
    use crate::state::AxisReadings;
    use crate::tunables::Tunables;

    fn setup() -> (SimDish, Arc<ControllerState>, SafetyLoop) {
        let dish = SimDish::default();
        let state = Arc::new(ControllerState::new(
            Tunables::new(&ControlSettings::default()),
            0,
            0.0,
            Instant::now(),
        ));
        let motors: SharedMotors = Arc::new(Mutex::new(Box::new(dish.clone())));
        let safety = SafetyLoop::new(state.clone(), motors, Box::new(dish.clone()));
        (dish, state, safety)
    }

    #[test]
    fn over_power_latches_global_and_stops() {
        let (mut dish, state, mut safety) = setup();
        dish.set_duty(Axis::Azimuth, 0);
        dish.set_power_override(Some(12.0));

        safety.tick(Instant::now());
        assert!(state.faults().contains(FaultFlags::OVER_POWER));
        assert!(state.global_fault());
        assert!(state.hard_stop_engaged());
        assert_eq!(dish.duty(Axis::Azimuth), STOP_DUTY);
    }

    #[test]
    fn global_fault_persists_after_condition_clears() {
        let (dish, state, mut safety) = setup();
        let t0 = Instant::now();
        dish.set_voltage_override(Some(4.0));
        safety.tick(t0);
        dish.set_voltage_override(None);
        safety.tick(t0 + Duration::from_millis(500));
        assert!(state.faults().contains(FaultFlags::LOW_VOLTAGE));
        assert!(state.global_fault());
    }

    #[test]
    fn stow_bypasses_power_and_skips_hard_stop() {
        let (mut dish, state, mut safety) = setup();
        state.activate_wind_stow("storm", 200.0);
        dish.set_power_override(Some(20.0));
        dish.set_duty(Axis::Elevation, 0);

        safety.tick(Instant::now());
        assert!(state.faults().is_empty());
        assert!(!state.global_fault());
        assert!(!state.hard_stop_engaged());
        assert_eq!(dish.duty(Axis::Elevation), 0);
    }

    #[test]
    fn calibration_suppresses_position_faults() {
        let (_dish, state, mut safety) = setup();
        state.set_calibration_mode(true);
        state.set_wind_count(3);
        state.publish_readings(AxisReadings {
            corrected: PerAxis::new(0.0, 180.0),
            error: PerAxis::default(),
        });
        safety.tick(Instant::now());
        assert!(state.faults().is_empty());
        assert!(!state.global_fault());
    }

    #[test]
    fn out_of_bounds_elevation_faults() {
        let (_dish, state, mut safety) = setup();
        state.publish_readings(AxisReadings {
            corrected: PerAxis::new(0.0, 120.0),
            error: PerAxis::default(),
        });
        safety.tick(Instant::now());
        assert!(state.faults().contains(FaultFlags::OUT_OF_BOUNDS));
        assert!(state.hard_stop_engaged());
    }

    #[test]
    fn tracking_mode_skips_hard_stop() {
        let (_dish, state, mut safety) = setup();
        state.set_wind_tracking(true, Some(90.0));
        state.raise_faults(FaultFlags::BAD_ANGLE);
        safety.tick(Instant::now());
        assert!(state.global_fault());
        assert!(!state.hard_stop_engaged());
    }
}
