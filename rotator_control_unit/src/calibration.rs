//! Calibration timed moves.
//!
//! Two phases advanced once per control tick: `Idle` holds both motors
//! stopped, `Moving` drives one axis at full duty until the requested time
//! has elapsed. The sign of the run time selects the direction.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use rotator_common::consts::FULL_DUTY;
use rotator_common::hal::MotorDriver;
use rotator_common::state::{Axis, MotorDirection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    Idle,
    Moving {
        axis: Axis,
        direction: MotorDirection,
        duration: Duration,
        started: Instant,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct CalibrationRunner {
    phase: CalibrationPhase,
}

impl Default for CalibrationRunner {
    fn default() -> Self {
        Self {
            phase: CalibrationPhase::Idle,
        }
    }
}

impl CalibrationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> CalibrationPhase {
        self.phase
    }

    pub fn is_moving(&self) -> bool {
        matches!(self.phase, CalibrationPhase::Moving { .. })
    }

    /// Start a timed move. A zero run time is ignored; a new request
    /// replaces a running move.
    pub fn start(&mut self, run_time_ms: i64, axis: Axis, now: Instant) {
        if run_time_ms == 0 {
            warn!("calibration move with zero run time ignored");
            return;
        }
        let direction = if run_time_ms > 0 {
            MotorDirection::Forward
        } else {
            MotorDirection::Reverse
        };
        let duration = Duration::from_millis(run_time_ms.unsigned_abs());
        info!("calibration move: {axis} {direction:?} for {} ms", duration.as_millis());
        self.phase = CalibrationPhase::Moving {
            axis,
            direction,
            duration,
            started: now,
        };
    }

    /// Drop any running move.
    pub fn cancel(&mut self) {
        self.phase = CalibrationPhase::Idle;
    }

    /// Write this tick's motor outputs.
    pub fn tick(&mut self, motors: &mut dyn MotorDriver, now: Instant) {
        match self.phase {
            CalibrationPhase::Idle => motors.stop_all(),
            CalibrationPhase::Moving {
                axis,
                direction,
                duration,
                started,
            } => {
                if now.saturating_duration_since(started) > duration {
                    info!("calibration move on {axis} complete");
                    self.phase = CalibrationPhase::Idle;
                    motors.stop_all();
                } else {
                    motors.stop(axis.other());
                    motors.set_direction(axis, direction);
                    motors.set_duty(axis, FULL_DUTY);
                }
            }
        }
    }
}
