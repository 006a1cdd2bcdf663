//! Per-axis motor actuation.
//!
//! Duty is inverted: higher values are slower and [`STOP_DUTY`] is off.
//! The scaled error (error × gain) picks the direction and a target duty
//! between the axis minimum speed and its ceiling. The commanded duty ramps
//! toward the target by a fixed step per tick and restarts from the minimum
//! speed whenever the direction flips.
//!
//! A jitter pulse (stall recovery) is a small state machine advanced on
//! each tick: full drive reversed, then full drive forward, each for
//! [`JITTER_PULSE_MS`], then back to the ramped duty.

use std::time::{Duration, Instant};

use tracing::info;

use rotator_common::consts::{
    FULL_DUTY, JITTER_PULSE_MS, RAMP_STEP, RAMP_STEP_EMERGENCY, STOP_DUTY,
};
use rotator_common::state::{Axis, MotorDirection};

const JITTER_PULSE: Duration = Duration::from_millis(JITTER_PULSE_MS);

/// Arduino-style `constrain`: `lo` wins if the bounds cross.
#[inline]
fn constrain(x: f64, lo: f64, hi: f64) -> f64 {
    if x < lo {
        lo
    } else if x > hi {
        hi
    } else {
        x
    }
}

/// Target duty for a scaled error magnitude.
///
/// `min_speed - constrain(|scaled|, ceiling, min_speed)`, floored at the
/// ceiling.
pub fn target_duty(scaled_abs: f64, min_speed: i32, ceiling: i32) -> i32 {
    let reduction = constrain(scaled_abs, ceiling as f64, min_speed as f64);
    let target = min_speed - reduction as i32;
    target.max(ceiling)
}

/// Move `current` toward `target` by at most `step`.
#[inline]
pub fn ramp(current: i32, target: i32, step: i32) -> i32 {
    if current > target {
        (current - step).max(target)
    } else if current < target {
        (current + step).min(target)
    } else {
        current
    }
}

/// Inputs for one actuation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorInput {
    pub error: f32,
    /// Effective gain (emergency gain during a stow).
    pub gain: i32,
    pub min_speed: i32,
    pub ceiling: i32,
    /// Error outside tolerance after priority arbitration.
    pub active: bool,
    pub latched: bool,
    pub global_fault: bool,
    /// Emergency stow in progress (faster ramp).
    pub emergency: bool,
}

/// Outputs for one motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorCommand {
    pub direction: MotorDirection,
    pub duty: u8,
}

impl MotorCommand {
    pub const fn is_stopped(&self) -> bool {
        self.duty == STOP_DUTY
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JitterPhase {
    Idle,
    Requested,
    Reverse { until: Instant },
    Restore { until: Instant },
}

/// Ramp and jitter state for one axis.
#[derive(Debug, Clone)]
pub struct AxisActuator {
    axis: Axis,
    current_speed: i32,
    last_scaled_error: f64,
    jitter: JitterPhase,
}

impl AxisActuator {
    pub fn new(axis: Axis, min_speed: i32) -> Self {
        Self {
            axis,
            current_speed: min_speed,
            last_scaled_error: 0.0,
            jitter: JitterPhase::Idle,
        }
    }

    /// Current ramped duty.
    pub fn current_speed(&self) -> i32 {
        self.current_speed
    }

    pub fn jitter_in_progress(&self) -> bool {
        self.jitter != JitterPhase::Idle
    }

    /// Ask for a jitter pulse; ignored while one is running.
    pub fn request_jitter(&mut self) {
        if self.jitter == JitterPhase::Idle {
            self.jitter = JitterPhase::Requested;
        }
    }

    pub fn actuate(&mut self, input: &ActuatorInput, now: Instant) -> MotorCommand {
        let scaled = input.error as f64 * input.gain as f64;
        let direction = MotorDirection::from_error(scaled);
        let target = target_duty(scaled.abs(), input.min_speed, input.ceiling);

        if (scaled < 0.0) != (self.last_scaled_error < 0.0) {
            self.current_speed = input.min_speed;
        }
        self.last_scaled_error = scaled;

        if !input.active || input.latched || input.global_fault {
            self.current_speed = input.min_speed;
            self.jitter = JitterPhase::Idle;
            return MotorCommand {
                direction,
                duty: STOP_DUTY,
            };
        }

        let step = if input.emergency {
            RAMP_STEP_EMERGENCY
        } else {
            RAMP_STEP
        };
        self.current_speed = ramp(self.current_speed, target, step);
        let ramped = MotorCommand {
            direction,
            duty: self.current_speed.clamp(0, STOP_DUTY as i32) as u8,
        };

        match self.jitter {
            JitterPhase::Idle => ramped,
            JitterPhase::Requested => {
                info!("{} attempting stall recovery with jitter", self.axis);
                self.jitter = JitterPhase::Reverse {
                    until: now + JITTER_PULSE,
                };
                MotorCommand {
                    direction: direction.reversed(),
                    duty: FULL_DUTY,
                }
            }
            JitterPhase::Reverse { until } if now < until => MotorCommand {
                direction: direction.reversed(),
                duty: FULL_DUTY,
            },
            JitterPhase::Reverse { .. } => {
                self.jitter = JitterPhase::Restore {
                    until: now + JITTER_PULSE,
                };
                MotorCommand {
                    direction,
                    duty: FULL_DUTY,
                }
            }
            JitterPhase::Restore { until } if now < until => MotorCommand {
                direction,
                duty: FULL_DUTY,
            },
            JitterPhase::Restore { .. } => {
                self.jitter = JitterPhase::Idle;
                ramped
            }
        }
    }
}
