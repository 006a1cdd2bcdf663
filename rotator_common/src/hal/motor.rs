//! Motor outputs: one direction line and one inverted PWM duty per axis.

use crate::consts::STOP_DUTY;
use crate::state::{Axis, MotorDirection};

/// Direction and duty outputs for both motors.
///
/// Duty is inverted: [`STOP_DUTY`] (255) stops the motor, 0 is full drive.
pub trait MotorDriver: Send {
    fn set_direction(&mut self, axis: Axis, direction: MotorDirection);

    fn set_duty(&mut self, axis: Axis, duty: u8);

    /// Stop one motor.
    fn stop(&mut self, axis: Axis) {
        self.set_duty(axis, STOP_DUTY);
    }

    /// Stop both motors.
    fn stop_all(&mut self) {
        for axis in Axis::ALL {
            self.stop(axis);
        }
    }
}

impl<M: MotorDriver + ?Sized> MotorDriver for Box<M> {
    fn set_direction(&mut self, axis: Axis, direction: MotorDirection) {
        (**self).set_direction(axis, direction);
    }

    fn set_duty(&mut self, axis: Axis, duty: u8) {
        (**self).set_duty(axis, duty);
    }
}
