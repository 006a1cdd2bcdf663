//! Hard stop and rate-limited fault reporting.
//!
//! A hard stop writes the stop duty to both motors; the safety loop latches
//! it in the shared state. It is only released by a restart or by entering
//! calibration mode.

use std::time::{Duration, Instant};

use rotator_common::consts::LOG_THROTTLE_MS;
use rotator_common::fault::FaultFlags;
use rotator_common::hal::MotorDriver;

/// Stop both motors.
pub fn hard_stop(motors: &mut dyn MotorDriver) {
    motors.stop_all();
}

/// Comma-separated description of every set flag.
pub fn fault_summary(flags: FaultFlags) -> String {
    flags
        .iter()
        .map(FaultFlags::describe)
        .collect::<Vec<_>>()
        .join(", ")
}

/// At most one emission per interval.
#[derive(Debug, Clone, Copy)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(Duration::from_millis(LOG_THROTTLE_MS))
    }
}

impl Throttle {
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// `true` if a message may go out now; records the emission.
    pub fn allow(&mut self, now: Instant) -> bool {
        let due = self
            .last
            .is_none_or(|at| now.saturating_duration_since(at) >= self.interval);
        if due {
            self.last = Some(now);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rotator_common::state::{Axis, MotorDirection};

    #[derive(Default)]
    struct RecordingMotors {
        duty: [u8; 2],
    }

    impl MotorDriver for RecordingMotors {
        fn set_direction(&mut self, _axis: Axis, _direction: MotorDirection) {}
        fn set_duty(&mut self, axis: Axis, duty: u8) {
            self.duty[axis as usize] = duty;
        }
    }

    #[test]
    fn hard_stop_writes_stop_duty() {
        let mut motors = RecordingMotors::default();
        hard_stop(&mut motors);
        assert_eq!(motors.duty, [255, 255]);
    }

    #[test]
    fn summary_lists_each_flag() {
        let text = fault_summary(FaultFlags::BAD_ANGLE | FaultFlags::OVER_POWER);
        assert_eq!(text, "bad angle reading, over power");
        assert_eq!(fault_summary(FaultFlags::empty()), "");
    }

    #[test]
    fn throttle_allows_once_per_interval() {
        let t0 = Instant::now();
        let mut throttle = Throttle::default();
        assert!(throttle.allow(t0));
        assert!(!throttle.allow(t0 + Duration::from_millis(500)));
        assert!(throttle.allow(t0 + Duration::from_millis(1000)));
        assert!(!throttle.allow(t0 + Duration::from_millis(1999)));
    }
}
