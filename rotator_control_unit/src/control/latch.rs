//! Per-axis arrival latch.
//!
//! An axis is active while its error is outside tolerance. Reaching
//! tolerance, or overshooting (error sign flip), latches the axis until the
//! next setpoint change so that it does not hunt around the target.

use rotator_common::consts::OVERSHOOT_EPSILON;

/// Outcome of one latch update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatchUpdate {
    /// Error outside tolerance.
    pub active: bool,
    pub latched: bool,
    /// A new setpoint was applied on this update.
    pub setpoint_changed: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AxisLatch {
    latched: bool,
    prev_error: f32,
}

impl AxisLatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_latched(&self) -> bool {
        self.latched
    }

    pub fn update(&mut self, error: f32, tolerance: f32, setpoint_changed: bool) -> LatchUpdate {
        let active = error.abs() > tolerance;

        if setpoint_changed {
            self.latched = false;
            self.prev_error = 0.0;
        }

        let overshoot = self.prev_error * error < 0.0
            && self.prev_error.abs() > OVERSHOOT_EPSILON
            && error.abs() > OVERSHOOT_EPSILON;

        if !active || overshoot {
            self.latched = true;
        }
        self.prev_error = error;

        LatchUpdate {
            active,
            latched: self.latched,
            setpoint_changed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inside_tolerance_latches() {
        let mut latch = AxisLatch::new();
        let update = latch.update(0.05, 0.1, true);
        assert!(!update.active);
        assert!(update.latched);
    }

    #[test]
    fn stays_latched_until_new_setpoint() {
        let mut latch = AxisLatch::new();
        latch.update(0.5, 1.5, false);
        assert!(latch.is_latched());
        // Drifting back out of tolerance does not release the latch.
        let update = latch.update(5.0, 1.5, false);
        assert!(update.active);
        assert!(update.latched);

        let update = latch.update(5.0, 1.5, true);
        assert!(!update.latched);
        assert!(update.setpoint_changed);
    }

    #[test]
    fn overshoot_latches() {
        let mut latch = AxisLatch::new();
        assert!(!latch.update(3.0, 1.5, true).latched);
        assert!(!latch.update(2.0, 1.5, false).latched);
        let update = latch.update(-2.0, 1.5, false);
        assert!(update.active);
        assert!(update.latched);
    }

    #[test]
    fn first_update_after_setpoint_ignores_prior_sign() {
        let mut latch = AxisLatch::new();
        latch.update(-20.0, 1.5, true);
        // New target on the other side: prior error is reset, no overshoot.
        let update = latch.update(20.0, 1.5, true);
        assert!(!update.latched);
    }
}
