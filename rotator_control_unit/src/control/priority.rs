//! Single-motor priority and per-axis speed ceilings.
//!
//! In single-motor mode only one axis may run. On a setpoint change the
//! axis with the larger error, normalized by its nominal rate, wins. The
//! winner keeps running while outside tolerance, then priority flips.

use tracing::debug;

use rotator_common::consts::{AZ_PRIORITY_SCALE, EL_PRIORITY_SCALE};
use rotator_common::state::{Axis, PerAxis};

#[derive(Debug, Clone, Copy)]
pub struct PriorityArbiter {
    az_priority: bool,
}

impl Default for PriorityArbiter {
    fn default() -> Self {
        Self { az_priority: true }
    }
}

impl PriorityArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Axis currently holding priority.
    pub fn priority(&self) -> Axis {
        if self.az_priority {
            Axis::Azimuth
        } else {
            Axis::Elevation
        }
    }

    /// Apply single-motor arbitration to the activity flags.
    pub fn arbitrate(
        &mut self,
        single_motor_mode: bool,
        setpoint_changed: bool,
        errors: PerAxis<f32>,
        mut active: PerAxis<bool>,
    ) -> PerAxis<bool> {
        if !single_motor_mode {
            return active;
        }

        if setpoint_changed {
            self.az_priority =
                errors.az.abs() / AZ_PRIORITY_SCALE > errors.el.abs() / EL_PRIORITY_SCALE;
            debug!("single-motor priority: {}", self.priority());
        }

        let winner = self.priority();
        if active[winner] {
            active[winner.other()] = false;
        } else {
            self.az_priority = !self.az_priority;
        }
        active
    }
}

/// Duty ceiling per axis: the dual-motor table if the other axis is also
/// running, the single-motor table otherwise.
pub fn speed_ceilings(
    active: PerAxis<bool>,
    dual: PerAxis<i32>,
    single: PerAxis<i32>,
) -> PerAxis<i32> {
    PerAxis::from_fn(|axis| {
        if active[axis.other()] {
            dual[axis]
        } else {
            single[axis]
        }
    })
}
