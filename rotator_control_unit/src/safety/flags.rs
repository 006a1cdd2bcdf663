//! Limit evaluation for the safety tick.
//!
//! Pure functions: they read measurements and return the flags that should
//! be raised. Latching and logging happen in [`super::supervisor`].

use rotator_common::consts::{EL_OUT_OF_BOUNDS_HIGH, EL_OUT_OF_BOUNDS_LOW, MAX_WIND_COUNT};
use rotator_common::fault::FaultFlags;

/// Measurements and limits for one safety evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyFlagInput {
    /// Corrected elevation [deg].
    pub corrected_el: f32,
    /// Azimuth unwind counter.
    pub wind_count: i32,
    /// Measured power [W].
    pub power_w: f32,
    /// Measured load voltage [V].
    pub voltage_v: f32,
    pub max_power_w: i32,
    pub min_voltage_v: i32,
    pub calibrating: bool,
    pub stowing: bool,
}

/// Elevation inside the forbidden window, or not a number.
#[inline]
pub fn elevation_out_of_bounds(corrected_el: f32) -> bool {
    corrected_el.is_nan()
        || (corrected_el > EL_OUT_OF_BOUNDS_LOW && corrected_el < EL_OUT_OF_BOUNDS_HIGH)
}

#[inline]
pub fn over_spin(wind_count: i32) -> bool {
    wind_count.abs() > MAX_WIND_COUNT
}

/// Flags violated by `input`, honoring the mode exclusions.
///
/// Position limits are skipped in calibration mode; power limits are
/// skipped during an emergency stow.
pub fn evaluate_limits(input: &SafetyFlagInput) -> FaultFlags {
    let mut flags = FaultFlags::empty();

    // ── Position ──
    if !input.calibrating {
        if elevation_out_of_bounds(input.corrected_el) {
            flags |= FaultFlags::OUT_OF_BOUNDS;
        }
        if over_spin(input.wind_count) {
            flags |= FaultFlags::OVER_SPIN;
        }
    }

    // ── Power ──
    if !input.stowing {
        if input.power_w > input.max_power_w as f32 {
            flags |= FaultFlags::OVER_POWER;
        }
        if input.voltage_v < input.min_voltage_v as f32 {
            flags |= FaultFlags::LOW_VOLTAGE;
        }
    }

    flags
}

/// Log line for a newly raised limit flag, including the measurement.
pub fn limit_message(flag: FaultFlags, input: &SafetyFlagInput) -> String {
    if flag == FaultFlags::OUT_OF_BOUNDS {
        format!("elevation out of bounds: {:.2} deg", input.corrected_el)
    } else if flag == FaultFlags::OVER_SPIN {
        format!("azimuth over-spin: wind count {}", input.wind_count)
    } else if flag == FaultFlags::OVER_POWER {
        format!(
            "over power: {:.2} W (limit {} W)",
            input.power_w, input.max_power_w
        )
    } else if flag == FaultFlags::LOW_VOLTAGE {
        format!(
            "low voltage: {:.2} V (limit {} V)",
            input.voltage_v, input.min_voltage_v
        )
    } else {
        flag.describe().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nominal() -> SafetyFlagInput {
        SafetyFlagInput {
            corrected_el: 45.0,
            wind_count: 0,
            power_w: 3.0,
            voltage_v: 12.0,
            max_power_w: 10,
            min_voltage_v: 6,
            calibrating: false,
            stowing: false,
        }
    }

    #[test]
    fn nominal_raises_nothing() {
        assert!(evaluate_limits(&nominal()).is_empty());
    }

    #[test]
    fn elevation_window_is_exclusive() {
        assert!(!elevation_out_of_bounds(95.0));
        assert!(elevation_out_of_bounds(95.1));
        assert!(elevation_out_of_bounds(200.0));
        assert!(!elevation_out_of_bounds(355.0));
        assert!(!elevation_out_of_bounds(359.0));
        assert!(elevation_out_of_bounds(f32::NAN));
    }

    #[test]
    fn over_spin_beyond_one_turn() {
        assert!(!over_spin(1));
        assert!(!over_spin(-1));
        assert!(over_spin(2));
        assert!(over_spin(-2));
    }

    #[test]
    fn over_power_and_low_voltage() {
        let input = SafetyFlagInput {
            power_w: 12.0,
            voltage_v: 5.0,
            ..nominal()
        };
        assert_eq!(
            evaluate_limits(&input),
            FaultFlags::OVER_POWER | FaultFlags::LOW_VOLTAGE
        );
    }

    #[test]
    fn calibration_skips_position_limits() {
        let input = SafetyFlagInput {
            corrected_el: 180.0,
            wind_count: 3,
            calibrating: true,
            ..nominal()
        };
        assert!(evaluate_limits(&input).is_empty());
    }

    #[test]
    fn stow_skips_power_limits() {
        let input = SafetyFlagInput {
            power_w: 20.0,
            voltage_v: 1.0,
            stowing: true,
            ..nominal()
        };
        assert!(evaluate_limits(&input).is_empty());
    }

    #[test]
    fn messages_carry_measurements() {
        let input = SafetyFlagInput {
            power_w: 12.0,
            ..nominal()
        };
        assert!(limit_message(FaultFlags::OVER_POWER, &input).contains("12.00 W"));
        assert!(limit_message(FaultFlags::OVER_SPIN, &input).contains("wind count 0"));
    }
}
