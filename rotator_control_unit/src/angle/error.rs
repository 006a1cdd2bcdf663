//! Signed positioning errors.

use crate::sensor::averaging::wrap_degrees;

/// Wrap a difference into `(-180, 180]`.
#[inline]
fn wrap_signed(diff: f32) -> f32 {
    if diff > 180.0 {
        diff - 360.0
    } else if diff <= -180.0 {
        diff + 360.0
    } else {
        diff
    }
}

/// Azimuth error honoring cable wrap.
///
/// With `wind_count == 0` this is the shortest signed difference in
/// `(-180, 180]`. A non-zero count biases the current angle across the seam
/// and, when the direct path would cross the seam (or the target is
/// exactly 0°), forces the move that unwinds the cable. The result always
/// lies in `(-360, 360)`.
pub fn shortest_error_az(target: f32, current: f32, wind_count: i32) -> f32 {
    let target = wrap_degrees(target);
    let mut current = wrap_degrees(current);

    if wind_count >= 1 && current < 90.0 {
        current += 360.0;
    } else if wind_count <= -1 && current > 270.0 {
        current -= 360.0;
    }

    let mut error = wrap_signed(target - current);

    let landing = current + error;
    let crosses_seam = target == 0.0 || !(0.0..=360.0).contains(&landing);
    if crosses_seam {
        if wind_count <= -1 && error < 0.0 {
            error += 360.0;
        } else if wind_count >= 1 && error > 0.0 {
            error -= 360.0;
        }
    }
    error
}

/// Elevation error: shortest signed difference, no wrap tracking.
pub fn error_el(target: f32, current: f32) -> f32 {
    wrap_signed(wrap_degrees(target) - wrap_degrees(current))
}
