//! Outlier-rejecting circular mean.
//!
//! Angles are averaged as unit vectors so that samples straddling the
//! 0°/360° seam average correctly. Samples whose x or y component lies more
//! than two sample standard deviations from the component mean are
//! discarded before the final `atan2`.

/// Wrap any finite angle into `[0, 360)`.
#[inline]
pub fn wrap_degrees(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Circular mean of `samples` in degrees, in `[0, 360)`.
///
/// Returns `None` for an empty slice.
pub fn average_angles(samples: &[f32]) -> Option<f32> {
    if samples.is_empty() {
        return None;
    }

    let n = samples.len() as f64;
    let vectors = samples.iter().map(|&deg| {
        let rad = (deg as f64).to_radians();
        (rad.cos(), rad.sin())
    });

    let (sum_x, sum_y) = vectors
        .clone()
        .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);

    let dof = if samples.len() > 1 { n - 1.0 } else { 1.0 };
    let (var_x, var_y) = vectors.clone().fold((0.0, 0.0), |(vx, vy), (x, y)| {
        (vx + (x - mean_x).powi(2), vy + (y - mean_y).powi(2))
    });
    let limit_x = 2.0 * (var_x / dof).sqrt();
    let limit_y = 2.0 * (var_y / dof).sqrt();

    let (kept_x, kept_y, kept) = vectors
        .filter(|&(x, y)| (x - mean_x).abs() <= limit_x && (y - mean_y).abs() <= limit_y)
        .fold((0.0, 0.0, 0usize), |(sx, sy, k), (x, y)| (sx + x, sy + y, k + 1));

    let (x, y) = if kept == 0 {
        (sum_x, sum_y)
    } else {
        (kept_x, kept_y)
    };

    Some(wrap_degrees(y.atan2(x).to_degrees() as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular_distance(a: f32, b: f32) -> f32 {
        let d = wrap_degrees(a - b);
        d.min(360.0 - d)
    }

    #[test]
    fn empty_input_has_no_mean() {
        assert_eq!(average_angles(&[]), None);
    }

    #[test]
    fn single_sample_is_returned() {
        let mean = average_angles(&[123.4]).unwrap();
        assert!((mean - 123.4).abs() < 1e-3);
    }

    #[test]
    fn samples_across_the_seam_average_near_zero() {
        let mean = average_angles(&[359.5, 0.5, 359.8, 0.2]).unwrap();
        assert!(circular_distance(mean, 0.0) < 0.01, "mean = {mean}");
        assert!((0.0..360.0).contains(&mean));
    }

    #[test]
    fn single_outlier_is_excluded() {
        let samples = [9.9, 10.1, 10.0, 9.95, 10.05, 10.0, 9.9, 10.1, 200.0];
        let mean = average_angles(&samples).unwrap();
        // Including the outlier would pull the mean to roughly 8.6°.
        assert!((mean - 10.0).abs() < 0.05, "mean = {mean}");
    }

    #[test]
    fn two_outliers_are_excluded() {
        let mut samples = vec![45.0f32; 12];
        samples[3] = 44.8;
        samples[7] = 45.2;
        samples.extend([225.0, 225.0]);
        let mean = average_angles(&samples).unwrap();
        assert!((mean - 45.0).abs() < 0.05, "mean = {mean}");
    }

    #[test]
    fn identical_samples_survive_zero_deviation() {
        let mean = average_angles(&[270.0; 10]).unwrap();
        assert!((mean - 270.0).abs() < 1e-3);
    }

    #[test]
    fn wrap_degrees_normalizes() {
        assert_eq!(wrap_degrees(360.0), 0.0);
        assert!((wrap_degrees(-10.0) - 350.0).abs() < 1e-4);
        assert!((wrap_degrees(725.0) - 5.0).abs() < 1e-4);
        assert!(wrap_degrees(-1e-9) < 360.0);
    }
}
