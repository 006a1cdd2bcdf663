//! Corrected angles and the azimuth wind counter.
//!
//! The azimuth frame is offset by a fixed start angle so that home sits
//! away from the sensor seam. Crossing 180° between quadrants 2 and 3 moves
//! the wind counter, which records how far the cable is wrapped.

use tracing::{debug, warn};

use crate::sensor::averaging::wrap_degrees;

/// `raw - start`, wrapped into `[0, 360)`.
#[inline]
pub fn correct_angle(start: f32, raw: f32) -> f32 {
    wrap_degrees(raw - start)
}

/// Quadrant of a corrected azimuth: 1 (≤90), 2 (≤180), 3 (≤270), 4.
#[inline]
pub fn quadrant_of(angle: f32) -> u8 {
    if angle <= 90.0 {
        1
    } else if angle <= 180.0 {
        2
    } else if angle <= 270.0 {
        3
    } else {
        4
    }
}

/// Azimuth quadrant history and wind count.
#[derive(Debug, Clone)]
pub struct UnwindTracker {
    quadrant: u8,
    previous_quadrant: u8,
    wind_count: i32,
}

impl UnwindTracker {
    /// Start from a persisted wind count. The first update only records
    /// the quadrant.
    pub fn new(wind_count: i32) -> Self {
        Self {
            quadrant: 0,
            previous_quadrant: 0,
            wind_count,
        }
    }

    pub fn wind_count(&self) -> i32 {
        self.wind_count
    }

    pub fn quadrant(&self) -> u8 {
        self.quadrant
    }

    /// Feed a corrected azimuth.
    ///
    /// The quadrant is always tracked; the counter only moves when
    /// `counting` is true (outside calibration). Returns the new count
    /// when it changed.
    pub fn update(&mut self, corrected_az: f32, counting: bool) -> Option<i32> {
        self.quadrant = quadrant_of(corrected_az);
        if self.quadrant == self.previous_quadrant {
            return None;
        }

        let mut changed = None;
        if counting {
            match (self.previous_quadrant, self.quadrant) {
                (3, 2) => {
                    self.wind_count -= 1;
                    changed = Some(self.wind_count);
                }
                (2, 3) => {
                    self.wind_count += 1;
                    changed = Some(self.wind_count);
                }
                _ => {}
            }
        }
        if let Some(count) = changed {
            if count.abs() > 1 {
                warn!("azimuth wind count now {count}");
            } else {
                debug!("azimuth wind count now {count}");
            }
        }
        self.previous_quadrant = self.quadrant;
        changed
    }
}
