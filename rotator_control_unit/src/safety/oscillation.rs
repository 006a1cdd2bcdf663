//! Unwind oscillation detection.
//!
//! Counts unwind counter changes inside a rolling window. Too many changes
//! mean the azimuth is hunting across the 180° seam; the detector then
//! asks for a small setpoint nudge away from it.

use std::time::{Duration, Instant};

use rotator_common::consts::{OSCILLATION_LIMIT, OSCILLATION_NUDGE_DEG, OSCILLATION_WINDOW_MS};

#[derive(Debug, Clone)]
pub struct OscillationDetector {
    changes: u32,
    window_start: Option<Instant>,
    limit: u32,
    window: Duration,
}

impl Default for OscillationDetector {
    fn default() -> Self {
        Self::new(OSCILLATION_LIMIT, Duration::from_millis(OSCILLATION_WINDOW_MS))
    }
}

impl OscillationDetector {
    pub const fn new(limit: u32, window: Duration) -> Self {
        Self {
            changes: 0,
            window_start: None,
            limit,
            window,
        }
    }

    pub fn changes(&self) -> u32 {
        self.changes
    }

    /// Count one unwind change. Returns `true` when the limit is reached;
    /// the count resets in that case.
    pub fn record_change(&mut self, now: Instant) -> bool {
        if self.changes == 0 {
            self.window_start = Some(now);
        }
        self.changes += 1;
        if self.changes >= self.limit {
            self.reset();
            return true;
        }
        false
    }

    /// Reset once the window has elapsed.
    pub fn expire(&mut self, now: Instant) {
        if let Some(start) = self.window_start
            && now.saturating_duration_since(start) > self.window
        {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.changes = 0;
        self.window_start = None;
    }
}

/// Nudge applied to the azimuth setpoint: toward 0° on the low half,
/// toward 360° on the high half.
#[inline]
pub fn nudge_for(current_az: f32) -> f32 {
    if current_az <= 180.0 {
        -OSCILLATION_NUDGE_DEG
    } else {
        OSCILLATION_NUDGE_DEG
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tenth_change_triggers_and_resets() {
        let t0 = Instant::now();
        let mut det = OscillationDetector::default();
        for i in 0..9 {
            assert!(!det.record_change(t0 + Duration::from_secs(i)));
        }
        assert!(det.record_change(t0 + Duration::from_secs(9)));
        assert_eq!(det.changes(), 0);
    }

    #[test]
    fn window_expiry_resets() {
        let t0 = Instant::now();
        let mut det = OscillationDetector::default();
        for _ in 0..5 {
            det.record_change(t0);
        }
        det.expire(t0 + Duration::from_secs(30));
        assert_eq!(det.changes(), 5);
        det.expire(t0 + Duration::from_secs(61));
        assert_eq!(det.changes(), 0);
    }

    #[test]
    fn nudge_moves_away_from_seam() {
        assert_eq!(nudge_for(179.0), -1.0);
        assert_eq!(nudge_for(180.0), -1.0);
        assert_eq!(nudge_for(181.0), 1.0);
    }
}
