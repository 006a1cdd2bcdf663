//! Convergence monitoring.
//!
//! Each axis keeps a fixed ring of recent |error| samples taken every
//! [`ERROR_SAMPLE_INTERVAL_MS`]. The ring feeds two checks:
//!
//! - **Divergence**: the newest third of the samples averages more than
//!   [`DIVERGENCE_THRESHOLD`] times the older remainder.
//! - **Stall**: the least-squares slope over the newest half is flat while
//!   the error is still well outside tolerance.
//!
//! Both are only judged once [`CONVERGENCE_TIMEOUT_MS`] has passed since the
//! last setpoint change, with at least half the ring filled, and while the
//! motor is supposed to be moving.

use std::time::{Duration, Instant};

use heapless::HistoryBuffer;
use tracing::debug;

use rotator_common::consts::{
    CONVERGENCE_TIMEOUT_MS, DIVERGENCE_THRESHOLD, ERROR_HISTORY_SIZE, ERROR_SAMPLE_INTERVAL_MS,
    STALL_THRESHOLD,
};
use rotator_common::state::{Axis, PerAxis};

const SAMPLE_INTERVAL: Duration = Duration::from_millis(ERROR_SAMPLE_INTERVAL_MS);
const CONVERGENCE_TIMEOUT: Duration = Duration::from_millis(CONVERGENCE_TIMEOUT_MS);

#[derive(Debug, Clone, Copy)]
struct ErrorSample {
    magnitude: f32,
    at: Instant,
}

/// Error history for one axis.
#[derive(Debug, Clone)]
pub struct ErrorTracker {
    history: HistoryBuffer<ErrorSample, ERROR_HISTORY_SIZE>,
    setpoint_changed_at: Instant,
    motor_should_be_active: bool,
}

impl ErrorTracker {
    pub fn new(now: Instant) -> Self {
        Self {
            history: HistoryBuffer::new(),
            setpoint_changed_at: now,
            motor_should_be_active: false,
        }
    }

    /// Forget all samples; the grace period restarts at `now`.
    pub fn reset(&mut self, now: Instant) {
        *self = Self::new(now);
    }

    pub fn sample_count(&self) -> usize {
        self.history.len()
    }

    /// Newest |error|.
    pub fn latest(&self) -> Option<f32> {
        self.history.recent().map(|s| s.magnitude)
    }

    /// When the newest sample was taken.
    pub fn last_sample_at(&self) -> Option<Instant> {
        self.history.recent().map(|s| s.at)
    }

    pub fn motor_should_be_active(&self) -> bool {
        self.motor_should_be_active
    }

    /// Append a sample if the interval has elapsed. Returns true when recorded.
    pub fn record(&mut self, now: Instant, error: f32, motor_should_be_active: bool) -> bool {
        let due = self
            .last_sample_at()
            .is_none_or(|last| now.saturating_duration_since(last) >= SAMPLE_INTERVAL);
        if !due {
            return false;
        }
        self.history.write(ErrorSample {
            magnitude: error.abs(),
            at: now,
        });
        self.motor_should_be_active = motor_should_be_active;
        true
    }

    /// Enough history, past the grace period, and the motor should be moving.
    pub fn ready_for_check(&self, now: Instant) -> bool {
        self.sample_count() >= ERROR_HISTORY_SIZE / 2
            && self.motor_should_be_active
            && now.saturating_duration_since(self.setpoint_changed_at) > CONVERGENCE_TIMEOUT
    }

    /// Magnitudes newest first.
    fn newest_first(&self) -> impl Iterator<Item = f32> + '_ {
        let len = self.history.len();
        let mut ordered: heapless::Vec<f32, ERROR_HISTORY_SIZE> = heapless::Vec::new();
        for s in self.history.oldest_ordered() {
            // Never exceeds the ring capacity.
            let _ = ordered.push(s.magnitude);
        }
        (0..len).rev().map(move |i| ordered[i])
    }

    /// Recent third of the ring averages well above the rest.
    pub fn is_error_diverging(&self, tolerance: f32) -> bool {
        let count = self.sample_count();
        if count < ERROR_HISTORY_SIZE / 2 {
            return false;
        }
        let recent_n = count.min(ERROR_HISTORY_SIZE / 3);
        let old_n = count - recent_n;
        if old_n == 0 {
            return false;
        }

        let (recent_sum, old_sum) = self
            .newest_first()
            .enumerate()
            .fold((0.0f32, 0.0f32), |(r, o), (i, e)| {
                if i < recent_n { (r + e, o) } else { (r, o + e) }
            });
        let recent_avg = recent_sum / recent_n as f32;
        let old_avg = old_sum / old_n as f32;

        let diverging = recent_avg > old_avg * DIVERGENCE_THRESHOLD && recent_avg > tolerance * 2.0;
        if diverging {
            debug!("divergence: recent avg {recent_avg:.3}, old avg {old_avg:.3}, tolerance {tolerance:.3}");
        }
        diverging
    }

    /// Least-squares slope of |error| over the newest half of the ring
    /// [deg/s]. Negative while converging. Zero with fewer than 3 samples.
    pub fn error_change_rate(&self) -> f32 {
        let count = self.sample_count();
        if count < 3 {
            return 0.0;
        }
        let n = count.min(ERROR_HISTORY_SIZE / 2);

        // x runs forward in time: oldest of the window is 0.
        let (mut sx, mut sy, mut sxy, mut sxx) = (0.0f32, 0.0f32, 0.0f32, 0.0f32);
        for (age, e) in self.newest_first().take(n).enumerate() {
            let x = (n - 1 - age) as f32;
            sx += x;
            sy += e;
            sxy += x * e;
            sxx += x * x;
        }
        let nf = n as f32;
        let denom = nf * sxx - sx * sx;
        if denom == 0.0 {
            return 0.0;
        }
        let per_sample = (nf * sxy - sx * sy) / denom;
        per_sample * (1000.0 / ERROR_SAMPLE_INTERVAL_MS as f32)
    }

    /// Error well outside tolerance but no longer shrinking.
    pub fn is_convergence_stalled(&self, tolerance: f32) -> bool {
        if self.sample_count() < ERROR_HISTORY_SIZE / 2 {
            return false;
        }
        let Some(current) = self.latest() else {
            return false;
        };
        let rate = self.error_change_rate();
        let stalled = current > tolerance * 1.5 && rate.abs() < STALL_THRESHOLD;
        if stalled {
            debug!("stall: error {current:.3}, rate {rate:.4} deg/s, tolerance {tolerance:.3}");
        }
        stalled
    }
}

/// Error trackers for both axes.
#[derive(Debug, Clone)]
pub struct ConvergenceMonitor {
    trackers: PerAxis<ErrorTracker>,
}

impl ConvergenceMonitor {
    pub fn new(now: Instant) -> Self {
        Self {
            trackers: PerAxis::from_fn(|_| ErrorTracker::new(now)),
        }
    }

    pub fn tracker(&self, axis: Axis) -> &ErrorTracker {
        &self.trackers[axis]
    }

    pub fn reset(&mut self, axis: Axis, now: Instant) {
        self.trackers[axis].reset(now);
    }

    /// Offer the current errors; each tracker samples on its own schedule.
    pub fn record(&mut self, now: Instant, errors: PerAxis<f32>, should_be_active: PerAxis<bool>) {
        for axis in Axis::ALL {
            self.trackers[axis].record(now, errors[axis], should_be_active[axis]);
        }
    }

    /// First axis found diverging, if any.
    pub fn check_divergence(&self, now: Instant, tolerances: PerAxis<f32>) -> Option<Axis> {
        Axis::ALL.into_iter().find(|&axis| {
            let tracker = &self.trackers[axis];
            tracker.ready_for_check(now) && tracker.is_error_diverging(tolerances[axis])
        })
    }

    /// Axes whose convergence has stalled.
    pub fn check_stall(&self, now: Instant, tolerances: PerAxis<f32>) -> PerAxis<bool> {
        PerAxis::from_fn(|axis| {
            let tracker = &self.trackers[axis];
            tracker.ready_for_check(now) && tracker.is_convergence_stalled(tolerances[axis])
        })
    }
}
