//! Shared controller state.
//!
//! One [`ControllerState`] is shared by `Arc` between the control loop, the
//! safety loop and any number of [`crate::handle::ControllerHandle`]s.
//! Values that change together sit behind one short-held mutex; scalar
//! status lives in atomics. No lock is held across a bus exchange.

use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rotator_common::fault::FaultFlags;
use rotator_common::state::{Axis, PerAxis};

use crate::tunables::{AtomicF32, Tunables};

/// Lock `mutex`, recovering the data if a holder panicked.
#[inline]
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// ─── Lock groups ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Setpoints {
    values: PerAxis<f32>,
    updated: PerAxis<bool>,
}

impl Setpoints {
    /// Raise the updated flag only when the value changes.
    fn write(&mut self, axis: Axis, value: f32) -> bool {
        if self.values[axis] == value {
            return false;
        }
        self.values[axis] = value;
        self.updated[axis] = true;
        true
    }
}

/// Latest measurement published by the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisReadings {
    pub corrected: PerAxis<f32>,
    pub error: PerAxis<f32>,
}

#[derive(Debug, Clone)]
struct WindState {
    stow_reason: String,
    stow_direction: f32,
    last_tracking_direction: Option<f32>,
    last_manual_command: Instant,
}

/// Calibration work queued for the control loop.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationRequests {
    /// Timed move: signed run time [ms] and axis.
    pub timed_move: Option<(i64, Axis)>,
    /// Re-zero the elevation start angle on the next tick.
    pub tare_elevation: bool,
}

// ─── ControllerState ────────────────────────────────────────────────

#[derive(Debug)]
pub struct ControllerState {
    setpoints: Mutex<Setpoints>,
    readings: Mutex<AxisReadings>,
    wind: Mutex<WindState>,
    calibration: Mutex<CalibrationRequests>,

    faults: AtomicU16,
    global_fault: AtomicBool,
    hard_stop: AtomicBool,
    motor_active: PerAxis<AtomicBool>,
    motor_latched: PerAxis<AtomicBool>,
    calibration_mode: AtomicBool,
    wind_stow_active: AtomicBool,
    wind_tracking_active: AtomicBool,
    wind_count: AtomicI32,
    el_start_angle: AtomicF32,

    tunables: Tunables,
}

impl ControllerState {
    pub fn new(tunables: Tunables, wind_count: i32, el_start_angle: f32, now: Instant) -> Self {
        Self {
            setpoints: Mutex::new(Setpoints::default()),
            readings: Mutex::new(AxisReadings::default()),
            wind: Mutex::new(WindState {
                stow_reason: String::new(),
                stow_direction: 0.0,
                last_tracking_direction: None,
                last_manual_command: now,
            }),
            calibration: Mutex::new(CalibrationRequests::default()),
            faults: AtomicU16::new(0),
            global_fault: AtomicBool::new(false),
            hard_stop: AtomicBool::new(false),
            motor_active: PerAxis::from_fn(|_| AtomicBool::new(false)),
            motor_latched: PerAxis::from_fn(|_| AtomicBool::new(false)),
            calibration_mode: AtomicBool::new(false),
            wind_stow_active: AtomicBool::new(false),
            wind_tracking_active: AtomicBool::new(false),
            wind_count: AtomicI32::new(wind_count),
            el_start_angle: AtomicF32::new(el_start_angle),
            tunables,
        }
    }

    #[inline]
    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    // ── Setpoints ──

    pub fn setpoints(&self) -> PerAxis<f32> {
        lock(&self.setpoints).values
    }

    /// Store a setpoint without touching the manual-override timer.
    ///
    /// The updated flag is raised only when the value changes. Returns
    /// whether it did.
    pub fn set_setpoint_internal(&self, axis: Axis, value: f32) -> bool {
        lock(&self.setpoints).write(axis, value)
    }

    /// Mark both setpoints as fresh (startup homing).
    pub fn force_setpoints(&self, values: PerAxis<f32>) {
        let mut sp = lock(&self.setpoints);
        sp.values = values;
        sp.updated = PerAxis::splat(true);
    }

    /// Current setpoints and their updated flags; the flags are cleared.
    pub fn take_setpoints(&self) -> (PerAxis<f32>, PerAxis<bool>) {
        let mut sp = lock(&self.setpoints);
        let updated = sp.updated;
        sp.updated = PerAxis::splat(false);
        (sp.values, updated)
    }

    // ── Readings ──

    pub fn readings(&self) -> AxisReadings {
        *lock(&self.readings)
    }

    pub fn publish_readings(&self, readings: AxisReadings) {
        *lock(&self.readings) = readings;
    }

    // ── Faults ──

    pub fn faults(&self) -> FaultFlags {
        FaultFlags::from_bits_truncate(self.faults.load(Ordering::Acquire))
    }

    /// Latch `flags`. Returns the ones that were not already set.
    pub fn raise_faults(&self, flags: FaultFlags) -> FaultFlags {
        let before = FaultFlags::from_bits_truncate(
            self.faults.fetch_or(flags.bits(), Ordering::AcqRel),
        );
        flags - before
    }

    /// Clear `flags` only; the global fault is left as it is.
    pub fn clear_faults(&self, flags: FaultFlags) {
        self.faults.fetch_and(!flags.bits(), Ordering::AcqRel);
    }

    /// Clear the power group and drop the global fault if nothing that
    /// counts in the current mode remains.
    pub fn release_power_faults(&self) {
        self.clear_faults(FaultFlags::POWER_MASK);
        let remaining = self
            .faults()
            .considered(self.is_calibrating(), self.is_wind_stow_active());
        if remaining.is_empty() {
            self.global_fault.store(false, Ordering::Release);
        }
    }

    pub fn global_fault(&self) -> bool {
        self.global_fault.load(Ordering::Acquire)
    }

    pub fn latch_global_fault(&self) {
        self.global_fault.store(true, Ordering::Release);
    }

    pub fn hard_stop_engaged(&self) -> bool {
        self.hard_stop.load(Ordering::Acquire)
    }

    /// Latch the hard stop. Returns `true` on the first engagement.
    pub fn engage_hard_stop(&self) -> bool {
        !self.hard_stop.swap(true, Ordering::AcqRel)
    }

    // ── Motor status ──

    pub fn motor_active(&self, axis: Axis) -> bool {
        self.motor_active[axis].load(Ordering::Acquire)
    }

    pub fn motor_latched(&self, axis: Axis) -> bool {
        self.motor_latched[axis].load(Ordering::Acquire)
    }

    pub fn publish_motor_state(&self, axis: Axis, active: bool, latched: bool) {
        self.motor_active[axis].store(active, Ordering::Release);
        self.motor_latched[axis].store(latched, Ordering::Release);
    }

    // ── Calibration ──

    pub fn is_calibrating(&self) -> bool {
        self.calibration_mode.load(Ordering::Acquire)
    }

    /// Enter or leave calibration mode. Entering clears the global fault
    /// and releases the hard stop.
    pub fn set_calibration_mode(&self, enabled: bool) {
        self.calibration_mode.store(enabled, Ordering::Release);
        if enabled {
            self.global_fault.store(false, Ordering::Release);
            self.hard_stop.store(false, Ordering::Release);
        } else {
            *lock(&self.calibration) = CalibrationRequests::default();
        }
    }

    pub fn request_timed_move(&self, run_time_ms: i64, axis: Axis) {
        lock(&self.calibration).timed_move = Some((run_time_ms, axis));
    }

    pub fn request_elevation_tare(&self) {
        lock(&self.calibration).tare_elevation = true;
    }

    /// Pending calibration work; the queue is emptied.
    pub fn take_calibration_requests(&self) -> CalibrationRequests {
        std::mem::take(&mut *lock(&self.calibration))
    }

    pub fn el_start_angle(&self) -> f32 {
        self.el_start_angle.load()
    }

    pub fn set_el_start_angle(&self, angle: f32) {
        self.el_start_angle.store(angle);
    }

    // ── Unwind ──

    pub fn wind_count(&self) -> i32 {
        self.wind_count.load(Ordering::Acquire)
    }

    pub fn set_wind_count(&self, count: i32) {
        self.wind_count.store(count, Ordering::Release);
    }

    // ── Wind ──

    pub fn is_wind_stow_active(&self) -> bool {
        self.wind_stow_active.load(Ordering::Acquire)
    }

    pub fn activate_wind_stow(&self, reason: &str, direction: f32) {
        {
            let mut wind = lock(&self.wind);
            wind.stow_reason.clear();
            wind.stow_reason.push_str(reason);
            wind.stow_direction = direction;
        }
        self.wind_stow_active.store(true, Ordering::Release);
    }

    pub fn deactivate_wind_stow(&self) {
        self.wind_stow_active.store(false, Ordering::Release);
        lock(&self.wind).stow_reason.clear();
    }

    pub fn wind_stow_reason(&self) -> String {
        lock(&self.wind).stow_reason.clone()
    }

    pub fn wind_stow_direction(&self) -> f32 {
        lock(&self.wind).stow_direction
    }

    pub fn is_wind_tracking_active(&self) -> bool {
        self.wind_tracking_active.load(Ordering::Acquire)
    }

    pub fn set_wind_tracking(&self, active: bool, direction: Option<f32>) {
        self.wind_tracking_active.store(active, Ordering::Release);
        lock(&self.wind).last_tracking_direction = direction;
    }

    pub fn last_tracking_direction(&self) -> Option<f32> {
        lock(&self.wind).last_tracking_direction
    }

    pub fn last_manual_command(&self) -> Instant {
        lock(&self.wind).last_manual_command
    }

    /// Manual setpoint: restarts the override window, ends wind tracking
    /// and stores the value in one critical section. Lock order is wind,
    /// then setpoints.
    pub fn set_setpoint_manual(&self, axis: Axis, value: f32, now: Instant) -> bool {
        let mut wind = lock(&self.wind);
        Self::end_tracking(&mut wind, &self.wind_tracking_active, now);
        lock(&self.setpoints).write(axis, value)
    }

    /// Park at `direction` for wind tracking, unless a manual command
    /// arrived within `quiet_for` of `now`.
    ///
    /// The override check, both setpoints and the tracking flag change
    /// together under the wind lock, so a concurrent manual setpoint is
    /// never overwritten. Returns whether tracking was applied.
    pub fn apply_wind_tracking(&self, direction: f32, now: Instant, quiet_for: Duration) -> bool {
        let mut wind = lock(&self.wind);
        if now.saturating_duration_since(wind.last_manual_command) < quiet_for {
            return false;
        }
        {
            let mut sp = lock(&self.setpoints);
            sp.write(Axis::Azimuth, direction);
            sp.write(Axis::Elevation, 0.0);
        }
        wind.last_tracking_direction = Some(direction);
        self.wind_tracking_active.store(true, Ordering::Release);
        true
    }

    fn end_tracking(wind: &mut WindState, active: &AtomicBool, now: Instant) {
        wind.last_manual_command = now;
        wind.last_tracking_direction = None;
        active.store(false, Ordering::Release);
    }
}
