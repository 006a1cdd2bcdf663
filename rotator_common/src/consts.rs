//! System-wide constants for the rotator workspace.
//!
//! Single source of truth for sensor registers, duty values, timing windows
//! and safety thresholds. Tunable values that an operator may change at
//! runtime live in [`crate::settings`] instead.

use static_assertions::const_assert;

// ─── Angle Sensors ──────────────────────────────────────────────────

/// Default bus address of the azimuth angle sensor.
pub const AZ_SENSOR_ADDRESS: u8 = 0x40;

/// Default bus address of the elevation angle sensor.
pub const EL_SENSOR_ADDRESS: u8 = 0x36;

/// Status register (magnet detect / strength bits).
pub const STATUS_REGISTER: u8 = 0x0B;

/// First byte of the two-byte big-endian angle register.
pub const ANGLE_REGISTER: u8 = 0x0C;

/// Degrees per raw sensor count (12-bit, 4096 counts per turn).
pub const DEGREES_PER_COUNT: f32 = 360.0 / 4096.0;

/// Status bit: magnet detected.
pub const STATUS_MAGNET_DETECTED: u8 = 0x20;
/// Status bit: magnet too weak.
pub const STATUS_MAGNET_WEAK: u8 = 0x10;
/// Status bit: magnet too strong.
pub const STATUS_MAGNET_STRONG: u8 = 0x08;

/// Samples averaged per angle reading.
pub const DEFAULT_SAMPLES: usize = 10;

/// Per-exchange bus deadline [µs].
pub const DEFAULT_BUS_TIMEOUT_US: u64 = 3_000;

/// Consecutive bus failures before a bus fault latches.
pub const MAX_CONSECUTIVE_ERRORS: u8 = 5;

// ─── Angle Frame ────────────────────────────────────────────────────

/// Fixed azimuth mechanical offset [deg].
pub const AZ_START_ANGLE: f32 = 10.0;

/// Elevation window considered out of bounds: `(LOW, HIGH)` exclusive.
pub const EL_OUT_OF_BOUNDS_LOW: f32 = 95.0;
/// Upper edge of the elevation out-of-bounds window.
pub const EL_OUT_OF_BOUNDS_HIGH: f32 = 355.0;

/// Absolute wind count beyond which the over-spin fault latches.
pub const MAX_WIND_COUNT: i32 = 1;

// ─── Actuation ──────────────────────────────────────────────────────

/// Duty value that stops a motor (PWM is inverted: 255 = off).
pub const STOP_DUTY: u8 = 255;

/// Duty value for full drive.
pub const FULL_DUTY: u8 = 0;

/// Duty change per control tick during normal operation.
pub const RAMP_STEP: i32 = 10;

/// Duty change per control tick while an emergency stow is active.
pub const RAMP_STEP_EMERGENCY: i32 = 20;

/// Length of each half of a jitter pulse [ms].
pub const JITTER_PULSE_MS: u64 = 150;

/// Error below which an overshoot is ignored [deg].
pub const OVERSHOOT_EPSILON: f32 = 0.0001;

/// Per-axis normalization used to pick a motor in single-motor mode.
pub const AZ_PRIORITY_SCALE: f32 = 1.5;
/// Elevation counterpart of [`AZ_PRIORITY_SCALE`].
pub const EL_PRIORITY_SCALE: f32 = 0.25;

/// Proportional gains used while an emergency stow is active.
pub const EMERGENCY_GAIN_AZ: i32 = 50;
/// Elevation counterpart of [`EMERGENCY_GAIN_AZ`].
pub const EMERGENCY_GAIN_EL: i32 = 200;

// ─── Convergence Monitoring ─────────────────────────────────────────

/// Error samples retained per axis.
pub const ERROR_HISTORY_SIZE: usize = 20;

/// Minimum spacing between error samples [ms].
pub const ERROR_SAMPLE_INTERVAL_MS: u64 = 250;

/// Recent/old average ratio that counts as divergence.
pub const DIVERGENCE_THRESHOLD: f32 = 1.1;

/// Regression slope magnitude below which convergence is stalled [deg/s].
pub const STALL_THRESHOLD: f32 = 0.01;

/// Grace period after a setpoint change before divergence is judged [ms].
pub const CONVERGENCE_TIMEOUT_MS: u64 = 3_000;

// ─── Oscillation ────────────────────────────────────────────────────

/// Wind-count changes inside the window that trigger a nudge.
pub const OSCILLATION_LIMIT: u32 = 10;

/// Rolling oscillation window [ms].
pub const OSCILLATION_WINDOW_MS: u64 = 60_000;

/// Azimuth nudge applied to break an oscillation [deg].
pub const OSCILLATION_NUDGE_DEG: f32 = 1.0;

// ─── Wind ───────────────────────────────────────────────────────────

/// Default quiet period after a manual command before wind tracking may engage [s].
pub const DEFAULT_MANUAL_OVERRIDE_TIMEOUT_S: u64 = 60;

/// Default emergency-stow poll interval [ms].
pub const DEFAULT_STOW_POLL_MS: u64 = 1_000;

/// Default wind-tracking poll interval [ms].
pub const DEFAULT_TRACKING_POLL_MS: u64 = 10_000;

// ─── Safety Loop ────────────────────────────────────────────────────

/// Interval of power logging while the stow bypass is active [ms].
pub const STOW_POWER_LOG_MS: u64 = 2_000;

/// Minimum spacing between repeats of the same rate-limited message [ms].
pub const LOG_THROTTLE_MS: u64 = 1_000;

/// Default control loop period [ms].
pub const DEFAULT_CONTROL_PERIOD_MS: u64 = 100;

/// Default safety loop period [ms].
pub const DEFAULT_SAFETY_PERIOD_MS: u64 = 500;

// ─── Persistence Keys ───────────────────────────────────────────────

/// Key holding the elevation calibration offset.
pub const KEY_EL_START_ANGLE: &str = "el_start_angle";

/// Key holding the persisted azimuth wind count.
pub const KEY_WIND_COUNT: &str = "wind_count";

/// Key holding the single-motor-mode switch.
pub const KEY_SINGLE_MOTOR_MODE: &str = "single_motor_mode";

/// Default path of the JSON settings store.
pub const DEFAULT_STORE_PATH: &str = "rotator_settings.json";

// ─── Compile-time checks ────────────────────────────────────────────

const_assert!(ERROR_HISTORY_SIZE >= 6);
const_assert!(EL_OUT_OF_BOUNDS_LOW < EL_OUT_OF_BOUNDS_HIGH);
const_assert!(RAMP_STEP_EMERGENCY >= RAMP_STEP);
const_assert!(MAX_CONSECUTIVE_ERRORS > 0);
