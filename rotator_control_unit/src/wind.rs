//! Wind safety integration.
//!
//! Polls the injected [`WindSafety`] provider from the control loop and
//! turns its verdicts into setpoints through the internal path, which never
//! touches the manual-override timer.
//!
//! - **Emergency stow**: drive to `(stow direction, 0°)` with emergency
//!   gains. Manual setpoints are rejected while active.
//! - **Tracking**: with wind-based homing enabled and no manual command for
//!   the override period, park at the provider's optimal idle direction and
//!   follow it when it changes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use rotator_common::fault::FaultFlags;
use rotator_common::state::Axis;
use rotator_common::wind::WindSafety;

use crate::config::WindConfig;
use crate::state::ControllerState;

fn due(last: Option<Instant>, interval: Duration, now: Instant) -> bool {
    last.is_none_or(|at| now.saturating_duration_since(at) >= interval)
}

pub struct WindIntegration {
    provider: Arc<dyn WindSafety>,
    stow_poll: Duration,
    tracking_poll: Duration,
    manual_timeout: Duration,
    last_stow_poll: Option<Instant>,
    last_tracking_poll: Option<Instant>,
}

impl WindIntegration {
    pub fn new(provider: Arc<dyn WindSafety>, config: &WindConfig) -> Self {
        Self {
            provider,
            stow_poll: Duration::from_millis(config.stow_poll_interval_ms),
            tracking_poll: Duration::from_millis(config.tracking_poll_interval_ms),
            manual_timeout: Duration::from_secs(config.manual_override_timeout_s),
            last_stow_poll: None,
            last_tracking_poll: None,
        }
    }

    /// Poll the stow verdict if the stow interval has elapsed.
    pub fn update_stow(&mut self, state: &ControllerState, now: Instant) {
        if !due(self.last_stow_poll, self.stow_poll, now) {
            return;
        }
        self.last_stow_poll = Some(now);

        let was_active = state.is_wind_stow_active();
        if self.provider.should_activate_emergency_stow() {
            let data = self.provider.wind_safety_data();
            if !was_active {
                warn!(
                    "emergency wind stow activated: {} (stow to {:.1} deg)",
                    data.reason, data.stow_direction
                );
                if state.faults().intersects(FaultFlags::POWER_MASK) {
                    info!("power faults bypassed during wind stow");
                }
                state.set_wind_tracking(false, None);
            }
            state.activate_wind_stow(&data.reason, data.stow_direction);
            state.release_power_faults();
            state.set_setpoint_internal(Axis::Azimuth, data.stow_direction);
            state.set_setpoint_internal(Axis::Elevation, 0.0);
        } else if was_active {
            info!("emergency wind stow deactivated");
            state.deactivate_wind_stow();
        }
    }

    /// Poll the tracking conditions if the tracking interval has elapsed.
    pub fn update_tracking(&mut self, state: &ControllerState, now: Instant) {
        if !due(self.last_tracking_poll, self.tracking_poll, now) {
            return;
        }
        self.last_tracking_poll = Some(now);

        let was_active = state.is_wind_tracking_active();
        let quiet = now.saturating_duration_since(state.last_manual_command()) >= self.manual_timeout;
        let should_track = self.provider.is_wind_based_home_enabled()
            && !state.is_wind_stow_active()
            && !state.is_calibrating()
            && quiet
            && self.provider.is_data_valid();

        if !should_track {
            if was_active {
                info!("wind tracking deactivated");
                state.set_wind_tracking(false, None);
            }
            return;
        }

        let weather = self.provider.weather_data();
        let optimal = self
            .provider
            .calculate_optimal_stow_direction(weather.wind_direction);
        let previous = state.last_tracking_direction();
        if was_active && previous == Some(optimal) {
            return;
        }
        if !state.apply_wind_tracking(optimal, now, self.manual_timeout) {
            debug!("wind tracking deferred: manual command inside the override window");
            return;
        }
        if was_active {
            info!("wind tracking: direction changed, parking at {optimal:.1} deg");
        } else {
            info!(
                "wind tracking activated: wind from {:.0} deg at {:.1} km/h, parking at {:.1} deg",
                weather.wind_direction, weather.wind_speed_kmh, optimal
            );
        }
    }

    /// Status line for operator interfaces.
    pub fn tracking_status(provider: &dyn WindSafety, state: &ControllerState) -> String {
        if !state.is_wind_tracking_active() {
            return "Inactive".to_string();
        }
        if !provider.is_data_valid() {
            return "Active (No weather data)".to_string();
        }
        let weather = provider.weather_data();
        let target = state
            .last_tracking_direction()
            .unwrap_or_else(|| provider.calculate_optimal_stow_direction(weather.wind_direction));
        format!(
            "Active: wind {:.0} deg at {:.1} km/h (gusts {:.1}), target {:.0} deg",
            weather.wind_direction, weather.wind_speed_kmh, weather.wind_gust_kmh, target
        )
    }
}
