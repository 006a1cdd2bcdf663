//! Scriptable wind provider.

use std::sync::Mutex;

use rotator_common::wind::{WeatherData, WindSafety, WindSafetyData};

use crate::state::lock;

#[derive(Debug, Clone, Default)]
struct Script {
    stow: WindSafetyData,
    home_enabled: bool,
    weather: WeatherData,
}

/// Wind provider whose verdicts are set by the caller.
///
/// The optimal idle direction is perpendicular to the wind.
#[derive(Debug, Default)]
pub struct ScriptedWeather {
    script: Mutex<Script>,
}

impl ScriptedWeather {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_emergency_stow(&self, active: bool, direction: f32, reason: &str) {
        let mut s = lock(&self.script);
        s.stow = WindSafetyData {
            emergency_stow_active: active,
            stow_direction: direction,
            reason: reason.to_string(),
        };
    }

    /// Enable wind-based homing with valid data for wind from `direction`.
    pub fn set_tracking(&self, enabled: bool, direction: f32, speed_kmh: f32) {
        let mut s = lock(&self.script);
        s.home_enabled = enabled;
        s.weather = WeatherData {
            wind_speed_kmh: speed_kmh,
            wind_gust_kmh: speed_kmh * 1.5,
            wind_direction: direction,
            data_valid: true,
        };
    }

    pub fn set_data_valid(&self, valid: bool) {
        lock(&self.script).weather.data_valid = valid;
    }
}

impl WindSafety for ScriptedWeather {
    fn should_activate_emergency_stow(&self) -> bool {
        lock(&self.script).stow.emergency_stow_active
    }

    fn wind_safety_data(&self) -> WindSafetyData {
        lock(&self.script).stow.clone()
    }

    fn is_wind_based_home_enabled(&self) -> bool {
        lock(&self.script).home_enabled
    }

    fn is_data_valid(&self) -> bool {
        lock(&self.script).weather.data_valid
    }

    fn weather_data(&self) -> WeatherData {
        lock(&self.script).weather
    }

    fn calculate_optimal_stow_direction(&self, wind_direction: f32) -> f32 {
        (wind_direction + 90.0).rem_euclid(360.0)
    }
}
