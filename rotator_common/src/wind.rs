//! Wind-safety provider interface.
//!
//! The provider owns weather acquisition and stow policy; the control core
//! only polls it. All methods must be cheap and non-blocking.

use serde::{Deserialize, Serialize};

/// Emergency stow decision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WindSafetyData {
    pub emergency_stow_active: bool,
    /// Azimuth to stow at [deg].
    pub stow_direction: f32,
    pub reason: String,
}

/// Latest weather observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherData {
    pub wind_speed_kmh: f32,
    pub wind_gust_kmh: f32,
    /// Direction the wind blows from [deg].
    pub wind_direction: f32,
    pub data_valid: bool,
}

/// Source of wind-based stow and tracking decisions.
pub trait WindSafety: Send + Sync {
    fn should_activate_emergency_stow(&self) -> bool;

    fn wind_safety_data(&self) -> WindSafetyData;

    /// Whether the dish should follow the wind while idle.
    fn is_wind_based_home_enabled(&self) -> bool;

    fn is_data_valid(&self) -> bool;

    fn weather_data(&self) -> WeatherData;

    /// Azimuth that presents the least area to wind from `wind_direction`.
    fn calculate_optimal_stow_direction(&self, wind_direction: f32) -> f32;
}

/// Provider for stations without a weather source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWindSafety;

impl WindSafety for NoWindSafety {
    fn should_activate_emergency_stow(&self) -> bool {
        false
    }

    fn wind_safety_data(&self) -> WindSafetyData {
        WindSafetyData::default()
    }

    fn is_wind_based_home_enabled(&self) -> bool {
        false
    }

    fn is_data_valid(&self) -> bool {
        false
    }

    fn weather_data(&self) -> WeatherData {
        WeatherData::default()
    }

    fn calculate_optimal_stow_direction(&self, wind_direction: f32) -> f32 {
        wind_direction
    }
}
