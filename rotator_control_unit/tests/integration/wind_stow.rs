//! Integration test: emergency wind stow and wind tracking.

use std::time::Duration;

use rotator_common::prelude::{Axis, FaultFlags};
use rotator_control_unit::handle::CommandError;
use rotator_control_unit::sim::DishParams;

use super::Station;

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn stow_drives_to_stow_direction_and_rejects_manual() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();

    station.weather.set_emergency_stow(true, 200.0, "gusts above 60 km/h");
    station.run(1);
    assert!(handle.is_wind_stow_active());
    assert!(handle.is_movement_blocked());
    assert_eq!(handle.setpoint_az(), 200.0);
    assert_eq!(handle.setpoint_el(), 0.0);
    assert_eq!(handle.wind_stow_reason(), "gusts above 60 km/h");

    let err = handle.set_setpoint_az(50.0).unwrap_err();
    assert!(matches!(err, CommandError::WindStowActive { .. }));
    assert_eq!(handle.setpoint_az(), 200.0);

    station.run_until_idle(300);
    assert!(
        (handle.corrected_angle_az() - 200.0).abs() < 3.5,
        "stowed at {}",
        handle.corrected_angle_az()
    );
}

#[test]
fn stow_bypasses_power_faults() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    station.weather.set_emergency_stow(true, 90.0, "storm");
    station.dish.set_power_override(Some(18.0));

    station.run(10);
    assert!(!handle.faults().intersects(FaultFlags::POWER_MASK));
    assert!(!handle.global_fault());
    assert!(!handle.hard_stop_engaged());
    assert!(station.dish.is_moving(Axis::Azimuth));
}

#[test]
fn stow_end_restores_manual_control() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    station.weather.set_emergency_stow(true, 90.0, "storm");
    station.run(5);

    station.weather.set_emergency_stow(false, 0.0, "");
    station.run(10);
    assert!(!handle.is_wind_stow_active());
    handle.set_setpoint_az(30.0).unwrap();
    assert_eq!(handle.setpoint_az(), 30.0);
}

#[test]
fn tracking_engages_after_manual_quiet_period() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    station.weather.set_tracking(true, 45.0, 20.0);

    // Still inside the manual-override window after startup.
    station.run(10);
    assert!(!handle.is_wind_tracking_active());
    assert_eq!(handle.wind_tracking_status(), "Inactive");

    // Jump past the window; the next tracking poll engages.
    station.now += Duration::from_secs(61);
    station.run(1);
    assert!(handle.is_wind_tracking_active());
    assert_eq!(handle.setpoint_az(), 135.0);
    assert!(handle.wind_tracking_status().starts_with("Active: wind 45 deg"));

    station.weather.set_data_valid(false);
    assert_eq!(handle.wind_tracking_status(), "Active (No weather data)");
}

#[test]
fn manual_command_ends_tracking() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    station.weather.set_tracking(true, 0.0, 15.0);
    station.now += Duration::from_secs(61);
    station.run(1);
    assert!(handle.is_wind_tracking_active());

    handle
        .set_setpoint_at(Axis::Azimuth, 10.0, station.now)
        .unwrap();
    assert!(!handle.is_wind_tracking_active());
    assert_eq!(handle.setpoint_az(), 10.0);
}
