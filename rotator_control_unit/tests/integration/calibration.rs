//! Integration test: calibration mode, timed moves and elevation tare.

use rotator_common::consts::KEY_EL_START_ANGLE;
use rotator_common::prelude::{Axis, KeyValueStore, MotorDirection};
use rotator_control_unit::calibration::CalibrationPhase;
use rotator_control_unit::handle::CommandError;
use rotator_control_unit::sim::DishParams;

use super::Station;

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn timed_move_runs_for_requested_time() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.activate_cal_mode(true);
    handle.cal_move_motor(1_000, Axis::Azimuth).unwrap();

    station.run(1);
    assert!(station.rotator.control.calibration().is_moving());
    assert_eq!(station.dish.direction(Axis::Azimuth), MotorDirection::Forward);
    assert!(!station.dish.is_moving(Axis::Elevation));

    station.run(15);
    assert_eq!(station.rotator.control.calibration().phase(), CalibrationPhase::Idle);
    assert!(!station.dish.is_moving(Axis::Azimuth));
    let travelled = station.dish.raw_angle(Axis::Azimuth) - 10.0;
    assert!(
        (25.0..40.0).contains(&travelled),
        "travelled {travelled} deg"
    );
}

#[test]
fn negative_run_time_reverses() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.activate_cal_mode(true);
    handle.cal_move_motor(-500, Axis::Elevation).unwrap();
    station.run(1);
    assert_eq!(station.dish.direction(Axis::Elevation), MotorDirection::Reverse);
    assert!(station.dish.is_moving(Axis::Elevation));
}

#[test]
fn leaving_calibration_cancels_move() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.activate_cal_mode(true);
    handle.cal_move_motor(5_000, Axis::Azimuth).unwrap();
    station.run(3);
    assert!(station.dish.is_moving(Axis::Azimuth));

    handle.activate_cal_mode(false);
    assert!(!station.dish.is_moving(Axis::Azimuth));
    station.run(1);
    assert!(!station.rotator.control.calibration().is_moving());
    assert_eq!(
        handle.cal_move_motor(500, Axis::Azimuth),
        Err(CommandError::CalibrationInactive)
    );
}

#[test]
fn elevation_tare_rezeroes_and_persists() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.activate_cal_mode(true);
    station.dish.set_raw_angle(Axis::Elevation, 12.0);
    station.run(1);
    assert!((handle.corrected_angle_el() - 12.0).abs() < 0.1);

    handle.calibrate_elevation().unwrap();
    station.run(2);

    assert!((handle.el_start_angle() - 12.0).abs() < 0.1);
    let el = handle.corrected_angle_el();
    assert!(el < 0.1 || el > 359.9, "corrected elevation {el}");
    let stored = station
        .store
        .lock()
        .unwrap()
        .get_f32_or(KEY_EL_START_ANGLE, 0.0);
    assert!((stored - 12.0).abs() < 0.1);
}

#[test]
fn setpoints_do_not_drive_in_calibration() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.activate_cal_mode(true);
    handle.set_setpoint_az(90.0).unwrap();
    station.run(10);
    assert!(!station.dish.is_moving(Axis::Azimuth));
    assert!(handle.corrected_angle_az() < 0.5);
}
