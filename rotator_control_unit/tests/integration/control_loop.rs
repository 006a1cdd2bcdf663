//! Integration test: closed-loop positioning against the simulated dish.

use rotator_common::prelude::{Axis, FaultFlags, PerAxis};
use rotator_control_unit::sim::DishParams;

use super::Station;

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn azimuth_converges_and_latches() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    assert!(handle.corrected_angle_az().abs() < 0.1);

    handle.set_setpoint_az(45.0).unwrap();
    let ticks = station.run_until_idle(200);
    assert!(ticks < 200, "azimuth never settled");

    assert!(
        (handle.corrected_angle_az() - 45.0).abs() < 3.5,
        "settled at {}",
        handle.corrected_angle_az()
    );
    assert!(handle.motor_latched(Axis::Azimuth));
    assert!(handle.faults().is_empty());
    assert!(!handle.global_fault());

    // Latched: the dish stays put over further ticks.
    let parked = station.dish.raw_angle(Axis::Azimuth);
    station.run(20);
    assert_eq!(station.dish.raw_angle(Axis::Azimuth), parked);
}

#[test]
fn elevation_converges_with_tight_tolerance() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();

    handle.set_setpoint_el(30.0).unwrap();
    station.run_until_idle(200);
    assert!((handle.corrected_angle_el() - 30.0).abs() < 1.5);
    assert!(handle.faults().is_empty());
}

#[test]
fn setpoint_reversal_moves_back() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();

    handle.set_setpoint_az(60.0).unwrap();
    station.run(10);
    let midway = handle.corrected_angle_az();
    assert!(midway > 1.0 && midway < 60.0);

    handle.set_setpoint_az(5.0).unwrap();
    station.run_until_idle(200);
    assert!((handle.corrected_angle_az() - 5.0).abs() < 3.5);
}

#[test]
fn single_motor_mode_runs_one_axis_at_a_time() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.set_single_motor_mode(true);

    handle.set_setpoint_az(40.0).unwrap();
    handle.set_setpoint_el(20.0).unwrap();
    let mut moved = PerAxis::splat(false);
    for _ in 0..600 {
        station.run(1);
        let az = station.dish.is_moving(Axis::Azimuth);
        let el = station.dish.is_moving(Axis::Elevation);
        assert!(!(az && el), "both motors running in single-motor mode");
        moved.az |= az;
        moved.el |= el;
    }
    assert!(moved.az && moved.el, "an axis never ran: {moved:?}");

    // Elevation may park just outside its tight tolerance; azimuth still
    // gets its turn.
    assert!(
        (handle.corrected_angle_az() - 40.0).abs() < 3.5,
        "azimuth at {}",
        handle.corrected_angle_az()
    );
    assert!(
        (handle.corrected_angle_el() - 20.0).abs() < 1.5,
        "elevation at {}",
        handle.corrected_angle_el()
    );
    assert!(handle.motor_latched(Axis::Azimuth));
    assert!(handle.motor_latched(Axis::Elevation));
    assert!(handle.faults().is_empty());
}

#[test]
fn sensor_bus_loss_stops_the_dish() {
    let mut station = Station::new(DishParams::default());
    let handle = station.rotator.handle.clone();
    handle.set_setpoint_az(90.0).unwrap();
    station.run(5);
    assert!(station.dish.is_moving(Axis::Azimuth));

    station.dish.set_bus_down(Axis::Azimuth, true);
    station.run(10);

    let faults = handle.faults();
    assert!(faults.contains(FaultFlags::BAD_ANGLE));
    assert!(faults.contains(FaultFlags::BUS_ERROR_AZ));
    assert!(handle.global_fault());
    assert!(handle.hard_stop_engaged());
    assert!(!station.dish.is_moving(Axis::Azimuth));
}
