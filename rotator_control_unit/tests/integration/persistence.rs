//! Integration test: settings and wind count survive a restart.

use rotator_common::prelude::{Axis, PerAxis};
use rotator_control_unit::sim::DishParams;
use rotator_control_unit::store::{JsonFileStore, shared};

use super::Station;

// ── Tests ───────────────────────────────────────────────────────────

#[test]
fn restart_restores_wind_count_and_tunables() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let params = DishParams {
        initial_raw: PerAxis::new(180.0, 0.0),
        ..DishParams::default()
    };
    let mut station = Station::with_store(params, shared(JsonFileStore::open(&path).unwrap()));
    let handle = station.rotator.handle.clone();
    assert!((handle.corrected_angle_az() - 170.0).abs() < 0.1);
    assert_eq!(handle.wind_count(), 0);

    handle.set_gain(Axis::Azimuth, 8).unwrap();
    handle.set_tolerance(Axis::Elevation, 0.5).unwrap();
    handle.set_setpoint_az(195.0).unwrap();
    station.run_until_idle(200);
    assert_eq!(handle.wind_count(), 1);
    let raw_az = station.dish.raw_angle(Axis::Azimuth);
    drop(station);

    // Power cycle: a fresh process reads the same file.
    let restarted = Station::with_store(
        DishParams {
            initial_raw: PerAxis::new(raw_az, 0.0),
            ..DishParams::default()
        },
        shared(JsonFileStore::open(&path).unwrap()),
    );
    let handle = restarted.rotator.handle.clone();
    assert_eq!(handle.wind_count(), 1);
    assert_eq!(handle.gain(Axis::Azimuth), 8);
    assert_eq!(handle.tolerance(Axis::Elevation), 0.5);
    assert!((handle.corrected_angle_az() - (raw_az - 10.0)).abs() < 0.1);
}

#[test]
fn rejected_setting_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    let station = Station::with_store(
        DishParams::default(),
        shared(JsonFileStore::open(&path).unwrap()),
    );
    assert!(station.rotator.handle.set_max_power_w(40).is_err());
    drop(station);

    let restarted = Station::with_store(
        DishParams::default(),
        shared(JsonFileStore::open(&path).unwrap()),
    );
    assert_eq!(restarted.rotator.handle.max_power_w(), 10);
}
