//! Shared station harness.

mod calibration;
mod control_loop;
mod persistence;
mod safety_stop;
mod wind_stow;

use std::sync::Arc;
use std::time::{Duration, Instant};

use rotator_common::prelude::{Axis, MemoryStore};
use rotator_control_unit::config::RotatorConfig;
use rotator_control_unit::controller::{Hardware, Rotator};
use rotator_control_unit::sim::{DishParams, ScriptedWeather, SimDish};
use rotator_control_unit::store::{SharedStore, shared};

/// Control period used by every scenario.
pub const TICK: Duration = Duration::from_millis(100);

/// Control ticks per safety tick.
const SAFETY_EVERY: u32 = 5;

/// A simulated dish wired to a fully initialized controller.
pub struct Station {
    pub dish: SimDish,
    pub weather: Arc<ScriptedWeather>,
    pub store: SharedStore,
    pub rotator: Rotator,
    pub now: Instant,
    ticks: u32,
}

impl Station {
    pub fn new(params: DishParams) -> Self {
        Self::with_store(params, shared(MemoryStore::new()))
    }

    pub fn with_store(params: DishParams, store: SharedStore) -> Self {
        let dish = SimDish::new(params);
        let weather = Arc::new(ScriptedWeather::new());
        let now = Instant::now();
        let rotator = Rotator::initialize(
            &RotatorConfig::default(),
            Hardware::simulated(&dish),
            store.clone(),
            weather.clone(),
            now,
        );
        Self {
            dish,
            weather,
            store,
            rotator,
            now,
            ticks: 0,
        }
    }

    /// Run `n` control periods: tick the controller, then let the dish
    /// move for one period. The safety loop runs every fifth tick.
    pub fn run(&mut self, n: u32) {
        for _ in 0..n {
            self.now += TICK;
            self.rotator.control.tick(self.now);
            self.ticks += 1;
            if self.ticks % SAFETY_EVERY == 0 {
                self.rotator.safety.tick(self.now);
            }
            self.dish.advance(TICK);
        }
    }

    /// Run until both motors are stopped or `max` ticks elapse. Returns
    /// the number of ticks taken.
    pub fn run_until_idle(&mut self, max: u32) -> u32 {
        for n in 1..=max {
            self.run(1);
            if !self.dish.is_moving(Axis::Azimuth) && !self.dish.is_moving(Axis::Elevation) {
                return n;
            }
        }
        max
    }
}
