//! Simulation hardware.
//!
//! A software dish that answers sensor register reads, integrates motor
//! commands into motion and reports supply power, plus a scriptable wind
//! provider. Used by the binary's simulation backend and by the tests.

pub mod dish;
pub mod weather;

pub use dish::{DishParams, SimDish};
pub use weather::ScriptedWeather;
