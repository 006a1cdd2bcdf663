//! # Rotator Control Unit
//!
//! Closed-loop control core of a two-axis azimuth/elevation positioner.
//!
//! ## Tasks
//!
//! - **Control loop** ([`controller::ControlLoop`]): reads both angle
//!   sensors, tracks azimuth cable wrap, computes errors, feeds the
//!   convergence monitor, applies wind overrides and drives both motors.
//! - **Safety loop** ([`safety::supervisor::SafetyLoop`]): aggregates latched
//!   faults with supply readings and forces a latching hard stop.
//! - **Handle** ([`handle::ControllerHandle`]): thread-safe entry points for
//!   setpoints, calibration, tunables and status.
//!
//! All three share one [`state::ControllerState`] behind an `Arc`.

pub mod angle;
pub mod calibration;
pub mod config;
pub mod control;
pub mod controller;
pub mod convergence;
pub mod cycle;
pub mod handle;
pub mod safety;
pub mod sensor;
pub mod sim;
pub mod state;
pub mod store;
pub mod tunables;
pub mod wind;
