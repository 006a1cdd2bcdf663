//! Hardware seams.
//!
//! The control core never touches registers or pins directly. A platform
//! supplies one implementation of each trait; the simulation driver in the
//! control unit crate provides all three.

pub mod bus;
pub mod motor;
pub mod power;

pub use bus::{BusError, RegisterBus};
pub use motor::MotorDriver;
pub use power::PowerMonitor;
