//! Motor control: per-axis latch, single-motor priority and actuation.

pub mod actuator;
pub mod latch;
pub mod priority;
