//! Angle frame correction, azimuth wrap tracking and error computation.

pub mod error;
pub mod tracker;
