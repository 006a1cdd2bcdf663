//! Angle acquisition: register-level sensor reads and circular averaging.

pub mod averaging;
pub mod reader;
