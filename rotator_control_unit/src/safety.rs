//! Safety module root.
//!
//! Limit evaluation, hard stop with rate-limited reporting, wrap
//! oscillation detection and the periodic safety loop.

pub mod flags;
pub mod oscillation;
pub mod stop;
pub mod supervisor;
