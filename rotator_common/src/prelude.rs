//! Prelude module for common re-exports.
//!
//! ```rust
//! use rotator_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};

// ─── Axes & Faults ──────────────────────────────────────────────────
pub use crate::fault::FaultFlags;
pub use crate::state::{Axis, MotorDirection, PerAxis};

// ─── Settings & Persistence ─────────────────────────────────────────
pub use crate::settings::{ControlSettings, ParameterError, Setting};
pub use crate::store::{KeyValueStore, MemoryStore, StoreError, StoredValue};

// ─── Hardware ───────────────────────────────────────────────────────
pub use crate::hal::{BusError, MotorDriver, PowerMonitor, RegisterBus};

// ─── Wind ───────────────────────────────────────────────────────────
pub use crate::wind::{NoWindSafety, WeatherData, WindSafety, WindSafetyData};
