//! Supply monitoring.

/// Reads the motor supply.
pub trait PowerMonitor: Send + Sync {
    /// Instantaneous power draw [W].
    fn power_w(&self) -> f32;

    /// Voltage at the load [V].
    fn load_voltage_v(&self) -> f32;
}
