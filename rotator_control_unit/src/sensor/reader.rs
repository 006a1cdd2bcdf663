//! Magnetic angle sensor reader.
//!
//! Each reading confirms magnet presence through the status register, then
//! collects up to `2 × samples` raw angles and averages the valid ones.
//! Every failed exchange bumps the sensor's consecutive-error counter;
//! reaching [`MAX_CONSECUTIVE_ERRORS`] latches a bus fault. Any successful
//! exchange resets the counter.

use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use rotator_common::consts::{
    ANGLE_REGISTER, DEGREES_PER_COUNT, MAX_CONSECUTIVE_ERRORS, STATUS_MAGNET_DETECTED,
    STATUS_MAGNET_STRONG, STATUS_MAGNET_WEAK, STATUS_REGISTER,
};
use rotator_common::fault::FaultFlags;
use rotator_common::hal::{BusError, RegisterBus};
use rotator_common::state::{Axis, PerAxis};

use super::averaging::average_angles;
use crate::config::SensorConfig;

/// Upper bound on samples averaged per reading.
pub const MAX_SAMPLES: usize = 64;

/// Failed angle reading.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum SensorError {
    #[error("{axis} sensor bus failure: {source}")]
    Bus {
        axis: Axis,
        #[source]
        source: BusError,
    },

    #[error("{axis} sensor produced no valid samples in {attempts} attempts")]
    NoValidSamples { axis: Axis, attempts: usize },
}

/// Decoded status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MagnetStatus(pub u8);

impl MagnetStatus {
    pub const fn detected(self) -> bool {
        self.0 & STATUS_MAGNET_DETECTED != 0
    }

    pub const fn too_weak(self) -> bool {
        self.0 & STATUS_MAGNET_WEAK != 0
    }

    pub const fn too_strong(self) -> bool {
        self.0 & STATUS_MAGNET_STRONG != 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Channel {
    address: u8,
    consecutive_errors: u8,
}

/// Reads both angle sensors over a shared bus.
#[derive(Debug)]
pub struct AngleSensorReader {
    channels: PerAxis<Channel>,
    samples: usize,
    timeout: Duration,
    faults: FaultFlags,
}

impl AngleSensorReader {
    pub fn new(config: &SensorConfig) -> Self {
        Self {
            channels: PerAxis::new(
                Channel {
                    address: config.az_address,
                    consecutive_errors: 0,
                },
                Channel {
                    address: config.el_address,
                    consecutive_errors: 0,
                },
            ),
            samples: config.samples.max(1),
            timeout: Duration::from_micros(config.bus_timeout_us),
            faults: FaultFlags::empty(),
        }
    }

    /// Faults latched by this reader so far.
    pub fn faults(&self) -> FaultFlags {
        self.faults
    }

    pub fn consecutive_errors(&self, axis: Axis) -> u8 {
        self.channels[axis].consecutive_errors
    }

    /// Read the status register, retrying until the bus-error limit.
    pub fn magnet_status(
        &mut self,
        bus: &mut dyn RegisterBus,
        axis: Axis,
    ) -> Result<MagnetStatus, SensorError> {
        let address = self.channels[axis].address;
        let mut buf = [0u8; 1];
        loop {
            match bus.read_register(address, STATUS_REGISTER, &mut buf, self.timeout) {
                Ok(()) => {
                    self.record_success(axis);
                    return Ok(MagnetStatus(buf[0]));
                }
                Err(source) => {
                    self.record_failure(axis, &source);
                    if self.channels[axis].consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                        return Err(SensorError::Bus { axis, source });
                    }
                }
            }
        }
    }

    /// Log the magnet status once at startup and latch a fault if absent.
    pub fn report_magnet(&mut self, bus: &mut dyn RegisterBus, axis: Axis) {
        match self.magnet_status(bus, axis) {
            Ok(status) => {
                if status.detected() {
                    info!("{axis} magnet detected");
                } else {
                    error!("{axis} magnet not detected");
                    self.faults |= FaultFlags::magnet_missing(axis);
                }
                if status.too_weak() {
                    warn!("{axis} magnet too weak");
                }
                if status.too_strong() {
                    warn!("{axis} magnet too strong");
                }
            }
            Err(e) => error!("{axis} magnet status unavailable: {e}"),
        }
    }

    /// One raw angle exchange.
    pub fn read_raw_angle(
        &mut self,
        bus: &mut dyn RegisterBus,
        axis: Axis,
    ) -> Result<f32, BusError> {
        let address = self.channels[axis].address;
        let mut buf = [0u8; 2];
        match bus.read_register(address, ANGLE_REGISTER, &mut buf, self.timeout) {
            Ok(()) => {
                self.record_success(axis);
                Ok(u16::from_be_bytes(buf) as f32 * DEGREES_PER_COUNT)
            }
            Err(e) => {
                self.record_failure(axis, &e);
                Err(e)
            }
        }
    }

    /// Averaged angle in degrees, `[0, 360)`.
    ///
    /// A missing magnet latches a fault but the read still proceeds. With no
    /// valid sample the bad-angle fault latches and an error is returned.
    pub fn read_angle(&mut self, bus: &mut dyn RegisterBus, axis: Axis) -> Result<f32, SensorError> {
        if let Ok(status) = self.magnet_status(bus, axis) {
            if !status.detected() {
                let flag = FaultFlags::magnet_missing(axis);
                if !self.faults.contains(flag) {
                    error!("{axis} magnet went missing during routine read");
                }
                self.faults |= flag;
            }
        }

        let max_attempts = self.samples * 2;
        let mut samples: heapless::Vec<f32, MAX_SAMPLES> = heapless::Vec::new();
        let wanted = self.samples.min(MAX_SAMPLES);
        let mut failures = 0usize;
        let mut attempts = 0usize;

        while attempts < max_attempts && samples.len() < wanted {
            attempts += 1;
            match self.read_raw_angle(bus, axis) {
                Ok(angle) => {
                    // Capacity checked by `wanted`.
                    let _ = samples.push(angle);
                }
                Err(_) => {
                    failures += 1;
                    if failures > self.samples {
                        break;
                    }
                }
            }
        }

        match average_angles(&samples) {
            Some(mean) => {
                if failures > 0 {
                    debug!("{axis} angle averaged from {} samples, {failures} failed", samples.len());
                }
                Ok(mean)
            }
            None => {
                error!("{axis} sensor: no valid angle readings");
                self.faults |= FaultFlags::BAD_ANGLE;
                Err(SensorError::NoValidSamples { axis, attempts })
            }
        }
    }

    fn record_success(&mut self, axis: Axis) {
        self.channels[axis].consecutive_errors = 0;
    }

    fn record_failure(&mut self, axis: Axis, cause: &BusError) {
        let channel = &mut self.channels[axis];
        channel.consecutive_errors = channel.consecutive_errors.saturating_add(1);
        debug!(
            "{axis} sensor exchange failed ({} consecutive): {cause}",
            channel.consecutive_errors
        );
        if channel.consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
            let flag = FaultFlags::bus_error(axis);
            if !self.faults.contains(flag) {
                error!("{axis} sensor bus fault latched after {MAX_CONSECUTIVE_ERRORS} consecutive errors");
            }
            self.faults |= flag;
        }
    }
}
