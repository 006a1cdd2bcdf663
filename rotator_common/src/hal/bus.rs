//! Register bus shared by the angle sensors.

use std::time::Duration;
use thiserror::Error;

/// Failure of a single register exchange.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum BusError {
    #[error("device 0x{address:02X} did not acknowledge (code {code})")]
    Nack { address: u8, code: u8 },

    #[error("device 0x{address:02X} returned {received} of {expected} bytes")]
    ShortRead {
        address: u8,
        expected: usize,
        received: usize,
    },

    #[error("device 0x{address:02X} timed out after {timeout_us}µs")]
    Timeout { address: u8, timeout_us: u64 },
}

impl BusError {
    /// Address of the device involved.
    pub const fn address(&self) -> u8 {
        match *self {
            Self::Nack { address, .. }
            | Self::ShortRead { address, .. }
            | Self::Timeout { address, .. } => address,
        }
    }
}

/// Addressed register reads with a per-exchange deadline.
pub trait RegisterBus: Send {
    /// Fill `buf` from consecutive registers starting at `register`.
    ///
    /// Must return within `timeout`, with [`BusError::Timeout`] if the
    /// device does not answer in time.
    fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError>;
}

impl<B: RegisterBus + ?Sized> RegisterBus for Box<B> {
    fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        (**self).read_register(address, register, buf, timeout)
    }
}
