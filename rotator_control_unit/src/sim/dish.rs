//! Simulated dish.
//!
//! One shared model behind three hardware seams:
//!
//! - [`RegisterBus`]: two magnetic angle sensors answering the status and
//!   angle registers at their configured addresses.
//! - [`MotorDriver`]: inverted-PWM drive; a duty of 0 is full rate, 255 is
//!   stopped. `Forward` increases the raw angle.
//! - [`PowerMonitor`]: idle draw plus a share of motor power per axis.
//!
//! Motion only happens in [`SimDish::advance`], so tests control time.
//! Clones share the same model.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rotator_common::consts::{
    ANGLE_REGISTER, AZ_SENSOR_ADDRESS, DEGREES_PER_COUNT, EL_SENSOR_ADDRESS,
    STATUS_MAGNET_DETECTED, STATUS_REGISTER, STOP_DUTY,
};
use rotator_common::hal::{BusError, MotorDriver, PowerMonitor, RegisterBus};
use rotator_common::state::{Axis, MotorDirection, PerAxis};

use crate::sensor::averaging::wrap_degrees;
use crate::state::lock;

/// Physical parameters of the simulated dish.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DishParams {
    pub addresses: PerAxis<u8>,
    /// Raw sensor angles at power-on [deg].
    pub initial_raw: PerAxis<f32>,
    /// Rate at full duty [deg/s].
    pub full_rate_dps: PerAxis<f32>,
    pub idle_power_w: f32,
    /// Draw of one motor at full duty [W].
    pub motor_power_w: f32,
    pub supply_voltage_v: f32,
}

impl Default for DishParams {
    fn default() -> Self {
        Self {
            addresses: PerAxis::new(AZ_SENSOR_ADDRESS, EL_SENSOR_ADDRESS),
            initial_raw: PerAxis::new(10.0, 0.0),
            full_rate_dps: PerAxis::new(30.0, 10.0),
            idle_power_w: 0.5,
            motor_power_w: 3.0,
            supply_voltage_v: 12.0,
        }
    }
}

#[derive(Debug)]
struct Model {
    params: DishParams,
    raw: PerAxis<f64>,
    direction: PerAxis<MotorDirection>,
    duty: PerAxis<u8>,
    magnet_missing: PerAxis<bool>,
    bus_down: PerAxis<bool>,
    power_override: Option<f32>,
    voltage_override: Option<f32>,
}

impl Model {
    fn axis_at(&self, address: u8) -> Option<Axis> {
        Axis::ALL
            .into_iter()
            .find(|&axis| self.params.addresses[axis] == address)
    }

    fn drive_fraction(&self, axis: Axis) -> f64 {
        (STOP_DUTY - self.duty[axis]) as f64 / STOP_DUTY as f64
    }
}

#[derive(Debug, Clone)]
pub struct SimDish {
    model: Arc<Mutex<Model>>,
}

impl Default for SimDish {
    fn default() -> Self {
        Self::new(DishParams::default())
    }
}

impl SimDish {
    pub fn new(params: DishParams) -> Self {
        Self {
            model: Arc::new(Mutex::new(Model {
                params,
                raw: params.initial_raw.map(|_, v| v as f64),
                direction: PerAxis::default(),
                duty: PerAxis::splat(STOP_DUTY),
                magnet_missing: PerAxis::default(),
                bus_down: PerAxis::default(),
                power_override: None,
                voltage_override: None,
            })),
        }
    }

    /// Integrate motor commands over `dt`.
    pub fn advance(&self, dt: Duration) {
        let mut m = lock(&self.model);
        for axis in Axis::ALL {
            let rate = m.params.full_rate_dps[axis] as f64 * m.drive_fraction(axis);
            let sign = match m.direction[axis] {
                MotorDirection::Forward => 1.0,
                MotorDirection::Reverse => -1.0,
            };
            let next = m.raw[axis] + sign * rate * dt.as_secs_f64();
            m.raw[axis] = next.rem_euclid(360.0);
        }
    }

    /// Raw sensor angle [deg].
    pub fn raw_angle(&self, axis: Axis) -> f32 {
        lock(&self.model).raw[axis] as f32
    }

    pub fn set_raw_angle(&self, axis: Axis, degrees: f32) {
        lock(&self.model).raw[axis] = wrap_degrees(degrees) as f64;
    }

    pub fn duty(&self, axis: Axis) -> u8 {
        lock(&self.model).duty[axis]
    }

    pub fn direction(&self, axis: Axis) -> MotorDirection {
        lock(&self.model).direction[axis]
    }

    pub fn is_moving(&self, axis: Axis) -> bool {
        self.duty(axis) != STOP_DUTY
    }

    // ── Fault injection ──

    pub fn set_magnet_missing(&self, axis: Axis, missing: bool) {
        lock(&self.model).magnet_missing[axis] = missing;
    }

    /// Every exchange with this sensor fails while `down`.
    pub fn set_bus_down(&self, axis: Axis, down: bool) {
        lock(&self.model).bus_down[axis] = down;
    }

    pub fn set_power_override(&self, watts: Option<f32>) {
        lock(&self.model).power_override = watts;
    }

    pub fn set_voltage_override(&self, volts: Option<f32>) {
        lock(&self.model).voltage_override = volts;
    }
}

impl RegisterBus for SimDish {
    fn read_register(
        &mut self,
        address: u8,
        register: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<(), BusError> {
        let m = lock(&self.model);
        let axis = m
            .axis_at(address)
            .ok_or(BusError::Nack { address, code: 2 })?;
        if m.bus_down[axis] {
            return Err(BusError::Timeout {
                address,
                timeout_us: timeout.as_micros() as u64,
            });
        }

        let bytes: [u8; 2] = match register {
            STATUS_REGISTER => {
                let status = if m.magnet_missing[axis] {
                    0
                } else {
                    STATUS_MAGNET_DETECTED
                };
                [status, 0]
            }
            ANGLE_REGISTER => {
                let counts = (m.raw[axis] / DEGREES_PER_COUNT as f64).round() as u16 % 4096;
                counts.to_be_bytes()
            }
            _ => return Err(BusError::Nack { address, code: 3 }),
        };

        if buf.len() > bytes.len() {
            return Err(BusError::ShortRead {
                address,
                expected: buf.len(),
                received: bytes.len(),
            });
        }
        let n = buf.len();
        buf.copy_from_slice(&bytes[..n]);
        Ok(())
    }
}

impl MotorDriver for SimDish {
    fn set_direction(&mut self, axis: Axis, direction: MotorDirection) {
        lock(&self.model).direction[axis] = direction;
    }

    fn set_duty(&mut self, axis: Axis, duty: u8) {
        lock(&self.model).duty[axis] = duty;
    }
}

impl PowerMonitor for SimDish {
    fn power_w(&self) -> f32 {
        let m = lock(&self.model);
        m.power_override.unwrap_or_else(|| {
            let motors: f64 = Axis::ALL.into_iter().map(|a| m.drive_fraction(a)).sum();
            m.params.idle_power_w + m.params.motor_power_w * motors as f32
        })
    }

    fn load_voltage_v(&self) -> f32 {
        let m = lock(&self.model);
        m.voltage_override.unwrap_or(m.params.supply_voltage_v)
    }
}
