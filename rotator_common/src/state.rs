//! Axis identifiers, motor direction and the per-axis pair container.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// One of the two rotator axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Axis {
    Azimuth = 0,
    Elevation = 1,
}

impl Axis {
    /// Both axes, azimuth first.
    pub const ALL: [Axis; 2] = [Axis::Azimuth, Axis::Elevation];

    /// Convert from raw `u8`. Returns `None` for unknown values.
    pub const fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Azimuth),
            1 => Some(Self::Elevation),
            _ => None,
        }
    }

    /// Short label used in log lines and external commands.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Azimuth => "AZ",
            Self::Elevation => "EL",
        }
    }

    /// The other axis.
    pub const fn other(self) -> Self {
        match self {
            Self::Azimuth => Self::Elevation,
            Self::Elevation => Self::Azimuth,
        }
    }

    /// Parse an external axis label (`"AZ"` / `"EL"`, case-insensitive).
    pub fn parse(label: &str) -> Option<Self> {
        if label.eq_ignore_ascii_case("az") {
            Some(Self::Azimuth)
        } else if label.eq_ignore_ascii_case("el") {
            Some(Self::Elevation)
        } else {
            None
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Direction output for one motor.
///
/// `Forward` is driven for a non-negative scaled error (direction line low),
/// `Reverse` for a negative one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum MotorDirection {
    #[default]
    Forward = 0,
    Reverse = 1,
}

impl MotorDirection {
    /// Direction that reduces a signed error.
    #[inline]
    pub fn from_error(scaled_error: f64) -> Self {
        if scaled_error >= 0.0 {
            Self::Forward
        } else {
            Self::Reverse
        }
    }

    /// Opposite direction.
    #[inline]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    /// Logic level of the direction line.
    #[inline]
    pub const fn is_high(self) -> bool {
        matches!(self, Self::Reverse)
    }
}

/// A value per axis, indexable by [`Axis`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerAxis<T> {
    pub az: T,
    pub el: T,
}

impl<T> PerAxis<T> {
    pub const fn new(az: T, el: T) -> Self {
        Self { az, el }
    }

    /// Build both entries from a function of the axis.
    pub fn from_fn(mut f: impl FnMut(Axis) -> T) -> Self {
        Self {
            az: f(Axis::Azimuth),
            el: f(Axis::Elevation),
        }
    }

    pub fn map<U>(self, mut f: impl FnMut(Axis, T) -> U) -> PerAxis<U> {
        PerAxis {
            az: f(Axis::Azimuth, self.az),
            el: f(Axis::Elevation, self.el),
        }
    }

    /// `(axis, &value)` pairs, azimuth first.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        [(Axis::Azimuth, &self.az), (Axis::Elevation, &self.el)].into_iter()
    }
}

impl<T: Clone> PerAxis<T> {
    pub fn splat(value: T) -> Self {
        Self {
            az: value.clone(),
            el: value,
        }
    }
}

impl<T> Index<Axis> for PerAxis<T> {
    type Output = T;

    #[inline]
    fn index(&self, axis: Axis) -> &T {
        match axis {
            Axis::Azimuth => &self.az,
            Axis::Elevation => &self.el,
        }
    }
}

impl<T> IndexMut<Axis> for PerAxis<T> {
    #[inline]
    fn index_mut(&mut self, axis: Axis) -> &mut T {
        match axis {
            Axis::Azimuth => &mut self.az,
            Axis::Elevation => &mut self.el,
        }
    }
}
