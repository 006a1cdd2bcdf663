//! Latched fault bitflags.
//!
//! Every flag latches: it is raised by the control or safety loop and stays
//! set until one of the documented recovery paths clears it. Any set flag
//! that applies in the current mode raises the global fault.

use bitflags::bitflags;

use crate::state::Axis;

bitflags! {
    /// Latched rotator faults.
    ///
    /// Power flags ([`FaultFlags::POWER_MASK`]) are bypassed and cleared
    /// while an emergency wind stow is active. Position flags
    /// ([`FaultFlags::CALIBRATION_SUPPRESSED`]) are not evaluated in
    /// calibration mode.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FaultFlags: u16 {
        /// No valid angle sample could be collected.
        const BAD_ANGLE          = 0x0001;
        /// Azimuth sensor reports no magnet.
        const MAGNET_MISSING_AZ  = 0x0002;
        /// Elevation sensor reports no magnet.
        const MAGNET_MISSING_EL  = 0x0004;
        /// Azimuth sensor bus failed repeatedly.
        const BUS_ERROR_AZ       = 0x0008;
        /// Elevation sensor bus failed repeatedly.
        const BUS_ERROR_EL       = 0x0010;
        /// Elevation inside the forbidden window.
        const OUT_OF_BOUNDS      = 0x0020;
        /// Azimuth wound more than one turn past the seam.
        const OVER_SPIN          = 0x0040;
        /// Measured power above the limit.
        const OVER_POWER         = 0x0080;
        /// Load voltage below the limit.
        const LOW_VOLTAGE        = 0x0100;
        /// Positioning error grows instead of shrinking.
        const ERROR_DIVERGENCE   = 0x0200;
    }
}

impl FaultFlags {
    /// Flags bypassed during an emergency wind stow.
    pub const POWER_MASK: Self =
        Self::from_bits_truncate(Self::OVER_POWER.bits() | Self::LOW_VOLTAGE.bits());

    /// Flags not evaluated while calibration mode is active.
    pub const CALIBRATION_SUPPRESSED: Self = Self::from_bits_truncate(
        Self::OUT_OF_BOUNDS.bits() | Self::OVER_SPIN.bits() | Self::ERROR_DIVERGENCE.bits(),
    );

    /// Flags not evaluated while an emergency wind stow is active.
    pub const STOW_SUPPRESSED: Self = Self::from_bits_truncate(
        Self::POWER_MASK.bits() | Self::ERROR_DIVERGENCE.bits(),
    );

    /// Magnet flag for `axis`.
    #[inline]
    pub const fn magnet_missing(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::MAGNET_MISSING_AZ,
            Axis::Elevation => Self::MAGNET_MISSING_EL,
        }
    }

    /// Bus flag for `axis`.
    #[inline]
    pub const fn bus_error(axis: Axis) -> Self {
        match axis {
            Axis::Azimuth => Self::BUS_ERROR_AZ,
            Axis::Elevation => Self::BUS_ERROR_EL,
        }
    }

    /// Flags that count toward the global fault given the current mode.
    #[inline]
    pub fn considered(self, calibrating: bool, stowing: bool) -> Self {
        let mut flags = self;
        if calibrating {
            flags.remove(Self::CALIBRATION_SUPPRESSED);
        }
        if stowing {
            flags.remove(Self::STOW_SUPPRESSED);
        }
        flags
    }

    /// Operator-facing text for a single flag.
    pub fn describe(self) -> &'static str {
        const TEXT: [(FaultFlags, &str); 10] = [
            (FaultFlags::BAD_ANGLE, "bad angle reading"),
            (FaultFlags::MAGNET_MISSING_AZ, "azimuth magnet not detected"),
            (FaultFlags::MAGNET_MISSING_EL, "elevation magnet not detected"),
            (FaultFlags::BUS_ERROR_AZ, "azimuth sensor bus failure"),
            (FaultFlags::BUS_ERROR_EL, "elevation sensor bus failure"),
            (FaultFlags::OUT_OF_BOUNDS, "elevation out of bounds"),
            (FaultFlags::OVER_SPIN, "azimuth over-spin"),
            (FaultFlags::OVER_POWER, "over power"),
            (FaultFlags::LOW_VOLTAGE, "low voltage"),
            (FaultFlags::ERROR_DIVERGENCE, "positioning error diverging"),
        ];
        TEXT.iter()
            .find(|(flag, _)| *flag == self)
            .map_or("multiple faults", |(_, text)| *text)
    }
}

impl Default for FaultFlags {
    fn default() -> Self {
        Self::empty()
    }
}
