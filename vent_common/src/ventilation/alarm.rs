//! Safeguard status flags.
//!
//! Reported outward so an alarm collaborator can tell which corrective action
//! currently overrides the nominal valve commands.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Engaged safeguards.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct SafeguardFlags: u8 {
        /// Peak pressure above limit during inhalation, venting.
        const PEAK_OVERPRESSURE    = 0x01;
        /// Plateau pressure above limit, bleeding.
        const PLATEAU_OVERPRESSURE = 0x02;
        /// PEEP lost, patient valve frozen.
        const PEEP_HOLD            = 0x04;
        /// PEEP still lost, blower injecting make-up flow.
        const PEEP_MAINTAIN        = 0x08;
    }
}

impl SafeguardFlags {
    /// Over-pressure conditions.
    pub const OVERPRESSURE_MASK: Self = Self::from_bits_truncate(
        Self::PEAK_OVERPRESSURE.bits() | Self::PLATEAU_OVERPRESSURE.bits(),
    );

    /// PEEP-loss conditions.
    pub const PEEP_LOSS_MASK: Self =
        Self::from_bits_truncate(Self::PEEP_HOLD.bits() | Self::PEEP_MAINTAIN.bits());

    #[inline]
    pub const fn has_overpressure(&self) -> bool {
        self.intersects(Self::OVERPRESSURE_MASK)
    }

    #[inline]
    pub const fn has_peep_loss(&self) -> bool {
        self.intersects(Self::PEEP_LOSS_MASK)
    }
}

impl Default for SafeguardFlags {
    fn default() -> Self {
        Self::empty()
    }
}
