//! Respiratory cycle phase enums.
//!
//! `repr(u8)` so telemetry collaborators can carry them as a single byte.

use serde::{Deserialize, Serialize};

/// Coarse phase of the respiratory cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum CyclePhase {
    /// Air is pushed into the patient (first third of the cycle).
    #[default]
    Inhalation = 0,
    /// Passive deflation (remaining two thirds).
    Exhalation = 1,
}

impl CyclePhase {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inhalation),
            1 => Some(Self::Exhalation),
            _ => None,
        }
    }
}

/// Fine sub-phase. Each variant belongs to exactly one [`CyclePhase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[repr(u8)]
pub enum CycleSubPhase {
    /// Blower open, pressure rising.
    #[default]
    Inspiration = 0,
    /// Both valves closed, pressure held.
    Plateau = 1,
    /// Patient valve open, pressure falling.
    Exhalation = 2,
    /// Trailing window before the next cycle; PEEP is assessed here.
    HoldExhalation = 3,
}

impl CycleSubPhase {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Inspiration),
            1 => Some(Self::Plateau),
            2 => Some(Self::Exhalation),
            3 => Some(Self::HoldExhalation),
            _ => None,
        }
    }

    /// Coarse phase this sub-phase belongs to.
    #[inline]
    pub const fn phase(&self) -> CyclePhase {
        match self {
            Self::Inspiration | Self::Plateau => CyclePhase::Inhalation,
            Self::Exhalation | Self::HoldExhalation => CyclePhase::Exhalation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_phase_belongs_to_one_phase() {
        assert_eq!(CycleSubPhase::Inspiration.phase(), CyclePhase::Inhalation);
        assert_eq!(CycleSubPhase::Plateau.phase(), CyclePhase::Inhalation);
        assert_eq!(CycleSubPhase::Exhalation.phase(), CyclePhase::Exhalation);
        assert_eq!(CycleSubPhase::HoldExhalation.phase(), CyclePhase::Exhalation);
    }

    #[test]
    fn from_u8_matches_discriminants() {
        for sub in [
            CycleSubPhase::Inspiration,
            CycleSubPhase::Plateau,
            CycleSubPhase::Exhalation,
            CycleSubPhase::HoldExhalation,
        ] {
            assert_eq!(CycleSubPhase::from_u8(sub as u8), Some(sub));
        }
        assert_eq!(CycleSubPhase::from_u8(4), None);
        assert_eq!(CyclePhase::from_u8(1), Some(CyclePhase::Exhalation));
        assert_eq!(CyclePhase::from_u8(2), None);
    }

    #[test]
    fn defaults_start_a_breath() {
        assert_eq!(CyclePhase::default(), CyclePhase::Inhalation);
        assert_eq!(CycleSubPhase::default(), CycleSubPhase::Inspiration);
    }
}
