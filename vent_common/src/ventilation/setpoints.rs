//! Operator setpoints and the per-cycle parameters committed from them.

use serde::{Deserialize, Serialize};

use crate::consts::{
    Aperture, BLOWER_APERTURE_DEFAULT, CYCLES_PER_MINUTE_DEFAULT, MAX_PEAK_DEFAULT,
    MAX_PLATEAU_DEFAULT, MIN_PEEP_DEFAULT, NEUTRAL_PRESSURE, Pressure,
};

/// Values desired by the operator.
///
/// Written by the input path, read-copied once per cycle by the commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandedSetpoints {
    /// Breaths per minute.
    pub cycles_per_minute: u16,
    /// Minimal PEEP [cmH2O].
    pub min_peep: u16,
    /// Maximal plateau pressure [cmH2O].
    pub max_plateau_pressure: u16,
    /// Maximal peak pressure [cmH2O].
    pub max_peak_pressure: u16,
    /// Blower valve aperture during inspiration.
    pub aperture: Aperture,
}

impl Default for CommandedSetpoints {
    fn default() -> Self {
        Self {
            cycles_per_minute: CYCLES_PER_MINUTE_DEFAULT,
            min_peep: MIN_PEEP_DEFAULT,
            max_plateau_pressure: MAX_PLATEAU_DEFAULT,
            max_peak_pressure: MAX_PEAK_DEFAULT,
            aperture: BLOWER_APERTURE_DEFAULT,
        }
    }
}

/// Parameters in force for the current cycle.
///
/// Only ever built from a [`CommandedSetpoints`] snapshot at cycle start, so a
/// breath is never altered halfway through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ActiveParameters {
    pub cycles_per_minute: u16,
    pub min_peep: u16,
    pub max_plateau_pressure: u16,
    pub max_peak_pressure: u16,
    pub aperture: Aperture,
}

impl From<CommandedSetpoints> for ActiveParameters {
    fn from(c: CommandedSetpoints) -> Self {
        Self {
            cycles_per_minute: c.cycles_per_minute,
            min_peep: c.min_peep,
            max_plateau_pressure: c.max_plateau_pressure,
            max_peak_pressure: c.max_peak_pressure,
            aperture: c.aperture,
        }
    }
}

impl ActiveParameters {
    /// Peak limit in the measurement unit.
    #[inline]
    pub fn max_peak(&self) -> Pressure {
        to_pressure(self.max_peak_pressure)
    }

    /// Plateau limit in the measurement unit.
    #[inline]
    pub fn max_plateau(&self) -> Pressure {
        to_pressure(self.max_plateau_pressure)
    }

    /// PEEP floor in the measurement unit.
    #[inline]
    pub fn min_peep(&self) -> Pressure {
        to_pressure(self.min_peep)
    }
}

#[inline]
fn to_pressure(limit: u16) -> Pressure {
    Pressure::try_from(limit).unwrap_or(Pressure::MAX)
}

/// Pressures captured over one breath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReadings {
    /// Highest pressure seen during inhalation.
    pub peak: Pressure,
    /// Pressure at the end of the plateau.
    pub plateau: Pressure,
    /// Pressure at the end of exhalation.
    pub peep: Pressure,
}

impl CycleReadings {
    pub const NEUTRAL: Self = Self {
        peak: NEUTRAL_PRESSURE,
        plateau: NEUTRAL_PRESSURE,
        peep: NEUTRAL_PRESSURE,
    };
}

impl Default for CycleReadings {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_parameters_copy_every_field() {
        let commanded = CommandedSetpoints {
            cycles_per_minute: 12,
            min_peep: 8,
            max_plateau_pressure: 25,
            max_peak_pressure: 40,
            aperture: 55,
        };
        let active = ActiveParameters::from(commanded);
        assert_eq!(active.cycles_per_minute, 12);
        assert_eq!(active.min_peep(), 8);
        assert_eq!(active.max_plateau(), 25);
        assert_eq!(active.max_peak(), 40);
        assert_eq!(active.aperture, 55);
    }

    #[test]
    fn oversized_limit_saturates() {
        let active = ActiveParameters {
            max_peak_pressure: u16::MAX,
            ..Default::default()
        };
        assert_eq!(active.max_peak(), Pressure::MAX);
    }

    #[test]
    fn readings_default_to_neutral() {
        assert_eq!(CycleReadings::default(), CycleReadings::NEUTRAL);
        assert_eq!(CycleReadings::NEUTRAL.peak, NEUTRAL_PRESSURE);
    }
}
