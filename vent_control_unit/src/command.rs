//! Nominal valve commands per sub-phase.
//!
//! | Sub-phase        | Blower            | Patient    |
//! |------------------|-------------------|------------|
//! | INSPIRATION      | active aperture   | closed     |
//! | PLATEAU          | closed            | closed     |
//! | EXHALATION       | closed            | fully open |
//! | HOLD_EXHALATION  | closed            | fully open |
//!
//! The safeguard engine may replace these before they reach the valves.

use serde::Serialize;
use vent_common::consts::Aperture;
use vent_common::ventilation::config::ValveConfig;
use vent_common::ventilation::phase::CycleSubPhase;
use vent_common::ventilation::setpoints::ActiveParameters;

/// Target apertures for both valves for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValveCommand {
    /// Blower-side valve (flow into the patient circuit).
    pub blower: Aperture,
    /// Patient-side valve (exhalation to atmosphere).
    pub patient: Aperture,
}

impl ValveCommand {
    /// Both valves closed.
    pub const fn closed(valves: &ValveConfig) -> Self {
        Self {
            blower: valves.closed,
            patient: valves.closed,
        }
    }
}

/// Nominal command for `sub_phase` under the current cycle parameters.
#[inline]
pub fn nominal_command(
    sub_phase: CycleSubPhase,
    params: &ActiveParameters,
    valves: &ValveConfig,
) -> ValveCommand {
    match sub_phase {
        CycleSubPhase::Inspiration => ValveCommand {
            blower: params.aperture.max(valves.closed).min(valves.fully_open),
            patient: valves.closed,
        },
        CycleSubPhase::Plateau => ValveCommand::closed(valves),
        CycleSubPhase::Exhalation | CycleSubPhase::HoldExhalation => ValveCommand {
            blower: valves.closed,
            patient: valves.fully_open,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ActiveParameters {
        ActiveParameters {
            cycles_per_minute: 20,
            min_peep: 5,
            max_plateau_pressure: 30,
            max_peak_pressure: 60,
            aperture: 45,
        }
    }

    #[test]
    fn inspiration_opens_blower_only() {
        let v = ValveConfig::default();
        let cmd = nominal_command(CycleSubPhase::Inspiration, &params(), &v);
        assert_eq!(cmd.blower, 45);
        assert_eq!(cmd.patient, v.closed);
    }

    #[test]
    fn plateau_closes_both() {
        let v = ValveConfig::default();
        let cmd = nominal_command(CycleSubPhase::Plateau, &params(), &v);
        assert_eq!(cmd, ValveCommand::closed(&v));
    }

    #[test]
    fn exhalation_and_hold_open_patient_only() {
        let v = ValveConfig::default();
        for sub in [CycleSubPhase::Exhalation, CycleSubPhase::HoldExhalation] {
            let cmd = nominal_command(sub, &params(), &v);
            assert_eq!(cmd.blower, v.closed);
            assert_eq!(cmd.patient, v.fully_open);
        }
    }

    #[test]
    fn blower_aperture_limited_to_valve_travel() {
        let v = ValveConfig::default();
        let p = ActiveParameters {
            aperture: v.fully_open + 50,
            ..params()
        };
        let cmd = nominal_command(CycleSubPhase::Inspiration, &p, &v);
        assert_eq!(cmd.blower, v.fully_open);
    }

    #[test]
    fn inverted_valve_travel_does_not_panic() {
        let v = ValveConfig {
            closed: 80,
            fully_open: 20,
            ..ValveConfig::default()
        };
        let cmd = nominal_command(CycleSubPhase::Inspiration, &params(), &v);
        assert_eq!(cmd.blower, 20);
    }
}
