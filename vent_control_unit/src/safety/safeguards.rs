//! Debounced pressure safeguards.
//!
//! Evaluated every tick after the nominal command, always in this order:
//!
//! | # | Safeguard     | Window      | Violation                      | Override                                   |
//! |---|---------------|-------------|--------------------------------|--------------------------------------------|
//! | 1 | Peak          | INHALATION  | `p > max_peak`                 | patient fully open, blower closed          |
//! | 2 | Plateau       | PLATEAU     | `p > max_plateau`              | blower closed, patient at least bleed      |
//! | 3 | PEEP hold     | EXHALATION  | `p < min_peep`                 | patient frozen at its aperture on engage   |
//! | 4 | PEEP maintain | EXHALATION  | `p < min_peep` and #3 engaged  | blower at least make-up aperture           |
//!
//! Outside its window a safeguard is neither updated nor applied, but its
//! debounce state survives until the next cycle start.

use tracing::{info, warn};
use vent_common::consts::{Aperture, Pressure};
use vent_common::ventilation::alarm::SafeguardFlags;
use vent_common::ventilation::config::{SafeguardsConfig, ValveConfig};
use vent_common::ventilation::phase::{CyclePhase, CycleSubPhase};
use vent_common::ventilation::setpoints::ActiveParameters;

use super::debounce::{DebounceTimer, Tick, Transition};
use crate::command::ValveCommand;

/// Everything the safeguards look at for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInputs<'a> {
    pub now: Tick,
    pub pressure: Pressure,
    pub sub_phase: CycleSubPhase,
    pub params: &'a ActiveParameters,
    /// Aperture the patient valve has actually reached.
    pub patient_aperture: Aperture,
}

/// The four safeguards and their shared valve limits.
#[derive(Debug, Clone)]
pub struct SafeguardEngine {
    valves: ValveConfig,
    peak: DebounceTimer,
    plateau: DebounceTimer,
    peep_hold: DebounceTimer,
    peep_maintain: DebounceTimer,
    /// Patient aperture captured when the PEEP hold engaged.
    frozen_patient: Option<Aperture>,
}

impl SafeguardEngine {
    pub fn new(config: &SafeguardsConfig, valves: ValveConfig) -> Self {
        Self {
            valves,
            peak: DebounceTimer::new(&config.peak),
            plateau: DebounceTimer::new(&config.plateau),
            peep_hold: DebounceTimer::new(&config.peep_hold),
            peep_maintain: DebounceTimer::new(&config.peep_maintain),
            frozen_patient: None,
        }
    }

    /// Clear all detectors. Called at every cycle start.
    pub fn reset(&mut self) {
        self.peak.reset();
        self.plateau.reset();
        self.peep_hold.reset();
        self.peep_maintain.reset();
        self.frozen_patient = None;
    }

    /// Run the safeguards over `nominal` and return the command to apply.
    pub fn apply(&mut self, nominal: ValveCommand, inputs: &TickInputs<'_>) -> ValveCommand {
        let mut cmd = nominal;
        let p = inputs.pressure;
        let phase = inputs.sub_phase.phase();

        // ── 1. Peak ──
        if phase == CyclePhase::Inhalation {
            let limit = inputs.params.max_peak();
            let edge = self.peak.update(p > limit, inputs.now);
            log_edge(edge, "peak", p, limit);
            if self.peak.is_engaged() {
                cmd.patient = self.valves.fully_open;
                cmd.blower = self.valves.closed;
            }
        }

        // ── 2. Plateau ──
        if inputs.sub_phase == CycleSubPhase::Plateau {
            let limit = inputs.params.max_plateau();
            let edge = self.plateau.update(p > limit, inputs.now);
            log_edge(edge, "plateau", p, limit);
            if self.plateau.is_engaged() {
                cmd.blower = self.valves.closed;
                cmd.patient = cmd.patient.max(self.valves.plateau_bleed);
            }
        }

        if phase == CyclePhase::Exhalation {
            let floor = inputs.params.min_peep();
            let below = p < floor;

            // ── 3. PEEP hold ──
            match self.peep_hold.update(below, inputs.now) {
                Transition::Engaged => {
                    self.frozen_patient = Some(inputs.patient_aperture);
                    warn!(
                        pressure = p,
                        min_peep = floor,
                        patient = inputs.patient_aperture,
                        "PEEP hold engaged, patient valve frozen"
                    );
                }
                Transition::Released => {
                    self.frozen_patient = None;
                    info!(pressure = p, min_peep = floor, "PEEP hold released");
                }
                Transition::None => {}
            }
            if let Some(frozen) = self.frozen_patient {
                cmd.patient = frozen;
            }

            // ── 4. PEEP maintain ──
            let edge = self
                .peep_maintain
                .update(below && self.peep_hold.is_engaged(), inputs.now);
            log_edge(edge, "PEEP maintain", p, floor);
            if self.peep_maintain.is_engaged() {
                cmd.blower = cmd.blower.max(self.valves.peep_makeup);
            }
        }

        cmd
    }

    /// Currently engaged safeguards.
    pub fn flags(&self) -> SafeguardFlags {
        let mut flags = SafeguardFlags::empty();
        flags.set(SafeguardFlags::PEAK_OVERPRESSURE, self.peak.is_engaged());
        flags.set(SafeguardFlags::PLATEAU_OVERPRESSURE, self.plateau.is_engaged());
        flags.set(SafeguardFlags::PEEP_HOLD, self.peep_hold.is_engaged());
        flags.set(SafeguardFlags::PEEP_MAINTAIN, self.peep_maintain.is_engaged());
        flags
    }

    #[inline]
    pub const fn frozen_patient(&self) -> Option<Aperture> {
        self.frozen_patient
    }
}

fn log_edge(edge: Transition, name: &str, pressure: Pressure, limit: Pressure) {
    match edge {
        Transition::Engaged => warn!(pressure, limit, "{name} safeguard engaged"),
        Transition::Released => info!(pressure, limit, "{name} safeguard released"),
        Transition::None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vent_common::ventilation::config::DebounceConfig;

    const NOMINAL_INSPIRATION: ValveCommand = ValveCommand {
        blower: 60,
        patient: 0,
    };
    const NOMINAL_EXHALATION: ValveCommand = ValveCommand {
        blower: 0,
        patient: 100,
    };

    fn params() -> ActiveParameters {
        ActiveParameters {
            cycles_per_minute: 20,
            min_peep: 5,
            max_plateau_pressure: 25,
            max_peak_pressure: 30,
            aperture: 60,
        }
    }

    fn engine(debounce: u16, clear: u16) -> SafeguardEngine {
        let d = DebounceConfig::new(debounce, clear);
        let config = SafeguardsConfig {
            peak: d,
            plateau: d,
            peep_hold: d,
            peep_maintain: d,
        };
        SafeguardEngine::new(&config, ValveConfig::default())
    }

    fn inputs(
        now: Tick,
        pressure: Pressure,
        sub_phase: CycleSubPhase,
        params: &ActiveParameters,
    ) -> TickInputs<'_> {
        TickInputs {
            now,
            pressure,
            sub_phase,
            params,
            patient_aperture: 40,
        }
    }

    #[test]
    fn nominal_passes_through_within_bounds() {
        let mut e = engine(1, 1);
        let p = params();
        let cmd = e.apply(
            NOMINAL_INSPIRATION,
            &inputs(0, 20, CycleSubPhase::Inspiration, &p),
        );
        assert_eq!(cmd, NOMINAL_INSPIRATION);
        assert!(e.flags().is_empty());
    }

    #[test]
    fn peak_vents_on_threshold_tick() {
        let mut e = engine(3, 2);
        let p = params();
        for now in 0..2 {
            let cmd = e.apply(
                NOMINAL_INSPIRATION,
                &inputs(now, 35, CycleSubPhase::Inspiration, &p),
            );
            assert_eq!(cmd, NOMINAL_INSPIRATION);
        }
        let cmd = e.apply(
            NOMINAL_INSPIRATION,
            &inputs(2, 35, CycleSubPhase::Inspiration, &p),
        );
        assert_eq!(cmd.patient, 100);
        assert_eq!(cmd.blower, 0);
        assert!(e.flags().contains(SafeguardFlags::PEAK_OVERPRESSURE));
    }

    #[test]
    fn pressure_at_limit_is_not_a_violation() {
        let mut e = engine(1, 1);
        let p = params();
        let cmd = e.apply(
            NOMINAL_INSPIRATION,
            &inputs(0, 30, CycleSubPhase::Inspiration, &p),
        );
        assert_eq!(cmd, NOMINAL_INSPIRATION);
    }

    #[test]
    fn plateau_bleed_does_not_undo_peak_vent() {
        let mut e = engine(1, 5);
        let p = params();
        let cmd = e.apply(
            ValveCommand::closed(&ValveConfig::default()),
            &inputs(0, 40, CycleSubPhase::Plateau, &p),
        );
        assert!(e.flags().contains(SafeguardFlags::PEAK_OVERPRESSURE));
        assert!(e.flags().contains(SafeguardFlags::PLATEAU_OVERPRESSURE));
        assert_eq!(cmd.patient, 100);
        assert_eq!(cmd.blower, 0);
    }

    #[test]
    fn plateau_alone_bleeds_partially() {
        let mut e = engine(1, 5);
        let p = params();
        // 27 > 25 (plateau limit) but < 30 (peak limit).
        let cmd = e.apply(
            ValveCommand::closed(&ValveConfig::default()),
            &inputs(0, 27, CycleSubPhase::Plateau, &p),
        );
        assert_eq!(e.flags(), SafeguardFlags::PLATEAU_OVERPRESSURE);
        assert_eq!(cmd.patient, ValveConfig::default().plateau_bleed);
        assert_eq!(cmd.blower, 0);
    }

    #[test]
    fn peep_hold_freezes_then_maintain_escalates() {
        let mut e = engine(2, 5);
        let p = params();
        let mut i = inputs(0, 3, CycleSubPhase::HoldExhalation, &p);

        i.patient_aperture = 70;
        assert_eq!(e.apply(NOMINAL_EXHALATION, &i), NOMINAL_EXHALATION);

        i.now = 1;
        i.patient_aperture = 72;
        let cmd = e.apply(NOMINAL_EXHALATION, &i);
        assert_eq!(cmd.patient, 72);
        assert_eq!(cmd.blower, 0);
        assert_eq!(e.frozen_patient(), Some(72));

        // Maintain starts counting on the tick the hold engages.
        assert!(!e.flags().contains(SafeguardFlags::PEEP_MAINTAIN));
        i.now = 2;
        i.patient_aperture = 74;
        let cmd = e.apply(NOMINAL_EXHALATION, &i);
        assert_eq!(cmd.patient, 72);
        assert_eq!(cmd.blower, ValveConfig::default().peep_makeup);
        assert!(e.flags().contains(SafeguardFlags::PEEP_MAINTAIN));
    }

    #[test]
    fn detectors_ignore_samples_outside_window() {
        let mut e = engine(1, 1);
        let p = params();
        // Low pressure during inspiration is normal.
        let cmd = e.apply(
            NOMINAL_INSPIRATION,
            &inputs(0, 0, CycleSubPhase::Inspiration, &p),
        );
        assert_eq!(cmd, NOMINAL_INSPIRATION);
        // High pressure during exhalation is not a peak violation.
        let cmd = e.apply(
            NOMINAL_EXHALATION,
            &inputs(1, 50, CycleSubPhase::Exhalation, &p),
        );
        assert_eq!(cmd, NOMINAL_EXHALATION);
        assert!(e.flags().is_empty());
    }

    #[test]
    fn peak_state_kept_but_not_applied_in_exhalation() {
        let mut e = engine(1, 10);
        let p = params();
        e.apply(
            NOMINAL_INSPIRATION,
            &inputs(0, 40, CycleSubPhase::Inspiration, &p),
        );
        let cmd = e.apply(
            NOMINAL_EXHALATION,
            &inputs(1, 10, CycleSubPhase::Exhalation, &p),
        );
        assert_eq!(cmd, NOMINAL_EXHALATION);
        assert!(e.flags().contains(SafeguardFlags::PEAK_OVERPRESSURE));
    }

    #[test]
    fn reset_clears_flags_and_freeze() {
        let mut e = engine(1, 10);
        let p = params();
        e.apply(
            NOMINAL_EXHALATION,
            &inputs(0, 1, CycleSubPhase::HoldExhalation, &p),
        );
        assert!(e.flags().has_peep_loss());
        e.reset();
        assert!(e.flags().is_empty());
        assert_eq!(e.frozen_patient(), None);
    }
}
