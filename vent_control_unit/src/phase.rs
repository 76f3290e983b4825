//! Respiratory phase state machine.
//!
//! Maps elapsed time within the cycle to a (phase, sub-phase) pair:
//!
//! ```text
//! 0 ─ INSPIRATION ─ insp_end ─ PLATEAU ─ inhalation ─ EXHALATION ─ hold_start ─ HOLD_EXHALATION ─ cycle
//! ```
//!
//! All boundaries are exclusive on the left window: `t < inhalation` is
//! INHALATION, `t == inhalation` is already EXHALATION. Elapsed times at or
//! past the cycle length stay in HOLD_EXHALATION; starting the next cycle is
//! the caller's job.

use vent_common::consts::CentiSec;
use vent_common::ventilation::config::PhaseConfig;
use vent_common::ventilation::phase::{CyclePhase, CycleSubPhase};

use crate::timing::CycleTiming;

/// End of the INSPIRATION window [1/100 s].
#[inline]
pub fn inspiration_end(timing: &CycleTiming, config: &PhaseConfig) -> CentiSec {
    let inhalation = u32::from(timing.centisec_per_inhalation());
    (inhalation * u32::from(config.inspiration_percent) / 100) as CentiSec
}

/// Start of the HOLD_EXHALATION window [1/100 s].
///
/// Never earlier than the end of the inhalation.
#[inline]
pub fn hold_exhalation_start(timing: &CycleTiming, config: &PhaseConfig) -> CentiSec {
    timing
        .centisec_per_cycle()
        .saturating_sub(config.hold_exhalation_centisec)
        .max(timing.centisec_per_inhalation())
}

/// Sub-phase at `elapsed` centiseconds into a cycle. Pure function.
pub fn sub_phase_at(elapsed: CentiSec, timing: &CycleTiming, config: &PhaseConfig) -> CycleSubPhase {
    if elapsed < timing.centisec_per_inhalation() {
        if elapsed < inspiration_end(timing, config) {
            CycleSubPhase::Inspiration
        } else {
            CycleSubPhase::Plateau
        }
    } else if elapsed < hold_exhalation_start(timing, config) {
        CycleSubPhase::Exhalation
    } else {
        CycleSubPhase::HoldExhalation
    }
}

/// Current sub-phase plus entry detection.
#[derive(Debug, Clone)]
pub struct PhaseMachine {
    config: PhaseConfig,
    sub_phase: CycleSubPhase,
    previous: Option<CycleSubPhase>,
}

impl PhaseMachine {
    pub const fn new(config: PhaseConfig) -> Self {
        Self {
            config,
            sub_phase: CycleSubPhase::Inspiration,
            previous: None,
        }
    }

    /// Back to INHALATION/INSPIRATION for a new cycle.
    pub fn reset(&mut self) {
        self.sub_phase = CycleSubPhase::Inspiration;
        self.previous = None;
    }

    /// Update from elapsed time; returns the new sub-phase.
    pub fn update(&mut self, elapsed: CentiSec, timing: &CycleTiming) -> CycleSubPhase {
        self.previous = Some(self.sub_phase);
        self.sub_phase = sub_phase_at(elapsed, timing, &self.config);
        self.sub_phase
    }

    #[inline]
    pub const fn phase(&self) -> CyclePhase {
        self.sub_phase.phase()
    }

    #[inline]
    pub const fn sub_phase(&self) -> CycleSubPhase {
        self.sub_phase
    }

    /// Whether the last [`PhaseMachine::update`] entered a new sub-phase.
    ///
    /// True on the first update of a cycle.
    #[inline]
    pub fn just_entered(&self) -> bool {
        self.previous.is_none_or(|prev| prev != self.sub_phase)
    }
}
