//! Operator setpoint store.
//!
//! [`SetpointStore`] is a cloneable handle: the control loop keeps one and the
//! input-handling path gets another. Adjustments lock, change one field by one
//! step (clamped to its safe range) and unlock. The cycle commit copies the
//! whole struct under the same lock, so a breath never sees a torn mix of old
//! and new values.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use vent_common::ventilation::config::{SetpointRange, SetpointsConfig};
use vent_common::ventilation::setpoints::CommandedSetpoints;

/// Direction of a discrete adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    Minus,
    Plus,
}

impl Adjust {
    #[inline]
    fn apply(self, range: &SetpointRange, value: u16) -> u16 {
        match self {
            Self::Minus => range.decrement(value),
            Self::Plus => range.increment(value),
        }
    }
}

/// Shared handle on the operator setpoints.
#[derive(Debug, Clone)]
pub struct SetpointStore {
    shared: Arc<Mutex<CommandedSetpoints>>,
    ranges: SetpointsConfig,
}

impl SetpointStore {
    /// Store holding the configured power-on setpoints.
    pub fn new(ranges: SetpointsConfig) -> Self {
        Self::with_initial(ranges.initial(), ranges)
    }

    /// Store holding `initial`, each field clamped into its range.
    pub fn with_initial(initial: CommandedSetpoints, ranges: SetpointsConfig) -> Self {
        let clamped = CommandedSetpoints {
            cycles_per_minute: ranges.cycles_per_minute.clamp(initial.cycles_per_minute),
            min_peep: ranges.min_peep.clamp(initial.min_peep),
            max_plateau_pressure: ranges.max_plateau.clamp(initial.max_plateau_pressure),
            max_peak_pressure: ranges.max_peak.clamp(initial.max_peak_pressure),
            aperture: initial.aperture,
        };
        Self {
            shared: Arc::new(Mutex::new(clamped)),
            ranges,
        }
    }

    /// Consistent copy of all setpoints.
    #[inline]
    pub fn snapshot(&self) -> CommandedSetpoints {
        *self.shared.lock()
    }

    #[inline]
    pub fn ranges(&self) -> &SetpointsConfig {
        &self.ranges
    }

    pub fn adjust_cycles_per_minute(&self, dir: Adjust) -> u16 {
        let mut s = self.shared.lock();
        s.cycles_per_minute = dir.apply(&self.ranges.cycles_per_minute, s.cycles_per_minute);
        debug!(cycles_per_minute = s.cycles_per_minute, "setpoint adjusted");
        s.cycles_per_minute
    }

    pub fn adjust_min_peep(&self, dir: Adjust) -> u16 {
        let mut s = self.shared.lock();
        s.min_peep = dir.apply(&self.ranges.min_peep, s.min_peep);
        debug!(min_peep = s.min_peep, "setpoint adjusted");
        s.min_peep
    }

    pub fn adjust_max_plateau_pressure(&self, dir: Adjust) -> u16 {
        let mut s = self.shared.lock();
        s.max_plateau_pressure = dir.apply(&self.ranges.max_plateau, s.max_plateau_pressure);
        debug!(max_plateau_pressure = s.max_plateau_pressure, "setpoint adjusted");
        s.max_plateau_pressure
    }

    pub fn adjust_max_peak_pressure(&self, dir: Adjust) -> u16 {
        let mut s = self.shared.lock();
        s.max_peak_pressure = dir.apply(&self.ranges.max_peak, s.max_peak_pressure);
        debug!(max_peak_pressure = s.max_peak_pressure, "setpoint adjusted");
        s.max_peak_pressure
    }

    // ── Operator controls ──

    /// One breath per minute less.
    pub fn on_cycle_minus(&self) -> u16 {
        self.adjust_cycles_per_minute(Adjust::Minus)
    }

    /// One breath per minute more.
    pub fn on_cycle_plus(&self) -> u16 {
        self.adjust_cycles_per_minute(Adjust::Plus)
    }

    /// Lower the minimal PEEP.
    pub fn on_pression_pep_minus(&self) -> u16 {
        self.adjust_min_peep(Adjust::Minus)
    }

    /// Raise the minimal PEEP.
    pub fn on_pression_pep_plus(&self) -> u16 {
        self.adjust_min_peep(Adjust::Plus)
    }

    /// Lower the maximal plateau pressure.
    pub fn on_pression_plateau_minus(&self) -> u16 {
        self.adjust_max_plateau_pressure(Adjust::Minus)
    }

    /// Raise the maximal plateau pressure.
    pub fn on_pression_plateau_plus(&self) -> u16 {
        self.adjust_max_plateau_pressure(Adjust::Plus)
    }

    /// Lower the maximal peak (crête) pressure.
    pub fn on_pression_crete_minus(&self) -> u16 {
        self.adjust_max_peak_pressure(Adjust::Minus)
    }

    /// Raise the maximal peak (crête) pressure.
    pub fn on_pression_crete_plus(&self) -> u16 {
        self.adjust_max_peak_pressure(Adjust::Plus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vent_common::consts::{
        CYCLES_PER_MINUTE_DEFAULT, MAX_PEAK_MAX, MAX_PEAK_MIN, MIN_PEEP_DEFAULT, MIN_PEEP_MIN,
    };

    fn store() -> SetpointStore {
        SetpointStore::new(SetpointsConfig::default())
    }

    #[test]
    fn each_operation_touches_one_field() {
        let s = store();
        let before = s.snapshot();

        assert_eq!(s.on_cycle_plus(), CYCLES_PER_MINUTE_DEFAULT + 1);
        let after = s.snapshot();
        assert_eq!(after.min_peep, before.min_peep);
        assert_eq!(after.max_plateau_pressure, before.max_plateau_pressure);
        assert_eq!(after.max_peak_pressure, before.max_peak_pressure);
        assert_eq!(after.aperture, before.aperture);

        assert_eq!(s.on_cycle_minus(), CYCLES_PER_MINUTE_DEFAULT);
        assert_eq!(s.snapshot(), before);
    }

    #[test]
    fn crete_clamps_at_ceiling_and_floor() {
        let s = store();
        for _ in 0..200 {
            s.on_pression_crete_plus();
        }
        assert_eq!(s.snapshot().max_peak_pressure, MAX_PEAK_MAX);

        for _ in 0..200 {
            s.on_pression_crete_minus();
        }
        assert_eq!(s.snapshot().max_peak_pressure, MAX_PEAK_MIN);
    }

    #[test]
    fn pep_minus_at_floor_is_silent() {
        let s = store();
        assert_eq!(MIN_PEEP_DEFAULT, MIN_PEEP_MIN);
        assert_eq!(s.on_pression_pep_minus(), MIN_PEEP_MIN);
        assert_eq!(s.on_pression_pep_plus(), MIN_PEEP_MIN + 1);
    }

    #[test]
    fn plateau_respects_configured_step() {
        let mut ranges = SetpointsConfig::default();
        ranges.max_plateau.step = 5;
        let s = SetpointStore::new(ranges);
        assert_eq!(s.on_pression_plateau_minus(), 25);
        assert_eq!(s.on_pression_plateau_minus(), 20);
        assert_eq!(s.on_pression_plateau_plus(), 25);
    }

    #[test]
    fn clones_share_state() {
        let control = store();
        let input = control.clone();
        input.on_cycle_plus();
        assert_eq!(control.snapshot().cycles_per_minute, CYCLES_PER_MINUTE_DEFAULT + 1);
    }

    #[test]
    fn initial_values_are_clamped() {
        let initial = CommandedSetpoints {
            cycles_per_minute: 100,
            min_peep: 0,
            max_plateau_pressure: 200,
            max_peak_pressure: 1,
            aperture: 40,
        };
        let s = SetpointStore::with_initial(initial, SetpointsConfig::default());
        let snap = s.snapshot();
        assert_eq!(snap.cycles_per_minute, 35);
        assert_eq!(snap.min_peep, 5);
        assert_eq!(snap.max_plateau_pressure, 30);
        assert_eq!(snap.max_peak_pressure, 10);
        assert_eq!(snap.aperture, 40);
    }

    #[test]
    fn concurrent_adjustments_are_not_lost() {
        let s = store();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let h = s.clone();
                std::thread::spawn(move || {
                    for _ in 0..3 {
                        h.on_pression_pep_plus();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(s.snapshot().min_peep, MIN_PEEP_DEFAULT + 12);
    }
}
