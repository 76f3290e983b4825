//! Simulated lung for running the loop without hardware.
//!
//! First-order compliance model, advanced once per tick:
//!
//! ```text
//! dp = inflow_rate  · blower/open  · (supply − p)
//!    − outflow_rate · patient/open · (p − expiratory_floor)
//!    − leak_rate · p
//! ```
//!
//! The expiratory floor stands in for a PEEP column on the exhaust, so a
//! healthy circuit settles above the PEEP limit. Lowering it (or adding leak)
//! reproduces PEEP loss.

use vent_common::consts::{Aperture, Pressure, VALVE_FULLY_OPEN};

use crate::cycle::PressureSource;

/// Lung and circuit parameters. Rates are per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LungParams {
    /// Blower outlet pressure [cmH2O].
    pub supply_pressure: f32,
    pub inflow_rate: f32,
    pub outflow_rate: f32,
    /// Pressure the exhaust drains down to [cmH2O].
    pub expiratory_floor: f32,
    pub leak_rate: f32,
    /// Aperture reading of a fully open valve.
    pub fully_open: Aperture,
}

impl Default for LungParams {
    fn default() -> Self {
        Self {
            supply_pressure: 38.0,
            inflow_rate: 0.03,
            outflow_rate: 0.04,
            expiratory_floor: 6.0,
            leak_rate: 0.0,
            fully_open: VALVE_FULLY_OPEN,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LungSimulator {
    params: LungParams,
    pressure: f32,
}

impl LungSimulator {
    pub fn new(params: LungParams) -> Self {
        Self {
            params,
            pressure: 0.0,
        }
    }

    /// Advance one tick with the given valve positions.
    pub fn advance(&mut self, blower: Aperture, patient: Aperture) {
        let p = &self.params;
        let open = f32::from(p.fully_open.max(1));
        let blower = f32::from(blower.min(p.fully_open)) / open;
        let patient = f32::from(patient.min(p.fully_open)) / open;

        let inflow = p.inflow_rate * blower * (p.supply_pressure - self.pressure).max(0.0);
        let outflow = p.outflow_rate * patient * (self.pressure - p.expiratory_floor).max(0.0);
        let leak = p.leak_rate * self.pressure;

        self.pressure = (self.pressure + inflow - outflow - leak).max(0.0);
    }

    /// Current pressure rounded to the sensor resolution.
    #[inline]
    pub fn pressure(&self) -> Pressure {
        self.pressure.round().clamp(f32::from(Pressure::MIN), f32::from(Pressure::MAX)) as Pressure
    }

    #[inline]
    pub const fn params(&self) -> &LungParams {
        &self.params
    }
}

impl Default for LungSimulator {
    fn default() -> Self {
        Self::new(LungParams::default())
    }
}

impl PressureSource for LungSimulator {
    fn sample(&mut self, blower: Aperture, patient: Aperture) -> Pressure {
        self.advance(blower, patient);
        self.pressure()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_valves_hold_pressure() {
        let mut lung = LungSimulator::default();
        for _ in 0..50 {
            lung.advance(60, 0);
        }
        let held = lung.pressure();
        assert!(held > 0);
        for _ in 0..50 {
            lung.advance(0, 0);
        }
        assert_eq!(lung.pressure(), held);
    }

    #[test]
    fn inflow_saturates_below_supply() {
        let mut lung = LungSimulator::default();
        for _ in 0..10_000 {
            lung.advance(100, 0);
        }
        assert_eq!(lung.pressure(), 38);
    }

    #[test]
    fn exhaust_drains_to_floor() {
        let mut lung = LungSimulator::default();
        for _ in 0..100 {
            lung.advance(100, 0);
        }
        for _ in 0..1_000 {
            lung.advance(0, 100);
        }
        assert_eq!(lung.pressure(), 6);
    }

    #[test]
    fn leak_drains_below_floor() {
        let mut lung = LungSimulator::new(LungParams {
            leak_rate: 0.05,
            ..LungParams::default()
        });
        for _ in 0..100 {
            lung.advance(100, 0);
        }
        for _ in 0..1_000 {
            lung.advance(0, 100);
        }
        assert_eq!(lung.pressure(), 0);
    }

    #[test]
    fn sample_advances_then_reads() {
        let mut lung = LungSimulator::default();
        let first = lung.sample(100, 0);
        // 0.03 · 1.0 · 38 = 1.14 → 1
        assert_eq!(first, 1);
    }
}
