//! Cycle timing derived from the breathing rate.
//!
//! `centisec_per_cycle = 6000 / bpm` and
//! `centisec_per_inhalation = centisec_per_cycle / 3`, both with integer
//! division rounding toward zero. The remainder of both divisions goes to the
//! exhalation, so inhalation never exceeds one third of the cycle.

use thiserror::Error;
use vent_common::consts::{CENTISEC_PER_MINUTE, CentiSec};
use vent_common::ventilation::config::SetpointRange;

/// Rejected timing request. The previous timing stays in force.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TimingError {
    #[error("breathing rate of 0 cycles/min")]
    ZeroRate,
    #[error("breathing rate {bpm} cycles/min out of range [{min}, {max}]")]
    OutOfRange { bpm: u16, min: u16, max: u16 },
}

/// Cycle and inhalation durations [1/100 s].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTiming {
    centisec_per_cycle: CentiSec,
    centisec_per_inhalation: CentiSec,
}

impl CycleTiming {
    /// Timing for `bpm`, which must lie within `range`.
    pub fn for_rate(bpm: u16, range: &SetpointRange) -> Result<Self, TimingError> {
        if bpm == 0 {
            return Err(TimingError::ZeroRate);
        }
        if bpm < range.min || bpm > range.max {
            return Err(TimingError::OutOfRange {
                bpm,
                min: range.min,
                max: range.max,
            });
        }
        let centisec_per_cycle = CENTISEC_PER_MINUTE / bpm;
        Ok(Self {
            centisec_per_cycle,
            centisec_per_inhalation: centisec_per_cycle / 3,
        })
    }

    /// Replace `self` with the timing for `bpm`; on error `self` is unchanged.
    pub fn recompute(&mut self, bpm: u16, range: &SetpointRange) -> Result<(), TimingError> {
        *self = Self::for_rate(bpm, range)?;
        Ok(())
    }

    #[inline]
    pub const fn centisec_per_cycle(&self) -> CentiSec {
        self.centisec_per_cycle
    }

    #[inline]
    pub const fn centisec_per_inhalation(&self) -> CentiSec {
        self.centisec_per_inhalation
    }

    #[inline]
    pub const fn centisec_per_exhalation(&self) -> CentiSec {
        self.centisec_per_cycle - self.centisec_per_inhalation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vent_common::ventilation::config::SetpointsConfig;

    fn range() -> SetpointRange {
        SetpointsConfig::default().cycles_per_minute
    }

    #[test]
    fn twenty_cycles_per_minute() {
        let t = CycleTiming::for_rate(20, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 300);
        assert_eq!(t.centisec_per_inhalation(), 100);
        assert_eq!(t.centisec_per_exhalation(), 200);
    }

    #[test]
    fn integer_division_truncates() {
        // 6000 / 7 = 857.14 → 857; 857 / 3 = 285.67 → 285.
        let t = CycleTiming::for_rate(7, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 857);
        assert_eq!(t.centisec_per_inhalation(), 285);
        assert_eq!(t.centisec_per_exhalation(), 572);

        // 6000 / 35 = 171.43 → 171; 171 / 3 = 57 exactly.
        let t = CycleTiming::for_rate(35, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 171);
        assert_eq!(t.centisec_per_inhalation(), 57);

        // 6000 / 16 = 375; 375 / 3 = 125 exactly.
        let t = CycleTiming::for_rate(16, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 375);
        assert_eq!(t.centisec_per_inhalation(), 125);

        // 6000 / 11 = 545.45 → 545; 545 / 3 = 181.67 → 181.
        let t = CycleTiming::for_rate(11, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 545);
        assert_eq!(t.centisec_per_inhalation(), 181);
    }

    #[test]
    fn every_valid_rate_matches_formula() {
        let r = range();
        for bpm in r.min..=r.max {
            let t = CycleTiming::for_rate(bpm, &r).unwrap();
            assert_eq!(t.centisec_per_cycle(), 6000 / bpm);
            assert_eq!(t.centisec_per_inhalation(), (6000 / bpm) / 3);
            assert!(t.centisec_per_inhalation() > 0);
        }
    }

    #[test]
    fn zero_rate_rejected() {
        assert_eq!(CycleTiming::for_rate(0, &range()), Err(TimingError::ZeroRate));
    }

    #[test]
    fn out_of_range_keeps_previous_timing() {
        let mut t = CycleTiming::for_rate(20, &range()).unwrap();
        let err = t.recompute(36, &range()).unwrap_err();
        assert_eq!(
            err,
            TimingError::OutOfRange {
                bpm: 36,
                min: 5,
                max: 35
            }
        );
        assert_eq!(t.centisec_per_cycle(), 300);

        assert!(t.recompute(0, &range()).is_err());
        assert_eq!(t.centisec_per_inhalation(), 100);

        t.recompute(10, &range()).unwrap();
        assert_eq!(t.centisec_per_cycle(), 600);
    }
}
