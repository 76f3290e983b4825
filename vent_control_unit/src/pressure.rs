//! Per-cycle pressure tracking.
//!
//! Keeps the latest sample plus three captures for the running breath:
//! peak (running maximum over the INSPIRATION ticks), plateau (last sample of the
//! plateau, i.e. the value at the inhalation→exhalation boundary) and PEEP
//! (last sample of the hold-exhalation, i.e. the value at cycle end). When a
//! cycle starts, the finished breath moves to [`PressureTracker::previous`]
//! and the captures go back to neutral.

use vent_common::consts::Pressure;
use vent_common::ventilation::setpoints::CycleReadings;

#[derive(Debug, Clone, Default)]
pub struct PressureTracker {
    latest: Pressure,
    current: CycleReadings,
    previous: CycleReadings,
}

impl PressureTracker {
    pub const fn new() -> Self {
        Self {
            latest: 0,
            current: CycleReadings::NEUTRAL,
            previous: CycleReadings::NEUTRAL,
        }
    }

    /// Store one sensor reading. Captures are taken by the sub-phase actions,
    /// once the phase for this tick is known.
    #[inline]
    pub fn ingest(&mut self, measured: Pressure) {
        self.latest = measured;
    }

    /// peak = max(peak, latest).
    #[inline]
    pub fn track_peak(&mut self) {
        self.current.peak = self.current.peak.max(self.latest);
    }

    /// plateau = latest.
    #[inline]
    pub fn capture_plateau(&mut self) {
        self.current.plateau = self.latest;
    }

    /// peep = latest.
    #[inline]
    pub fn capture_peep(&mut self) {
        self.current.peep = self.latest;
    }

    /// Archive the running breath and reset captures to neutral.
    pub fn start_cycle(&mut self) {
        self.previous = self.current;
        self.current = CycleReadings::NEUTRAL;
    }

    #[inline]
    pub const fn latest(&self) -> Pressure {
        self.latest
    }

    /// Captures of the running breath.
    #[inline]
    pub const fn current(&self) -> &CycleReadings {
        &self.current
    }

    /// Captures of the last completed breath.
    #[inline]
    pub const fn previous(&self) -> &CycleReadings {
        &self.previous
    }
}
