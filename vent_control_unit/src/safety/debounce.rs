//! Debounce timer shared by the four safeguards.
//!
//! A violation must persist for `debounce_ticks` consecutive ticks before the
//! timer engages, and once engaged it holds until the condition has been clear
//! for `clear_ticks` consecutive ticks. A clear tick before engagement drops
//! the pending crossing; a violating tick while releasing restarts the clear
//! window.

use vent_common::ventilation::config::DebounceConfig;

/// Control loop tick index. Wraps; only differences are meaningful.
pub type Tick = u32;

/// Edge reported by [`DebounceTimer::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No change of the engaged state.
    None,
    /// Debounce threshold reached on this tick.
    Engaged,
    /// Clear threshold reached on this tick.
    Released,
}

#[derive(Debug, Clone)]
pub struct DebounceTimer {
    debounce_ticks: u32,
    clear_ticks: u32,
    /// Tick of the first violating sample of the pending or active crossing.
    first_crossing: Option<Tick>,
    /// Tick of the first clear sample after engagement.
    clear_since: Option<Tick>,
    engaged: bool,
}

impl DebounceTimer {
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            debounce_ticks: u32::from(config.debounce_ticks.max(1)),
            clear_ticks: u32::from(config.clear_ticks.max(1)),
            first_crossing: None,
            clear_since: None,
            engaged: false,
        }
    }

    /// Feed one sample taken at tick `now`.
    pub fn update(&mut self, violating: bool, now: Tick) -> Transition {
        if violating {
            self.clear_since = None;
            let first = *self.first_crossing.get_or_insert(now);
            if !self.engaged && span(first, now) >= self.debounce_ticks {
                self.engaged = true;
                return Transition::Engaged;
            }
            return Transition::None;
        }

        if !self.engaged {
            self.first_crossing = None;
            return Transition::None;
        }

        let since = *self.clear_since.get_or_insert(now);
        if span(since, now) >= self.clear_ticks {
            self.reset();
            return Transition::Released;
        }
        Transition::None
    }

    /// Back to "not crossed".
    pub fn reset(&mut self) {
        self.first_crossing = None;
        self.clear_since = None;
        self.engaged = false;
    }

    #[inline]
    pub const fn is_engaged(&self) -> bool {
        self.engaged
    }

    #[cfg(test)]
    const fn first_crossing(&self) -> Option<Tick> {
        self.first_crossing
    }

    #[cfg(test)]
    const fn clear_since(&self) -> Option<Tick> {
        self.clear_since
    }
}

/// Number of ticks in `[from, now]`, inclusive.
#[inline]
fn span(from: Tick, now: Tick) -> u32 {
    now.wrapping_sub(from).saturating_add(1)
}
