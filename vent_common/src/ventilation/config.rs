//! Configuration structures for the pressure control unit.
//!
//! Loaded from TOML at startup and immutable afterwards. Every section and
//! field has a default, so an empty file yields the factory configuration.
//! Numeric parameters are checked against the absolute bounds in
//! [`crate::consts`] by [`VentilatorConfig::validate`].

use serde::{Deserialize, Serialize};

use crate::config::SharedConfig;
use crate::consts::{
    Aperture, BLOWER_APERTURE_DEFAULT, CENTISEC_PER_MINUTE, CYCLES_PER_MINUTE_DEFAULT,
    CYCLES_PER_MINUTE_MAX, CYCLES_PER_MINUTE_MIN, DEFAULT_TICK_CENTISEC,
    HOLD_EXHALATION_CENTISEC_DEFAULT, INSPIRATION_PERCENT_DEFAULT, MAX_PEAK_DEFAULT,
    MAX_PEAK_MAX, MAX_PEAK_MIN, MAX_PLATEAU_DEFAULT, MAX_PLATEAU_MAX, MAX_PLATEAU_MIN,
    MAX_TICK_CENTISEC, MIN_PEEP_DEFAULT, MIN_PEEP_MAX, MIN_PEEP_MIN, PEAK_CLEAR_TICKS_DEFAULT,
    PEAK_DEBOUNCE_TICKS_DEFAULT, PEEP_HOLD_CLEAR_TICKS_DEFAULT, PEEP_HOLD_DEBOUNCE_TICKS_DEFAULT,
    PEEP_MAINTAIN_CLEAR_TICKS_DEFAULT, PEEP_MAINTAIN_DEBOUNCE_TICKS_DEFAULT,
    PEEP_MAKEUP_APERTURE_DEFAULT, PLATEAU_BLEED_APERTURE_DEFAULT, PLATEAU_CLEAR_TICKS_DEFAULT,
    PLATEAU_DEBOUNCE_TICKS_DEFAULT, SETPOINT_STEP_DEFAULT, VALVE_CLOSED, VALVE_FULLY_OPEN,
};

use super::setpoints::CommandedSetpoints;

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete pressure control unit configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct VentilatorConfig {
    #[serde(default)]
    pub shared: SharedConfig,
    #[serde(default)]
    pub control_loop: ControlLoopConfig,
    #[serde(default)]
    pub setpoints: SetpointsConfig,
    #[serde(default)]
    pub phases: PhaseConfig,
    #[serde(default)]
    pub valves: ValveConfig,
    #[serde(default)]
    pub safeguards: SafeguardsConfig,
}

impl VentilatorConfig {
    /// Validate parameter bounds and cross-section consistency.
    pub fn validate(&self) -> Result<(), String> {
        self.control_loop.validate()?;
        self.setpoints.validate(&self.valves)?;
        self.valves.validate()?;
        self.phases.validate(&self.setpoints)?;
        self.safeguards.validate()?;
        Ok(())
    }
}

// ─── Control Loop ───────────────────────────────────────────────────

/// Tick pacing and real-time scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLoopConfig {
    /// Control period [1/100 s] (default: 1 = 10 ms).
    pub tick_centisec: u16,
    /// CPU core the loop thread is pinned to (`rt` feature only).
    pub cpu_core: usize,
    /// SCHED_FIFO priority (`rt` feature only).
    pub rt_priority: i32,
    /// Cycles between two statistics log lines.
    pub stats_interval_cycles: u32,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            tick_centisec: DEFAULT_TICK_CENTISEC,
            cpu_core: 1,
            rt_priority: 80,
            stats_interval_cycles: 10,
        }
    }
}

impl ControlLoopConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.tick_centisec == 0 || self.tick_centisec > MAX_TICK_CENTISEC {
            return Err(format!(
                "control_loop.tick_centisec {} out of range [1, {}]",
                self.tick_centisec, MAX_TICK_CENTISEC
            ));
        }
        if !(1..=99).contains(&self.rt_priority) {
            return Err(format!(
                "control_loop.rt_priority {} out of range [1, 99]",
                self.rt_priority
            ));
        }
        if self.stats_interval_cycles == 0 {
            return Err("control_loop.stats_interval_cycles must be >= 1".to_string());
        }
        Ok(())
    }
}

// ─── Setpoints ──────────────────────────────────────────────────────

/// Safe range and adjustment step of one operator setpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetpointRange {
    pub min: u16,
    pub max: u16,
    /// Change applied by one increment/decrement request.
    #[serde(default = "default_step")]
    pub step: u16,
    /// Value at power-on.
    pub default: u16,
}

fn default_step() -> u16 {
    SETPOINT_STEP_DEFAULT
}

impl SetpointRange {
    pub const fn new(min: u16, max: u16, default: u16) -> Self {
        Self {
            min,
            max,
            step: SETPOINT_STEP_DEFAULT,
            default,
        }
    }

    /// Clamp `value` into `[min, max]`. An inverted range yields `max`.
    #[inline]
    pub fn clamp(&self, value: u16) -> u16 {
        value.max(self.min).min(self.max)
    }

    /// One step up, saturating at `max`.
    #[inline]
    pub fn increment(&self, value: u16) -> u16 {
        self.clamp(value.saturating_add(self.step))
    }

    /// One step down, saturating at `min`.
    #[inline]
    pub fn decrement(&self, value: u16) -> u16 {
        self.clamp(value.saturating_sub(self.step))
    }

    fn validate(&self, name: &str, abs_min: u16, abs_max: u16) -> Result<(), String> {
        if self.min < abs_min || self.max > abs_max || self.min > self.max {
            return Err(format!(
                "setpoints.{name} range [{}, {}] must lie within [{abs_min}, {abs_max}]",
                self.min, self.max
            ));
        }
        if self.step == 0 {
            return Err(format!("setpoints.{name}.step must be >= 1"));
        }
        if self.default < self.min || self.default > self.max {
            return Err(format!(
                "setpoints.{name}.default {} out of range [{}, {}]",
                self.default, self.min, self.max
            ));
        }
        Ok(())
    }
}

/// Operator setpoint ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetpointsConfig {
    pub cycles_per_minute: SetpointRange,
    pub min_peep: SetpointRange,
    pub max_plateau: SetpointRange,
    pub max_peak: SetpointRange,
    /// Blower aperture during inspiration. Not operator-adjustable.
    pub aperture: Aperture,
}

impl Default for SetpointsConfig {
    fn default() -> Self {
        Self {
            cycles_per_minute: SetpointRange::new(
                CYCLES_PER_MINUTE_MIN,
                CYCLES_PER_MINUTE_MAX,
                CYCLES_PER_MINUTE_DEFAULT,
            ),
            min_peep: SetpointRange::new(MIN_PEEP_MIN, MIN_PEEP_MAX, MIN_PEEP_DEFAULT),
            max_plateau: SetpointRange::new(MAX_PLATEAU_MIN, MAX_PLATEAU_MAX, MAX_PLATEAU_DEFAULT),
            max_peak: SetpointRange::new(MAX_PEAK_MIN, MAX_PEAK_MAX, MAX_PEAK_DEFAULT),
            aperture: BLOWER_APERTURE_DEFAULT,
        }
    }
}

impl SetpointsConfig {
    pub fn validate(&self, valves: &ValveConfig) -> Result<(), String> {
        self.cycles_per_minute.validate(
            "cycles_per_minute",
            CYCLES_PER_MINUTE_MIN,
            CYCLES_PER_MINUTE_MAX,
        )?;
        self.min_peep
            .validate("min_peep", MIN_PEEP_MIN, MIN_PEEP_MAX)?;
        self.max_plateau
            .validate("max_plateau", MAX_PLATEAU_MIN, MAX_PLATEAU_MAX)?;
        self.max_peak
            .validate("max_peak", MAX_PEAK_MIN, MAX_PEAK_MAX)?;
        if self.aperture <= valves.closed || self.aperture > valves.fully_open {
            return Err(format!(
                "setpoints.aperture {} out of range ({}, {}]",
                self.aperture, valves.closed, valves.fully_open
            ));
        }
        Ok(())
    }

    /// Power-on operator setpoints.
    pub fn initial(&self) -> CommandedSetpoints {
        CommandedSetpoints {
            cycles_per_minute: self.cycles_per_minute.default,
            min_peep: self.min_peep.default,
            max_plateau_pressure: self.max_plateau.default,
            max_peak_pressure: self.max_peak.default,
            aperture: self.aperture,
        }
    }
}

// ─── Phases ─────────────────────────────────────────────────────────

/// Sub-phase windows inside a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    /// Share of the inhalation spent in INSPIRATION [%], the rest is PLATEAU.
    pub inspiration_percent: u8,
    /// Trailing exhalation window spent in HOLD_EXHALATION [1/100 s].
    pub hold_exhalation_centisec: u16,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            inspiration_percent: INSPIRATION_PERCENT_DEFAULT,
            hold_exhalation_centisec: HOLD_EXHALATION_CENTISEC_DEFAULT,
        }
    }
}

impl PhaseConfig {
    /// The hold window must leave room for a plain EXHALATION sub-phase even
    /// at the fastest configurable rate.
    pub fn validate(&self, setpoints: &SetpointsConfig) -> Result<(), String> {
        if self.inspiration_percent == 0 || self.inspiration_percent > 100 {
            return Err(format!(
                "phases.inspiration_percent {} out of range [1, 100]",
                self.inspiration_percent
            ));
        }
        let shortest_cycle = CENTISEC_PER_MINUTE / setpoints.cycles_per_minute.max;
        let shortest_exhalation = shortest_cycle - shortest_cycle / 3;
        if self.hold_exhalation_centisec >= shortest_exhalation {
            return Err(format!(
                "phases.hold_exhalation_centisec {} must be < {} (exhalation at {} cycles/min)",
                self.hold_exhalation_centisec, shortest_exhalation, setpoints.cycles_per_minute.max
            ));
        }
        Ok(())
    }
}

// ─── Valves ─────────────────────────────────────────────────────────

/// Valve apertures. Larger values open further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValveConfig {
    pub closed: Aperture,
    pub fully_open: Aperture,
    /// Patient valve aperture while bleeding a plateau over-pressure.
    pub plateau_bleed: Aperture,
    /// Blower aperture while injecting PEEP make-up flow.
    pub peep_makeup: Aperture,
}

impl Default for ValveConfig {
    fn default() -> Self {
        Self {
            closed: VALVE_CLOSED,
            fully_open: VALVE_FULLY_OPEN,
            plateau_bleed: PLATEAU_BLEED_APERTURE_DEFAULT,
            peep_makeup: PEEP_MAKEUP_APERTURE_DEFAULT,
        }
    }
}

impl ValveConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.closed >= self.fully_open {
            return Err(format!(
                "valves.closed {} must be < valves.fully_open {}",
                self.closed, self.fully_open
            ));
        }
        for (name, value) in [
            ("plateau_bleed", self.plateau_bleed),
            ("peep_makeup", self.peep_makeup),
        ] {
            if value <= self.closed || value > self.fully_open {
                return Err(format!(
                    "valves.{name} {value} out of range ({}, {}]",
                    self.closed, self.fully_open
                ));
            }
        }
        Ok(())
    }
}

// ─── Safeguards ─────────────────────────────────────────────────────

/// Debounce law of one safeguard [ticks].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebounceConfig {
    /// Consecutive violating ticks before the corrective action engages.
    pub debounce_ticks: u16,
    /// Consecutive clear ticks before it is released.
    pub clear_ticks: u16,
}

impl DebounceConfig {
    pub const fn new(debounce_ticks: u16, clear_ticks: u16) -> Self {
        Self {
            debounce_ticks,
            clear_ticks,
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if self.debounce_ticks == 0 || self.clear_ticks == 0 {
            return Err(format!(
                "safeguards.{name}: debounce_ticks and clear_ticks must be >= 1"
            ));
        }
        Ok(())
    }
}

/// One debounce law per safeguard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SafeguardsConfig {
    pub peak: DebounceConfig,
    pub plateau: DebounceConfig,
    pub peep_hold: DebounceConfig,
    pub peep_maintain: DebounceConfig,
}

impl Default for SafeguardsConfig {
    fn default() -> Self {
        Self {
            peak: DebounceConfig::new(PEAK_DEBOUNCE_TICKS_DEFAULT, PEAK_CLEAR_TICKS_DEFAULT),
            plateau: DebounceConfig::new(
                PLATEAU_DEBOUNCE_TICKS_DEFAULT,
                PLATEAU_CLEAR_TICKS_DEFAULT,
            ),
            peep_hold: DebounceConfig::new(
                PEEP_HOLD_DEBOUNCE_TICKS_DEFAULT,
                PEEP_HOLD_CLEAR_TICKS_DEFAULT,
            ),
            peep_maintain: DebounceConfig::new(
                PEEP_MAINTAIN_DEBOUNCE_TICKS_DEFAULT,
                PEEP_MAINTAIN_CLEAR_TICKS_DEFAULT,
            ),
        }
    }
}

impl SafeguardsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.peak.validate("peak")?;
        self.plateau.validate("plateau")?;
        self.peep_hold.validate("peep_hold")?;
        self.peep_maintain.validate("peep_maintain")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(VentilatorConfig::default().validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config: VentilatorConfig = toml::from_str("").unwrap();
        assert_eq!(config, VentilatorConfig::default());
    }

    #[test]
    fn range_step_saturates_at_bounds() {
        let range = SetpointRange {
            min: 10,
            max: 70,
            step: 5,
            default: 60,
        };
        assert_eq!(range.increment(60), 65);
        assert_eq!(range.increment(68), 70);
        assert_eq!(range.decrement(12), 10);
        assert_eq!(range.decrement(0), 10);
        assert_eq!(range.increment(u16::MAX), 70);
    }

    #[test]
    fn inverted_range_clamps_without_panicking() {
        let range = SetpointRange::new(50, 40, 45);
        assert_eq!(range.clamp(10), 40);
        assert_eq!(range.clamp(60), 40);
        assert_eq!(range.increment(45), 40);
        assert_eq!(range.decrement(45), 40);
    }

    #[test]
    fn reject_inverted_range() {
        let mut config = VentilatorConfig::default();
        config.setpoints.max_peak.min = 50;
        config.setpoints.max_peak.max = 40;
        let err = config.validate().unwrap_err();
        assert!(err.contains("max_peak"), "{err}");
    }

    #[test]
    fn reject_range_outside_absolute_bounds() {
        let mut config = VentilatorConfig::default();
        config.setpoints.max_peak.max = MAX_PEAK_MAX + 1;
        let msg = config.validate().unwrap_err();
        assert!(msg.contains("max_peak"), "got: {msg}");
    }

    #[test]
    fn reject_default_outside_range() {
        let mut config = VentilatorConfig::default();
        config.setpoints.min_peep.default = MIN_PEEP_MAX + 1;
        assert!(config.validate().unwrap_err().contains("min_peep.default"));
    }

    #[test]
    fn reject_zero_step() {
        let mut config = VentilatorConfig::default();
        config.setpoints.cycles_per_minute.step = 0;
        assert!(config.validate().unwrap_err().contains("step"));
    }

    #[test]
    fn reject_zero_tick() {
        let mut config = VentilatorConfig::default();
        config.control_loop.tick_centisec = 0;
        assert!(config.validate().unwrap_err().contains("tick_centisec"));
    }

    #[test]
    fn reject_hold_window_longer_than_exhalation() {
        let mut config = VentilatorConfig::default();
        // 35 cycles/min → 171 cs cycle, 57 cs inhalation, 114 cs exhalation.
        config.phases.hold_exhalation_centisec = 114;
        assert!(config.validate().unwrap_err().contains("hold_exhalation"));
        config.phases.hold_exhalation_centisec = 113;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn reject_inverted_valves() {
        let mut config = VentilatorConfig::default();
        config.valves.closed = 100;
        config.valves.fully_open = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_zero_debounce() {
        let mut config = VentilatorConfig::default();
        config.safeguards.peep_maintain.clear_ticks = 0;
        assert!(config.validate().unwrap_err().contains("peep_maintain"));
    }

    #[test]
    fn partial_range_uses_default_step() {
        let config: VentilatorConfig = toml::from_str(
            r#"
[setpoints.max_peak]
min = 20
max = 50
default = 30
"#,
        )
        .unwrap();
        assert_eq!(config.setpoints.max_peak.step, SETPOINT_STEP_DEFAULT);
        assert_eq!(config.setpoints.max_peak.max, 50);
        // Untouched ranges keep their defaults.
        assert_eq!(
            config.setpoints.min_peep,
            SetpointsConfig::default().min_peep
        );
    }

    #[test]
    fn initial_setpoints_follow_defaults() {
        let initial = SetpointsConfig::default().initial();
        assert_eq!(initial, CommandedSetpoints::default());
    }
}
