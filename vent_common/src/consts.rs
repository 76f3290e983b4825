//! System-wide constants for the ventilator workspace.
//!
//! Single source of truth for units, default setpoints and their safe bounds.
//! Configuration files may narrow these ranges but never widen them.

/// Pressure [cmH2O].
pub type Pressure = i16;

/// Valve aperture [% of full travel, 0 = closed].
pub type Aperture = u16;

/// Time since the start of the current respiratory cycle [1/100 s].
pub type CentiSec = u16;

/// Centiseconds in one minute.
pub const CENTISEC_PER_MINUTE: u16 = 6000;

/// Default control period [1/100 s] (10 ms).
pub const DEFAULT_TICK_CENTISEC: u16 = 1;

/// Longest accepted control period [1/100 s].
pub const MAX_TICK_CENTISEC: u16 = 10;

/// Neutral value for per-cycle pressure captures.
pub const NEUTRAL_PRESSURE: Pressure = 0;

// ─── Breathing rate [cycles/min] ────────────────────────────────────

pub const CYCLES_PER_MINUTE_MIN: u16 = 5;
pub const CYCLES_PER_MINUTE_MAX: u16 = 35;
pub const CYCLES_PER_MINUTE_DEFAULT: u16 = 20;

// ─── Minimal PEEP [cmH2O] ───────────────────────────────────────────

pub const MIN_PEEP_MIN: u16 = 5;
pub const MIN_PEEP_MAX: u16 = 30;
pub const MIN_PEEP_DEFAULT: u16 = 5;

// ─── Maximal plateau pressure [cmH2O] ───────────────────────────────

pub const MAX_PLATEAU_MIN: u16 = 10;
pub const MAX_PLATEAU_MAX: u16 = 30;
pub const MAX_PLATEAU_DEFAULT: u16 = 30;

// ─── Maximal peak (crête) pressure [cmH2O] ──────────────────────────

pub const MAX_PEAK_MIN: u16 = 10;
pub const MAX_PEAK_MAX: u16 = 70;
pub const MAX_PEAK_DEFAULT: u16 = 60;

/// Increment applied by one operator adjustment, for every setpoint.
pub const SETPOINT_STEP_DEFAULT: u16 = 1;

// ─── Valves ─────────────────────────────────────────────────────────

/// Fully closed valve.
pub const VALVE_CLOSED: Aperture = 0;

/// Fully open valve.
pub const VALVE_FULLY_OPEN: Aperture = 100;

/// Default blower aperture during inspiration.
pub const BLOWER_APERTURE_DEFAULT: Aperture = 60;

/// Patient valve aperture used to bleed an over-pressure plateau.
pub const PLATEAU_BLEED_APERTURE_DEFAULT: Aperture = 30;

/// Blower aperture used to inject make-up flow when PEEP is lost.
pub const PEEP_MAKEUP_APERTURE_DEFAULT: Aperture = 10;

// ─── Phases ─────────────────────────────────────────────────────────

/// Share of the inhalation spent in INSPIRATION before PLATEAU [%].
pub const INSPIRATION_PERCENT_DEFAULT: u8 = 66;

/// Trailing window of the exhalation spent in HOLD_EXHALATION [1/100 s].
pub const HOLD_EXHALATION_CENTISEC_DEFAULT: u16 = 50;

// ─── Safeguard debounce [ticks] ─────────────────────────────────────

pub const PEAK_DEBOUNCE_TICKS_DEFAULT: u16 = 3;
pub const PEAK_CLEAR_TICKS_DEFAULT: u16 = 5;
pub const PLATEAU_DEBOUNCE_TICKS_DEFAULT: u16 = 5;
pub const PLATEAU_CLEAR_TICKS_DEFAULT: u16 = 5;
pub const PEEP_HOLD_DEBOUNCE_TICKS_DEFAULT: u16 = 5;
pub const PEEP_HOLD_CLEAR_TICKS_DEFAULT: u16 = 10;
pub const PEEP_MAINTAIN_DEBOUNCE_TICKS_DEFAULT: u16 = 10;
pub const PEEP_MAINTAIN_CLEAR_TICKS_DEFAULT: u16 = 10;

static_assertions::const_assert!(CYCLES_PER_MINUTE_MIN > 0);
static_assertions::const_assert!(CYCLES_PER_MINUTE_MAX <= CENTISEC_PER_MINUTE);
static_assertions::const_assert!(VALVE_CLOSED < VALVE_FULLY_OPEN);
