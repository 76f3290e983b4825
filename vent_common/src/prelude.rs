//! Common re-exports.
//!
//! ```rust
//! use vent_common::prelude::*;
//! ```

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, LogLevel, SharedConfig};
pub use crate::ventilation::config::{
    ControlLoopConfig, DebounceConfig, PhaseConfig, SafeguardsConfig, SetpointRange,
    SetpointsConfig, ValveConfig, VentilatorConfig,
};

// ─── Units ──────────────────────────────────────────────────────────
pub use crate::consts::{Aperture, CentiSec, Pressure, CENTISEC_PER_MINUTE};

// ─── Ventilation ────────────────────────────────────────────────────
pub use crate::ventilation::alarm::SafeguardFlags;
pub use crate::ventilation::phase::{CyclePhase, CycleSubPhase};
pub use crate::ventilation::setpoints::{ActiveParameters, CommandedSetpoints, CycleReadings};
