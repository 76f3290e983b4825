//! Valve actuator capability and a deterministic simulated valve.
//!
//! The control unit only needs two operations from a valve driver: command a
//! target aperture and read back where the valve currently is. Hardware
//! bring-up is delegated to [`Actuator::setup`], called once before the loop.
//!
//! # Timing Contracts
//!
//! | Operation | RT Constraint |
//! |-----------|---------------|
//! | `setup()` | None (pre-RT) |
//! | `set_target_aperture()` | **HARD**, non-blocking |
//! | `current_aperture()` | **HARD**, non-blocking |

use thiserror::Error;
use vent_common::consts::{Aperture, VALVE_CLOSED};

/// Valve bring-up failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActuatorError {
    /// Driver initialization failed.
    #[error("actuator initialization failed: {0}")]
    InitFailed(String),
}

/// A controllable valve.
pub trait Actuator {
    /// One-time initialization before the control loop starts.
    fn setup(&mut self) -> Result<(), ActuatorError> {
        Ok(())
    }

    /// Command the aperture the valve should move to.
    fn set_target_aperture(&mut self, aperture: Aperture);

    /// Last commanded target.
    fn target_aperture(&self) -> Aperture;

    /// Aperture the valve has actually reached.
    fn current_aperture(&self) -> Aperture;
}

/// Simulated valve that follows its target with an optional slew limit.
///
/// With no slew limit the valve reaches every target instantly, so tests can
/// read back exactly what was commanded. With a limit, each
/// [`SimulatedActuator::step`] moves at most `slew_per_tick` toward the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedActuator {
    target: Aperture,
    current: Aperture,
    slew_per_tick: Option<Aperture>,
    initialized: bool,
}

impl SimulatedActuator {
    /// Instant-response valve starting closed.
    pub const fn new() -> Self {
        Self {
            target: VALVE_CLOSED,
            current: VALVE_CLOSED,
            slew_per_tick: None,
            initialized: false,
        }
    }

    /// Rate-limited valve starting closed.
    pub const fn with_slew(slew_per_tick: Aperture) -> Self {
        Self {
            target: VALVE_CLOSED,
            current: VALVE_CLOSED,
            slew_per_tick: Some(slew_per_tick),
            initialized: false,
        }
    }

    /// Whether [`Actuator::setup`] has run.
    #[inline]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Advance the valve by one tick toward its target.
    pub fn step(&mut self) {
        self.current = match self.slew_per_tick {
            None => self.target,
            Some(slew) if self.current < self.target => {
                self.current.saturating_add(slew).min(self.target)
            }
            Some(slew) => self.current.saturating_sub(slew).max(self.target),
        };
    }
}

impl Default for SimulatedActuator {
    fn default() -> Self {
        Self::new()
    }
}

impl Actuator for SimulatedActuator {
    fn setup(&mut self) -> Result<(), ActuatorError> {
        self.target = VALVE_CLOSED;
        self.current = VALVE_CLOSED;
        self.initialized = true;
        Ok(())
    }

    fn set_target_aperture(&mut self, aperture: Aperture) {
        self.target = aperture;
        // The simulated valve moves as soon as it is commanded.
        self.step();
    }

    #[inline]
    fn target_aperture(&self) -> Aperture {
        self.target
    }

    #[inline]
    fn current_aperture(&self) -> Aperture {
        self.current
    }
}
