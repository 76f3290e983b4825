//! Pressure controller: the per-tick brain of the ventilator.
//!
//! Owns both valves and every piece of per-cycle state. The driving loop calls,
//! once per control period:
//!
//! 1. [`PressureController::update_pressure`] with the fresh sensor sample,
//! 2. [`PressureController::compute`] with the centiseconds elapsed since the
//!    cycle started,
//!
//! and [`PressureController::init_respiratory_cycle`] whenever the elapsed
//! time reaches [`PressureController::centi_sec_per_cycle`].
//!
//! ## Tick Sequence
//!
//! ```text
//! phase update → sub-phase action (captures) → nominal command → safeguards → valves
//! ```
//!
//! Operator adjustments go through a [`SetpointStore`] handle and only reach
//! the running breath at the next cycle start.
//!
//! The per-tick path never fails and never allocates. The only fallible steps
//! are actuator bring-up ([`PressureController::setup`]) and construction,
//! which rejects an invalid configuration or a power-on rate outside the
//! configured range.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, trace, warn};
use vent_common::config::ConfigError;
use vent_common::consts::{Aperture, CentiSec, Pressure};
use vent_common::ventilation::alarm::SafeguardFlags;
use vent_common::ventilation::config::{SetpointRange, ValveConfig, VentilatorConfig};
use vent_common::ventilation::phase::{CyclePhase, CycleSubPhase};
use vent_common::ventilation::setpoints::{ActiveParameters, CommandedSetpoints, CycleReadings};

use crate::actuator::{Actuator, ActuatorError};
use crate::command::{ValveCommand, nominal_command};
use crate::phase::PhaseMachine;
use crate::pressure::PressureTracker;
use crate::safety::debounce::Tick;
use crate::safety::safeguards::{SafeguardEngine, TickInputs};
use crate::setpoints::SetpointStore;
use crate::timing::{CycleTiming, TimingError};

/// Errors building a [`PressureController`].
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Timing(#[from] TimingError),
}

/// Ventilator pressure controller over a blower valve `B` and a patient valve `P`.
pub struct PressureController<B: Actuator, P: Actuator> {
    setpoints: SetpointStore,
    active: ActiveParameters,
    timing: CycleTiming,
    /// Rates the timing accepts, from the controller's configuration.
    rate_range: SetpointRange,
    phase: PhaseMachine,
    pressure: PressureTracker,
    safeguards: SafeguardEngine,
    valves: ValveConfig,
    blower: B,
    patient: P,
    last_command: ValveCommand,
    /// Started cycles. Wraps at `u32::MAX` (≈ 400 years at 35 cycles/min).
    cycle_count: u32,
    /// Compute invocations, used as the safeguard time base.
    tick: Tick,
}

impl<B: Actuator, P: Actuator> PressureController<B, P> {
    /// Controller with the configured power-on setpoints.
    pub fn new(config: &VentilatorConfig, blower: B, patient: P) -> Result<Self, ControllerError> {
        config.validate().map_err(ConfigError::ValidationError)?;
        Self::build(config, SetpointStore::new(config.setpoints.clone()), blower, patient)
    }

    /// Controller reading its setpoints from an existing store.
    ///
    /// The store's ranges bound the operator adjustments. The breathing rate
    /// committed at cycle start must also lie in `config`'s rate range.
    pub fn with_setpoints(
        config: &VentilatorConfig,
        setpoints: SetpointStore,
        blower: B,
        patient: P,
    ) -> Result<Self, ControllerError> {
        config.validate().map_err(ConfigError::ValidationError)?;
        Self::build(config, setpoints, blower, patient)
    }

    fn build(
        config: &VentilatorConfig,
        setpoints: SetpointStore,
        blower: B,
        patient: P,
    ) -> Result<Self, ControllerError> {
        let rate_range = config.setpoints.cycles_per_minute;
        let active = ActiveParameters::from(setpoints.snapshot());
        let timing = CycleTiming::for_rate(active.cycles_per_minute, &rate_range)?;
        Ok(Self {
            setpoints,
            active,
            timing,
            rate_range,
            phase: PhaseMachine::new(config.phases),
            pressure: PressureTracker::new(),
            safeguards: SafeguardEngine::new(&config.safeguards, config.valves),
            valves: config.valves,
            blower,
            patient,
            last_command: ValveCommand::closed(&config.valves),
            cycle_count: 0,
            tick: 0,
        })
    }

    /// One-time valve bring-up. Must run before the first tick.
    pub fn setup(&mut self) -> Result<(), ActuatorError> {
        self.blower.setup()?;
        self.patient.setup()?;
        debug!("valves initialized");
        Ok(())
    }

    /// Start a new breath.
    ///
    /// Commits the operator setpoints, recomputes the timing, archives and
    /// resets the pressure captures, clears every safeguard and goes back to
    /// INHALATION/INSPIRATION.
    pub fn init_respiratory_cycle(&mut self) {
        let previous_rate = self.active.cycles_per_minute;
        self.active = ActiveParameters::from(self.setpoints.snapshot());

        if let Err(e) = self.timing.recompute(self.active.cycles_per_minute, &self.rate_range) {
            warn!("timing rejected, keeping {previous_rate} cycles/min: {e}");
            self.active.cycles_per_minute = previous_rate;
        }

        self.pressure.start_cycle();
        self.safeguards.reset();
        self.phase.reset();
        self.cycle_count = self.cycle_count.wrapping_add(1);

        debug!(
            cycle = self.cycle_count,
            cycles_per_minute = self.active.cycles_per_minute,
            min_peep = self.active.min_peep,
            max_plateau = self.active.max_plateau_pressure,
            max_peak = self.active.max_peak_pressure,
            centisec_per_cycle = self.timing.centisec_per_cycle(),
            "cycle started"
        );
    }

    /// Ingest one sensor sample. Call before [`Self::compute`] for the same tick.
    #[inline]
    pub fn update_pressure(&mut self, measured: Pressure) {
        self.pressure.ingest(measured);
    }

    /// Run one control tick at `elapsed` centiseconds into the cycle.
    pub fn compute(&mut self, elapsed: CentiSec) {
        let now = self.tick;
        self.tick = self.tick.wrapping_add(1);

        let sub_phase = self.phase.update(elapsed, &self.timing);
        if self.phase.just_entered() {
            trace!(elapsed, ?sub_phase, "sub-phase entered");
        }

        match sub_phase {
            CycleSubPhase::Inspiration => self.pressure.track_peak(),
            CycleSubPhase::Plateau => self.pressure.capture_plateau(),
            CycleSubPhase::Exhalation => {}
            CycleSubPhase::HoldExhalation => self.pressure.capture_peep(),
        }

        let nominal = nominal_command(sub_phase, &self.active, &self.valves);
        let inputs = TickInputs {
            now,
            pressure: self.pressure.latest(),
            sub_phase,
            params: &self.active,
            patient_aperture: self.patient.current_aperture(),
        };
        let command = self.safeguards.apply(nominal, &inputs);
        self.execute_commands(command);
    }

    /// Commit both targets. The only outward side effect of a tick.
    fn execute_commands(&mut self, command: ValveCommand) {
        self.blower.set_target_aperture(command.blower);
        self.patient.set_target_aperture(command.patient);
        self.last_command = command;
    }

    // ── Operator controls ──

    pub fn on_cycle_minus(&self) -> u16 {
        self.setpoints.on_cycle_minus()
    }

    pub fn on_cycle_plus(&self) -> u16 {
        self.setpoints.on_cycle_plus()
    }

    pub fn on_pression_pep_minus(&self) -> u16 {
        self.setpoints.on_pression_pep_minus()
    }

    pub fn on_pression_pep_plus(&self) -> u16 {
        self.setpoints.on_pression_pep_plus()
    }

    pub fn on_pression_plateau_minus(&self) -> u16 {
        self.setpoints.on_pression_plateau_minus()
    }

    pub fn on_pression_plateau_plus(&self) -> u16 {
        self.setpoints.on_pression_plateau_plus()
    }

    pub fn on_pression_crete_minus(&self) -> u16 {
        self.setpoints.on_pression_crete_minus()
    }

    pub fn on_pression_crete_plus(&self) -> u16 {
        self.setpoints.on_pression_crete_plus()
    }

    /// Handle for an input path running in another context.
    pub fn setpoints_handle(&self) -> SetpointStore {
        self.setpoints.clone()
    }

    // ── Commanded values ──

    pub fn commanded(&self) -> CommandedSetpoints {
        self.setpoints.snapshot()
    }

    pub fn commanded_cycles_per_minute(&self) -> u16 {
        self.commanded().cycles_per_minute
    }

    pub fn commanded_min_peep(&self) -> u16 {
        self.commanded().min_peep
    }

    pub fn commanded_max_plateau_pressure(&self) -> u16 {
        self.commanded().max_plateau_pressure
    }

    pub fn commanded_max_peak_pressure(&self) -> u16 {
        self.commanded().max_peak_pressure
    }

    // ── Active values ──

    #[inline]
    pub const fn active(&self) -> &ActiveParameters {
        &self.active
    }

    #[inline]
    pub const fn cycles_per_minute(&self) -> u16 {
        self.active.cycles_per_minute
    }

    #[inline]
    pub const fn min_peep(&self) -> u16 {
        self.active.min_peep
    }

    #[inline]
    pub const fn max_plateau_pressure(&self) -> u16 {
        self.active.max_plateau_pressure
    }

    #[inline]
    pub const fn max_peak_pressure(&self) -> u16 {
        self.active.max_peak_pressure
    }

    #[inline]
    pub const fn aperture(&self) -> Aperture {
        self.active.aperture
    }

    #[inline]
    pub const fn centi_sec_per_cycle(&self) -> CentiSec {
        self.timing.centisec_per_cycle()
    }

    #[inline]
    pub const fn centi_sec_per_inhalation(&self) -> CentiSec {
        self.timing.centisec_per_inhalation()
    }

    #[inline]
    pub const fn centi_sec_per_exhalation(&self) -> CentiSec {
        self.timing.centisec_per_exhalation()
    }

    // ── Pressures ──

    /// Latest measured pressure.
    #[inline]
    pub const fn pressure(&self) -> Pressure {
        self.pressure.latest()
    }

    #[inline]
    pub const fn peak_pressure(&self) -> Pressure {
        self.pressure.current().peak
    }

    #[inline]
    pub const fn plateau_pressure(&self) -> Pressure {
        self.pressure.current().plateau
    }

    #[inline]
    pub const fn peep(&self) -> Pressure {
        self.pressure.current().peep
    }

    /// Captures of the last completed breath.
    #[inline]
    pub const fn previous_cycle(&self) -> &CycleReadings {
        self.pressure.previous()
    }

    // ── State ──

    #[inline]
    pub const fn phase(&self) -> CyclePhase {
        self.phase.phase()
    }

    #[inline]
    pub const fn sub_phase(&self) -> CycleSubPhase {
        self.phase.sub_phase()
    }

    #[inline]
    pub const fn cycle_count(&self) -> u32 {
        self.cycle_count
    }

    #[inline]
    pub fn safeguard_flags(&self) -> SafeguardFlags {
        self.safeguards.flags()
    }

    /// Command applied on the last tick.
    #[inline]
    pub const fn last_command(&self) -> ValveCommand {
        self.last_command
    }

    #[inline]
    pub const fn blower(&self) -> &B {
        &self.blower
    }

    #[inline]
    pub const fn patient(&self) -> &P {
        &self.patient
    }

    /// Mutable blower access, e.g. to advance a simulated valve.
    #[inline]
    pub fn blower_mut(&mut self) -> &mut B {
        &mut self.blower
    }

    #[inline]
    pub fn patient_mut(&mut self) -> &mut P {
        &mut self.patient
    }

    /// All accessor values in one serializable record.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            cycle_count: self.cycle_count,
            phase: self.phase(),
            sub_phase: self.sub_phase(),
            commanded: self.commanded(),
            active: self.active,
            centi_sec_per_cycle: self.centi_sec_per_cycle(),
            centi_sec_per_inhalation: self.centi_sec_per_inhalation(),
            centi_sec_per_exhalation: self.centi_sec_per_exhalation(),
            pressure: self.pressure(),
            current_cycle: *self.pressure.current(),
            previous_cycle: *self.pressure.previous(),
            command: self.last_command,
            blower_aperture: self.blower.current_aperture(),
            patient_aperture: self.patient.current_aperture(),
            safeguards: self.safeguard_flags(),
        }
    }
}

/// Telemetry record of a [`PressureController`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControllerSnapshot {
    pub cycle_count: u32,
    pub phase: CyclePhase,
    pub sub_phase: CycleSubPhase,
    pub commanded: CommandedSetpoints,
    pub active: ActiveParameters,
    pub centi_sec_per_cycle: CentiSec,
    pub centi_sec_per_inhalation: CentiSec,
    pub centi_sec_per_exhalation: CentiSec,
    pub pressure: Pressure,
    pub current_cycle: CycleReadings,
    pub previous_cycle: CycleReadings,
    pub command: ValveCommand,
    pub blower_aperture: Aperture,
    pub patient_aperture: Aperture,
    pub safeguards: SafeguardFlags,
}
