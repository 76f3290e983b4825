//! # Ventilator Pressure Control Unit
//!
//! Real-time pressure control core of a volume-less ventilator. Every tick
//! (10 ms by default) it reads the circuit pressure, advances the respiratory
//! phase state machine, computes the nominal blower/patient valve apertures
//! and lets four debounced safeguards override them before they are applied.
//!
//! ## Layers
//!
//! 1. **Timing / phase**: `CycleTiming`, `PhaseMachine`
//! 2. **Setpoints**: operator intent (`SetpointStore`), committed once per cycle
//! 3. **Commands**: nominal per-sub-phase valve targets
//! 4. **Safeguards**: peak, plateau, PEEP hold, PEEP maintain
//! 5. **Controller**: `PressureController` tying the above to two actuators
//! 6. **Runner**: `CycleRunner` pacing ticks and starting cycles
//!
//! ## No Allocation in the Tick
//!
//! All state is created at construction. `update_pressure` and `compute` do
//! not allocate, block or fail.

pub mod actuator;
pub mod command;
pub mod config;
pub mod controller;
pub mod cycle;
pub mod phase;
pub mod pressure;
pub mod safety;
pub mod setpoints;
pub mod sim;
pub mod timing;
