//! Pressure control shared types.
//!
//! Everything the control unit exchanges with its collaborators (input path,
//! display, alarms): phase enums, setpoints, safeguard flags and configuration.

pub mod alarm;
pub mod config;
pub mod phase;
pub mod setpoints;
