//! Ventilator Common Library
//!
//! Shared constants, types and configuration loading for the ventilator
//! workspace crates.
//!
//! # Module Structure
//!
//! - [`consts`] - Units, default setpoints and absolute safe bounds
//! - [`config`] - TOML configuration loading traits and types
//! - [`ventilation`] - Phase enums, setpoints, safeguard flags, unit configuration
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod consts;
pub mod prelude;
pub mod ventilation;
