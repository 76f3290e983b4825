//! TOML configuration loader with validation.
//!
//! Parses a [`VentilatorConfig`] (every field defaulted) and checks setpoint
//! ranges, valve limits, phase windows and debounce laws before the control
//! loop ever sees them.

use std::path::{Path, PathBuf};

use tracing::info;
use vent_common::config::{ConfigError, ConfigLoader};
use vent_common::ventilation::config::VentilatorConfig;

// ─── Loaded Config Bundle ───────────────────────────────────────────

/// Validated configuration, ready for runtime use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub ventilator: VentilatorConfig,
    /// File it came from; `None` for factory defaults or in-memory sources.
    pub source: Option<PathBuf>,
}

impl LoadedConfig {
    /// Factory configuration.
    pub fn defaults() -> Self {
        Self {
            ventilator: VentilatorConfig::default(),
            source: None,
        }
    }
}

// ─── Loading Functions ──────────────────────────────────────────────

/// Load and validate the configuration file at `path`.
pub fn load_config(path: &Path) -> Result<LoadedConfig, ConfigError> {
    let ventilator = VentilatorConfig::load(path)?;
    validate(&ventilator)?;
    info!("configuration loaded from {}", path.display());
    Ok(LoadedConfig {
        ventilator,
        source: Some(path.to_path_buf()),
    })
}

/// Load config from a TOML string (for testing).
pub fn load_config_from_str(content: &str) -> Result<LoadedConfig, ConfigError> {
    let ventilator = VentilatorConfig::parse(content)?;
    validate(&ventilator)?;
    Ok(LoadedConfig {
        ventilator,
        source: None,
    })
}

fn validate(config: &VentilatorConfig) -> Result<(), ConfigError> {
    config.shared.validate()?;
    config.validate().map_err(ConfigError::ValidationError)
}
