//! Configuration file loading, end to end.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;
use vent_common::prelude::*;
use vent_control_unit::actuator::SimulatedActuator;
use vent_control_unit::config::load_config;
use vent_control_unit::controller::PressureController;

fn write_toml(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{content}").unwrap();
    file
}

#[test]
fn shipped_config_matches_factory_defaults() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/ventilator.toml");
    let loaded = load_config(&path).unwrap();
    assert_eq!(loaded.ventilator, VentilatorConfig::default());
    assert_eq!(loaded.source.as_deref(), Some(path.as_path()));
}

#[test]
fn custom_ranges_drive_the_controller() {
    let file = write_toml(
        r#"
[setpoints.cycles_per_minute]
min = 10
max = 30
step = 2
default = 12

[setpoints.max_peak]
min = 20
max = 50
default = 40
"#,
    );
    let loaded = load_config(file.path()).unwrap();
    let c = PressureController::new(
        &loaded.ventilator,
        SimulatedActuator::new(),
        SimulatedActuator::new(),
    )
    .unwrap();

    assert_eq!(c.cycles_per_minute(), 12);
    assert_eq!(c.centi_sec_per_cycle(), 500);
    assert_eq!(c.max_peak_pressure(), 40);

    assert_eq!(c.on_cycle_minus(), 10);
    assert_eq!(c.on_cycle_minus(), 10);
    for _ in 0..20 {
        c.on_pression_crete_plus();
    }
    assert_eq!(c.commanded_max_peak_pressure(), 50);
}

#[test]
fn invalid_file_is_rejected_with_field_name() {
    let file = write_toml(
        r#"
[phases]
inspiration_percent = 0
"#,
    );
    match load_config(file.path()) {
        Err(ConfigError::ValidationError(msg)) => assert!(msg.contains("inspiration_percent")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn unknown_log_level_is_a_parse_error() {
    let file = write_toml(
        r#"
[shared]
log_level = "loud"
"#,
    );
    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::ParseError(_))
    ));
}
