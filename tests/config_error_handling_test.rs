// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use rust_modbus_simulator::config::{self, Config};
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .try_init();
    });
}

/// Write `yaml`, expect loading to fail and a valid sample file to appear.
fn assert_rejected_with_sample(yaml: &str) -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());
    Ok(())
}

#[test]
fn test_schema_type_error_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
modbus:
  enabled: "true"
  port: "not-an-integer"
  address: 12345
"#,
    )
}

#[test]
fn test_port_out_of_range_creates_sample_file() -> Result<()> {
    assert_rejected_with_sample(
        r#"
modbus:
  enabled: true
  port: 99999
  address: "127.0.0.1"
"#,
    )
}

#[test]
fn test_unknown_section_is_rejected() -> Result<()> {
    assert_rejected_with_sample(
        r#"
visualization:
  port: 8080
"#,
    )
}

#[test]
fn test_malformed_signal_address_is_rejected() -> Result<()> {
    assert_rejected_with_sample(
        r#"
signals:
  coils:
    - name: RUN_BARTEC
      address: [3, 0, 1]
"#,
    )
}

#[test]
fn test_datastore_below_minimum_size_is_rejected() -> Result<()> {
    assert_rejected_with_sample(
        r#"
datastore:
  size: 50
"#,
    )
}

#[test]
fn test_signal_outside_datastore_fails_specific_rules() -> Result<()> {
    // Schema-valid, but coil [12, 0] does not fit a table of 100 entries
    assert_rejected_with_sample(
        r#"
signals:
  coils:
    - name: FAR_AWAY
      address: [12, 0]
"#,
    )
}

#[test]
fn test_generator_outside_datastore_fails_specific_rules() -> Result<()> {
    assert_rejected_with_sample(
        r#"
generator:
  enabled: true
  register: 100
  interval_ms: 1000
"#,
    )
}

#[test]
fn test_validate_missing_file_creates_default() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("nested").join("config.yaml");
    fs::create_dir_all(config_path.parent().unwrap())?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config, Config::default());
    assert!(config_path.exists());
    config::validate_specific_rules(&config)?;
    Ok(())
}

#[test]
fn test_config_schema_output() -> Result<()> {
    // Output goes to stdout; only check that the embedded schema is usable
    config::output_config_schema()?;
    let schema: serde_json::Value = serde_json::from_str(config::CONFIG_SCHEMA)?;
    assert!(schema["properties"]["modbus"].is_object());
    Ok(())
}
