// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};
use crate::address_map::AddressMap;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./rust_modbus_simulator --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Smallest table a device configuration may declare.
pub const MIN_DATASTORE_SIZE: usize = 100;

/// Validates the configuration against rules that the JSON schema cannot express.
///
/// # Validation Rules
///
/// - **Port Range**: the Modbus port is within 1-65534
/// - **Table Size**: every table holds at least 100 entries and fits the 16-bit address space
/// - **Signals**: every binding resolves inside the tables and names are unique
/// - **Generator**: the target register exists and the interval is not zero
/// - **Initial Values**: no list is longer than the tables
/// - **IP Address Format**: an unusual address only produces a warning
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if config.modbus.port < 1 || config.modbus.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.modbus.port);
    }

    if !is_valid_ip_address(&config.modbus.address) {
        warn!(
            "Potentially invalid Modbus address format: {}",
            config.modbus.address
        );
    }

    let size = config.datastore.size;
    if !(MIN_DATASTORE_SIZE..=usize::from(u16::MAX) + 1).contains(&size) {
        anyhow::bail!("Invalid datastore size: {}", size);
    }

    let initial = &config.datastore.initial;
    for (name, values) in [
        ("discrete_inputs", &initial.discrete_inputs),
        ("coils", &initial.coils),
        ("holding_registers", &initial.holding_registers),
        ("input_registers", &initial.input_registers),
    ] {
        if values.len() > size {
            anyhow::bail!(
                "Initial {} has {} values but the tables hold {}",
                name,
                values.len(),
                size
            );
        }
    }

    AddressMap::from_config(&config.signals, size).context("Invalid signal bindings")?;

    if usize::from(config.generator.register) >= size {
        anyhow::bail!(
            "Generator register {} is outside the datastore (size {})",
            config.generator.register,
            size
        );
    }
    if config.generator.interval_ms == 0 {
        anyhow::bail!("Generator interval must be greater than zero");
    }
    if config.control.refresh_interval_ms == 0 {
        anyhow::bail!("Control refresh interval must be greater than zero");
    }

    Ok(())
}
