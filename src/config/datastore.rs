// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Datastore sizing and power-on values

use serde::{Deserialize, Serialize};

/// Size of the register tables and their values at startup.
///
/// The tables are never resized while the device runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatastoreConfig {
    /// Number of entries in each of the four tables.
    pub size: usize,

    /// Values written from address 0 upwards before any task starts.
    #[serde(default)]
    pub initial: InitialValues,
}

impl Default for DatastoreConfig {
    fn default() -> Self {
        Self {
            size: 100,
            initial: InitialValues::default(),
        }
    }
}

/// Per-class power-on values. Missing entries start at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitialValues {
    #[serde(default)]
    pub discrete_inputs: Vec<u16>,
    #[serde(default)]
    pub coils: Vec<u16>,
    #[serde(default)]
    pub holding_registers: Vec<u16>,
    #[serde(default)]
    pub input_registers: Vec<u16>,
}
