// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Value generator configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the simulated process value.
///
/// The generator increments one holding register every `interval_ms`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeneratorConfig {
    /// Flag to enable or disable the generator task.
    pub enabled: bool,

    /// Holding register address incremented by the generator.
    pub register: u16,

    /// Time interval in milliseconds between increments.
    ///
    /// Must be greater than zero.
    pub interval_ms: u64,
}

impl GeneratorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            register: 0,
            interval_ms: 1000,
        }
    }
}
