// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Control surface configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings of the operator control surface.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ControlConfig {
    /// Time in milliseconds between two refreshes of the rendered panel.
    pub refresh_interval_ms: u64,

    /// Number of most recent log entries shown by the panel.
    pub log_window: usize,
}

impl ControlConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 1000,
            log_window: 10,
        }
    }
}
