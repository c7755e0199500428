// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Symbolic signal bindings
//!
//! Coils are usually declared with a `[group, offset]` pair (the `%IXg.o`
//! notation of the plant documentation), discrete inputs with a flat address.
//! Both forms are accepted in either list:
//!
//! ```yaml
//! signals:
//!   coils:
//!     - name: RUN_BARTEC
//!       address: [3, 0]
//!   inputs:
//!     - name: ULTRA_LEFT_SENSOR
//!       address: 0
//! ```

use serde::{Deserialize, Serialize};

use crate::address_map::SignalAddress;

/// One named signal as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalConfig {
    pub name: String,
    pub address: SignalAddress,
}

impl SignalConfig {
    fn grouped(name: &str, group: u16, offset: u16) -> Self {
        Self {
            name: name.to_string(),
            address: SignalAddress::Grouped([group, offset]),
        }
    }

    fn flat(name: &str, address: u16) -> Self {
        Self {
            name: name.to_string(),
            address: SignalAddress::Flat(address),
        }
    }
}

/// Coil and discrete input bindings, in display order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default)]
    pub coils: Vec<SignalConfig>,
    #[serde(default)]
    pub inputs: Vec<SignalConfig>,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            coils: vec![
                SignalConfig::grouped("UW_VALVE_POSITION", 0, 0),
                SignalConfig::grouped("OW_VALVE_POSITION", 1, 0),
                SignalConfig::grouped("UW_PLATF_VALVE_POSITION", 2, 0),
                SignalConfig::grouped("RUN_BARTEC", 3, 0),
                SignalConfig::grouped("DOW_PLATFORM", 4, 0),
                SignalConfig::grouped("UP_PLATFORM", 5, 0),
                SignalConfig::grouped("DEADMAN_INTERLOCK", 6, 0),
                SignalConfig::grouped("DEADMAN_SWITCH", 7, 0),
                SignalConfig::grouped("DEADMAN_TIMER", 8, 0),
            ],
            inputs: vec![
                SignalConfig::flat("ULTRA_LEFT_SENSOR", 0),
                SignalConfig::flat("ULTRA_RIGHT_SENSOR", 1),
                SignalConfig::flat("MAX_LIMIT_PLATF", 2),
            ],
        }
    }
}
