// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Device datastore
//!
//! This module holds the in-memory register tables of the simulated Modbus
//! slave. The datastore is the single synchronization point of the
//! application: the Modbus server, the value generator and the control
//! surface all receive a clone of the same [`DeviceDatastore`] handle.
//!
//! ## Register Classes
//!
//! | Class | Width | Network access |
//! |-------|-------|----------------|
//! | Discrete Input | 1 bit | read-only |
//! | Coil | 1 bit | read-write |
//! | Holding Register | 16 bits | read-write |
//! | Input Register | 16 bits | read-only |
//!
//! Internal actors ([`Access::Internal`]) may write every class, which is how
//! field inputs are simulated.
//!
//! ## Usage
//!
//! ```
//! use rust_modbus_simulator::datastore::{Access, DeviceDatastore, RegisterClass};
//!
//! let store = DeviceDatastore::new(100);
//! store.write(RegisterClass::Coil, 30, &[1], Access::Network).unwrap();
//! assert_eq!(store.read(RegisterClass::Coil, 30, 1).unwrap(), vec![1]);
//! ```

pub mod device_datastore;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use device_datastore::DeviceDatastore;

/// The four Modbus data tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegisterClass {
    DiscreteInput,
    Coil,
    HoldingRegister,
    InputRegister,
}

impl RegisterClass {
    /// All classes, in Modbus table order.
    pub const ALL: [RegisterClass; 4] = [
        RegisterClass::DiscreteInput,
        RegisterClass::Coil,
        RegisterClass::HoldingRegister,
        RegisterClass::InputRegister,
    ];

    /// `true` for the single-bit classes (coils and discrete inputs).
    pub fn is_bit(self) -> bool {
        matches!(self, RegisterClass::DiscreteInput | RegisterClass::Coil)
    }

    /// `true` if Modbus clients are allowed to write this class.
    pub fn is_network_writable(self) -> bool {
        matches!(self, RegisterClass::Coil | RegisterClass::HoldingRegister)
    }
}

impl fmt::Display for RegisterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegisterClass::DiscreteInput => "discrete input",
            RegisterClass::Coil => "coil",
            RegisterClass::HoldingRegister => "holding register",
            RegisterClass::InputRegister => "input register",
        };
        f.write_str(name)
    }
}

/// Who is performing a write.
///
/// Network clients are bound by Modbus semantics; the simulation itself is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// A Modbus client connected over TCP
    Network,
    /// The value generator, the control surface or any other in-process actor
    Internal,
}

/// Errors returned by datastore accessors.
///
/// A failed call never modifies the datastore.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DatastoreError {
    #[error("Invalid address: {count} {class}(s) at {address} exceed table length {len}")]
    InvalidAddress {
        class: RegisterClass,
        address: u16,
        count: usize,
        len: usize,
    },

    #[error("The {class} table is read-only for network clients")]
    ReadOnlyViolation { class: RegisterClass },

    #[error("Value {value} at {class} {address} is not a valid bit value")]
    InvalidValue {
        class: RegisterClass,
        address: u16,
        value: u16,
    },
}
