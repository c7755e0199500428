// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Symbolic signal addressing
//!
//! The control surface never deals with raw Modbus addresses: it refers to
//! signals such as `RUN_BARTEC` or `ULTRA_LEFT_SENSOR`, and the [`AddressMap`]
//! turns those names into a register class and a flat address.
//!
//! ## Grouped Addresses
//!
//! Coils are documented as `%IXg.o` (group `g`, offset `o`). On the wire
//! they live at the flat address `g * 10 + o`, whatever the table length:
//!
//! | Notation | Flat address |
//! |----------|--------------|
//! | `%IX0.0` | 0 |
//! | `%IX3.0` | 30 |
//! | `%IX8.0` | 80 |
//!
//! This is a naming convention, not a two dimensional table; changing the base
//! would move every coil on the wire.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SignalsConfig;
use crate::datastore::RegisterClass;

/// Number of flat addresses reserved for one coil group.
pub const GROUP_SIZE: u16 = 10;

/// Address of a signal as declared in the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SignalAddress {
    /// A plain table offset
    Flat(u16),
    /// `[group, offset]`, composed as `group * 10 + offset`
    Grouped([u16; 2]),
}

impl SignalAddress {
    /// Flat table address, or `None` if the composition leaves the 16-bit range.
    pub fn compose(self) -> Option<u16> {
        match self {
            SignalAddress::Flat(address) => Some(address),
            SignalAddress::Grouped([group, offset]) => group
                .checked_mul(GROUP_SIZE)
                .and_then(|base| base.checked_add(offset)),
        }
    }
}

/// Errors raised while building or querying an [`AddressMap`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressMapError {
    #[error("Unknown signal '{0}'")]
    UnknownSignal(String),

    #[error("Signal '{0}' is declared more than once")]
    DuplicateSignal(String),

    #[error("Signal '{name}' resolves to {class} address {address:?} outside table length {len}")]
    InvalidAddress {
        name: String,
        class: RegisterClass,
        address: SignalAddress,
        len: usize,
    },
}

/// A symbolic name bound to one register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalBinding {
    pub name: String,
    pub class: RegisterClass,
    pub address: u16,
}

/// Immutable name → (class, address) table.
///
/// Lookups are by name; enumeration keeps declaration order so that a front
/// end lists signals the way the plant documentation does.
#[derive(Debug, Clone, Default)]
pub struct AddressMap {
    bindings: Vec<SignalBinding>,
    index: HashMap<String, usize>,
}

impl AddressMap {
    /// Build the map from `(name, class, address)` declarations.
    ///
    /// Every composed address must fall inside `[0, table_len)`. Two names may
    /// share an address, but a name may only be declared once.
    pub fn new<I, S>(declarations: I, table_len: usize) -> Result<Self, AddressMapError>
    where
        I: IntoIterator<Item = (S, RegisterClass, SignalAddress)>,
        S: Into<String>,
    {
        let mut map = Self::default();
        for (name, class, declared) in declarations {
            let name = name.into();
            let address = declared
                .compose()
                .filter(|&a| usize::from(a) < table_len)
                .ok_or_else(|| AddressMapError::InvalidAddress {
                    name: name.clone(),
                    class,
                    address: declared,
                    len: table_len,
                })?;
            if map.index.contains_key(&name) {
                return Err(AddressMapError::DuplicateSignal(name));
            }
            map.index.insert(name.clone(), map.bindings.len());
            map.bindings.push(SignalBinding {
                name,
                class,
                address,
            });
        }
        Ok(map)
    }

    /// Build the map from the `signals` configuration section.
    ///
    /// `coils` bind to [`RegisterClass::Coil`], `inputs` to
    /// [`RegisterClass::DiscreteInput`].
    pub fn from_config(signals: &SignalsConfig, table_len: usize) -> Result<Self, AddressMapError> {
        let coils = signals
            .coils
            .iter()
            .map(|s| (s.name.as_str(), RegisterClass::Coil, s.address));
        let inputs = signals
            .inputs
            .iter()
            .map(|s| (s.name.as_str(), RegisterClass::DiscreteInput, s.address));
        Self::new(coils.chain(inputs), table_len)
    }

    /// Resolve a signal name to its register class and flat address.
    pub fn resolve(&self, name: &str) -> Result<(RegisterClass, u16), AddressMapError> {
        self.binding(name).map(|b| (b.class, b.address))
    }

    pub fn binding(&self, name: &str) -> Result<&SignalBinding, AddressMapError> {
        self.index
            .get(name)
            .map(|&i| &self.bindings[i])
            .ok_or_else(|| AddressMapError::UnknownSignal(name.to_string()))
    }

    /// Names bound to `class`, in declaration order.
    pub fn signals(&self, class: RegisterClass) -> Vec<&str> {
        self.bindings
            .iter()
            .filter(|b| b.class == class)
            .map(|b| b.name.as_str())
            .collect()
    }

    /// All bindings, in declaration order.
    pub fn bindings(&self) -> impl Iterator<Item = &SignalBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
