// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared register tables
//!
//! Each register class lives in its own fixed-length `Vec<u16>` protected by a
//! `Mutex`. Every public accessor takes exactly one lock, validates the whole
//! request, and only then touches the table, so a failed call leaves the
//! datastore unchanged and a concurrent reader never sees half of a batch.
//! Locks are never held across an `.await`.

use std::ops::Range;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::debug;

use super::{Access, DatastoreError, RegisterClass};
use crate::config::DatastoreConfig;

/// Handle to the shared device memory.
///
/// Cloning the handle is cheap and every clone refers to the same tables.
///
/// ### Thread Safety
///
/// The four tables are guarded independently, so a Modbus client reading
/// coils never waits on the value generator updating a holding register.
#[derive(Debug, Clone)]
pub struct DeviceDatastore {
    inner: Arc<Tables>,
}

#[derive(Debug)]
struct Tables {
    len: usize,
    discrete_inputs: Mutex<Vec<u16>>,
    coils: Mutex<Vec<u16>>,
    holding_registers: Mutex<Vec<u16>>,
    input_registers: Mutex<Vec<u16>>,
}

impl DeviceDatastore {
    /// Create a datastore with `len` zeroed entries in every table.
    pub fn new(len: usize) -> Self {
        Self {
            inner: Arc::new(Tables {
                len,
                discrete_inputs: Mutex::new(vec![0; len]),
                coils: Mutex::new(vec![0; len]),
                holding_registers: Mutex::new(vec![0; len]),
                input_registers: Mutex::new(vec![0; len]),
            }),
        }
    }

    /// Create a datastore sized and seeded from the configuration.
    ///
    /// Initial values are written from address 0 upwards; a list longer than
    /// the table fails with [`DatastoreError::InvalidAddress`].
    pub fn from_config(config: &DatastoreConfig) -> Result<Self, DatastoreError> {
        let store = Self::new(config.size);
        let initial = &config.initial;
        for (class, values) in [
            (RegisterClass::DiscreteInput, &initial.discrete_inputs),
            (RegisterClass::Coil, &initial.coils),
            (RegisterClass::HoldingRegister, &initial.holding_registers),
            (RegisterClass::InputRegister, &initial.input_registers),
        ] {
            if !values.is_empty() {
                store.write(class, 0, values, Access::Internal)?;
            }
        }
        Ok(store)
    }

    /// Number of entries in each table.
    pub fn len(&self) -> usize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == 0
    }

    /// Read `count` consecutive values of `class` starting at `address`.
    ///
    /// Bit classes return `0` or `1`.
    pub fn read(
        &self,
        class: RegisterClass,
        address: u16,
        count: usize,
    ) -> Result<Vec<u16>, DatastoreError> {
        let range = self.check_range(class, address, count)?;
        let table = self.lock(class);
        Ok(table[range].to_vec())
    }

    /// Read bit values as booleans.
    pub fn read_bits(
        &self,
        class: RegisterClass,
        address: u16,
        count: usize,
    ) -> Result<Vec<bool>, DatastoreError> {
        Ok(self
            .read(class, address, count)?
            .into_iter()
            .map(|v| v != 0)
            .collect())
    }

    /// Write `values` into `class` starting at `address`.
    ///
    /// ### Errors
    ///
    /// * [`DatastoreError::ReadOnlyViolation`] if a network client targets a
    ///   read-only class
    /// * [`DatastoreError::InvalidAddress`] if the span leaves the table
    /// * [`DatastoreError::InvalidValue`] if a bit class receives anything
    ///   other than `0` or `1`
    pub fn write(
        &self,
        class: RegisterClass,
        address: u16,
        values: &[u16],
        access: Access,
    ) -> Result<(), DatastoreError> {
        if access == Access::Network && !class.is_network_writable() {
            return Err(DatastoreError::ReadOnlyViolation { class });
        }
        let range = self.check_range(class, address, values.len())?;
        if class.is_bit() {
            if let Some((offset, &value)) = values.iter().enumerate().find(|(_, v)| **v > 1) {
                return Err(DatastoreError::InvalidValue {
                    class,
                    address: address.wrapping_add(offset as u16),
                    value,
                });
            }
        }

        let mut table = self.lock(class);
        table[range].copy_from_slice(values);
        debug!(
            "Wrote {} {}(s) at {} ({:?})",
            values.len(),
            class,
            address,
            access
        );
        Ok(())
    }

    /// Write boolean values into a bit class.
    pub fn write_bits(
        &self,
        class: RegisterClass,
        address: u16,
        values: &[bool],
        access: Access,
    ) -> Result<(), DatastoreError> {
        let words: Vec<u16> = values.iter().map(|&b| u16::from(b)).collect();
        self.write(class, address, &words, access)
    }

    /// Atomically replace one value with `f(old)` and return the new value.
    ///
    /// The table stays locked for the whole read-modify-write, so no other
    /// writer can interleave. This is an internal operation and ignores the
    /// network access rules.
    pub fn update<F>(&self, class: RegisterClass, address: u16, f: F) -> Result<u16, DatastoreError>
    where
        F: FnOnce(u16) -> u16,
    {
        let range = self.check_range(class, address, 1)?;
        let mut table = self.lock(class);
        let slot = &mut table[range.start];
        let value = f(*slot);
        if class.is_bit() && value > 1 {
            return Err(DatastoreError::InvalidValue {
                class,
                address,
                value,
            });
        }
        *slot = value;
        Ok(value)
    }

    /// Copy of a whole table.
    pub fn snapshot(&self, class: RegisterClass) -> Vec<u16> {
        self.lock(class).clone()
    }

    fn check_range(
        &self,
        class: RegisterClass,
        address: u16,
        count: usize,
    ) -> Result<Range<usize>, DatastoreError> {
        let start = usize::from(address);
        let len = self.inner.len;
        match start.checked_add(count) {
            Some(end) if start < len && end <= len => Ok(start..end),
            _ => Err(DatastoreError::InvalidAddress {
                class,
                address,
                count,
                len,
            }),
        }
    }

    fn lock(&self, class: RegisterClass) -> MutexGuard<'_, Vec<u16>> {
        let table = match class {
            RegisterClass::DiscreteInput => &self.inner.discrete_inputs,
            RegisterClass::Coil => &self.inner.coils,
            RegisterClass::HoldingRegister => &self.inner.holding_registers,
            RegisterClass::InputRegister => &self.inner.input_registers,
        };
        // Writes validate before mutating, so a poisoned table is still consistent.
        table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
