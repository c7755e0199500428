// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Operator control surface
//!
//! The control surface is the operator's view of the device. It works only
//! with symbolic signal names, resolved through the [`AddressMap`], and it
//! shares the very same [`DeviceDatastore`] as the Modbus server: a coil
//! toggled here is immediately visible to network clients and vice versa.
//!
//! Rendering is left to a [`PanelRenderer`]. The crate ships
//! [`LogRenderer`], which reports the panel through the `log` facade, and a
//! line-oriented [`console`] front end for toggling coils from a terminal.
//!
//! ```
//! use std::sync::Arc;
//! use rust_modbus_simulator::address_map::AddressMap;
//! use rust_modbus_simulator::config::SignalsConfig;
//! use rust_modbus_simulator::control::ControlPanel;
//! use rust_modbus_simulator::datastore::{DeviceDatastore, RegisterClass};
//!
//! let store = DeviceDatastore::new(100);
//! let map = Arc::new(AddressMap::from_config(&SignalsConfig::default(), 100).unwrap());
//! let panel = ControlPanel::new(store.clone(), map, 10);
//!
//! panel.toggle_signal("RUN_BARTEC", true).unwrap();
//! assert_eq!(store.read(RegisterClass::Coil, 30, 1).unwrap(), vec![1]);
//! assert!(panel.recent_log()[0].to_string().ends_with("RUN_BARTEC -> ON"));
//! ```

pub mod console;
pub mod renderer;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::{self, MissedTickBehavior};

use crate::address_map::{AddressMap, AddressMapError};
use crate::datastore::{Access, DatastoreError, DeviceDatastore, RegisterClass};
use crate::utility::ShutdownSignal;

pub use renderer::{LogRenderer, PanelRenderer};

/// Errors returned by control surface operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControlError {
    #[error(transparent)]
    Signal(#[from] AddressMapError),

    #[error(transparent)]
    Store(#[from] DatastoreError),

    #[error("Signal '{name}' is a {class}, not a coil")]
    NotACoil { name: String, class: RegisterClass },

    #[error("Signal '{name}' is a {class}, not a discrete input")]
    NotAnInput { name: String, class: RegisterClass },
}

/// One operator action, as shown in the panel log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub signal: String,
    pub state: bool,
}

impl LogEntry {
    pub fn new(signal: impl Into<String>, state: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            signal: signal.into(),
            state,
        }
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [Action] {} -> {}",
            self.timestamp.format("%H:%M:%S"),
            self.signal,
            if self.state { "ON" } else { "OFF" }
        )
    }
}

/// Current value of one bound signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalState {
    pub name: String,
    pub address: u16,
    pub active: bool,
}

/// Values of every bound signal, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub taken_at: DateTime<Utc>,
    pub coils: Vec<SignalState>,
    pub inputs: Vec<SignalState>,
}

impl PanelSnapshot {
    /// Same signal values, ignoring when they were sampled.
    pub fn same_state(&self, other: &PanelSnapshot) -> bool {
        self.coils == other.coils && self.inputs == other.inputs
    }
}

/// Typed operator interface over the shared datastore.
///
/// Clones share the datastore, the address map and the action log.
#[derive(Debug, Clone)]
pub struct ControlPanel {
    datastore: DeviceDatastore,
    address_map: Arc<AddressMap>,
    log: Arc<Mutex<Vec<LogEntry>>>,
    log_window: usize,
}

impl ControlPanel {
    /// `log_window` is the number of entries returned by [`recent_log`](Self::recent_log).
    pub fn new(datastore: DeviceDatastore, address_map: Arc<AddressMap>, log_window: usize) -> Self {
        Self {
            datastore,
            address_map,
            log: Arc::new(Mutex::new(Vec::new())),
            log_window,
        }
    }

    pub fn address_map(&self) -> &AddressMap {
        &self.address_map
    }

    /// Drive a named coil and record the action.
    pub fn toggle_signal(&self, name: &str, state: bool) -> Result<LogEntry, ControlError> {
        let (class, address) = self.address_map.resolve(name)?;
        if class != RegisterClass::Coil {
            return Err(ControlError::NotACoil {
                name: name.to_string(),
                class,
            });
        }
        self.datastore
            .write_bits(class, address, &[state], Access::Internal)?;
        Ok(self.append_log(LogEntry::new(name, state)))
    }

    /// Force a named discrete input, simulating a field sensor.
    pub fn set_input(&self, name: &str, state: bool) -> Result<LogEntry, ControlError> {
        let (class, address) = self.address_map.resolve(name)?;
        if class != RegisterClass::DiscreteInput {
            return Err(ControlError::NotAnInput {
                name: name.to_string(),
                class,
            });
        }
        self.datastore
            .write_bits(class, address, &[state], Access::Internal)?;
        Ok(self.append_log(LogEntry::new(name, state)))
    }

    /// Current value of one named signal.
    pub fn read_signal(&self, name: &str) -> Result<bool, ControlError> {
        let (class, address) = self.address_map.resolve(name)?;
        Ok(self.datastore.read_bits(class, address, 1)?[0])
    }

    /// Values of all bound signals.
    ///
    /// Each table is copied under a single lock, so all coils come from the
    /// same instant (and likewise all inputs).
    pub fn snapshot(&self) -> PanelSnapshot {
        let coil_table = self.datastore.snapshot(RegisterClass::Coil);
        let input_table = self.datastore.snapshot(RegisterClass::DiscreteInput);
        let collect = |class: RegisterClass, table: &[u16]| -> Vec<SignalState> {
            self.address_map
                .bindings()
                .filter(|b| b.class == class)
                .map(|b| SignalState {
                    name: b.name.clone(),
                    address: b.address,
                    active: table.get(usize::from(b.address)).is_some_and(|&v| v != 0),
                })
                .collect()
        };
        PanelSnapshot {
            taken_at: Utc::now(),
            coils: collect(RegisterClass::Coil, &coil_table),
            inputs: collect(RegisterClass::DiscreteInput, &input_table),
        }
    }

    /// Append an entry to the action log and return it.
    pub fn append_log(&self, entry: LogEntry) -> LogEntry {
        info!("{}", entry);
        self.lock_log().push(entry.clone());
        entry
    }

    /// The most recent entries, oldest first, at most `log_window` of them.
    pub fn recent_log(&self) -> Vec<LogEntry> {
        let log = self.lock_log();
        let start = log.len().saturating_sub(self.log_window);
        log[start..].to_vec()
    }

    /// Total number of entries ever appended.
    pub fn log_len(&self) -> usize {
        self.lock_log().len()
    }

    /// Refresh `renderer` every `interval` until `shutdown` fires.
    pub async fn run<R: PanelRenderer>(
        self,
        mut renderer: R,
        interval: Duration,
        mut shutdown: ShutdownSignal,
    ) -> Result<()> {
        info!("Control surface refresh started every {:?}", interval);
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let snapshot = self.snapshot();
                    let log = self.recent_log();
                    renderer.render(&snapshot, &log);
                }
            }
        }

        info!("Control surface refresh stopped");
        Ok(())
    }

    fn lock_log(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // Entries are pushed whole; a poisoned log is still consistent.
        self.log.lock().unwrap_or_else(|e| {
            error!("Control log lock was poisoned");
            PoisonError::into_inner(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SignalsConfig;

    fn panel() -> (DeviceDatastore, ControlPanel) {
        let store = DeviceDatastore::new(100);
        let map = AddressMap::from_config(&SignalsConfig::default(), 100).unwrap();
        let panel = ControlPanel::new(store.clone(), Arc::new(map), 10);
        (store, panel)
    }

    #[test]
    fn toggle_writes_coil_and_logs() {
        let (store, panel) = panel();
        let entry = panel.toggle_signal("RUN_BARTEC", true).unwrap();
        assert_eq!(entry.signal, "RUN_BARTEC");
        assert!(entry.state);
        assert_eq!(store.read(RegisterClass::Coil, 30, 1).unwrap(), vec![1]);
        assert!(panel.read_signal("RUN_BARTEC").unwrap());

        panel.toggle_signal("RUN_BARTEC", false).unwrap();
        assert_eq!(store.read(RegisterClass::Coil, 30, 1).unwrap(), vec![0]);
        assert_eq!(panel.log_len(), 2);
        assert!(panel.recent_log()[1].to_string().ends_with("RUN_BARTEC -> OFF"));
    }

    #[test]
    fn unknown_signal_fails_loudly() {
        let (_, panel) = panel();
        let err = panel.toggle_signal("GHOST", true).unwrap_err();
        assert_eq!(
            err,
            ControlError::Signal(AddressMapError::UnknownSignal("GHOST".to_string()))
        );
        assert_eq!(panel.log_len(), 0);
    }

    #[test]
    fn toggling_an_input_is_rejected() {
        let (store, panel) = panel();
        assert!(matches!(
            panel.toggle_signal("ULTRA_LEFT_SENSOR", true),
            Err(ControlError::NotACoil { .. })
        ));
        assert!(matches!(
            panel.set_input("RUN_BARTEC", true),
            Err(ControlError::NotAnInput { .. })
        ));

        panel.set_input("ULTRA_RIGHT_SENSOR", true).unwrap();
        assert_eq!(store.read(RegisterClass::DiscreteInput, 1, 1).unwrap(), vec![1]);
    }

    #[test]
    fn recent_log_keeps_the_last_window() {
        let (_, panel) = panel();
        for i in 0..25 {
            panel.toggle_signal("DEADMAN_SWITCH", i % 2 == 0).unwrap();
        }
        let recent = panel.recent_log();
        assert_eq!(recent.len(), 10);
        assert_eq!(panel.log_len(), 25);
        // Entry 24 toggled ON, and it is the newest
        assert!(recent[9].state);
    }

    #[test]
    fn snapshot_reflects_network_writes() {
        let (store, panel) = panel();
        store
            .write(RegisterClass::Coil, 50, &[1], Access::Network)
            .unwrap();
        store
            .write(RegisterClass::DiscreteInput, 2, &[1], Access::Internal)
            .unwrap();

        let snapshot = panel.snapshot();
        assert_eq!(snapshot.coils.len(), 9);
        assert_eq!(snapshot.inputs.len(), 3);
        let up = snapshot.coils.iter().find(|s| s.name == "UP_PLATFORM").unwrap();
        assert_eq!(up.address, 50);
        assert!(up.active);
        assert!(snapshot.coils.iter().filter(|s| s.active).count() == 1);
        assert!(snapshot.inputs[2].active);
        assert!(!snapshot.inputs[0].active);
    }
}
