// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated process value
//!
//! The [`ValueGenerator`] makes the device look alive: once per interval it
//! increments a holding register, wrapping from 65535 back to 0. A Modbus
//! client polling that register sees a counter advancing by one per interval.

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, error, info};
use tokio::time::{self, MissedTickBehavior};

use crate::config::GeneratorConfig;
use crate::datastore::{DatastoreError, DeviceDatastore, RegisterClass};
use crate::utility::ShutdownSignal;

/// Periodic incrementer of one holding register.
#[derive(Debug, Clone)]
pub struct ValueGenerator {
    datastore: DeviceDatastore,
    register: u16,
    interval: Duration,
}

impl ValueGenerator {
    pub fn new(datastore: DeviceDatastore, register: u16, interval: Duration) -> Self {
        Self {
            datastore,
            register,
            interval,
        }
    }

    pub fn from_config(datastore: DeviceDatastore, config: &GeneratorConfig) -> Self {
        Self::new(datastore, config.register, config.interval())
    }

    pub fn register(&self) -> u16 {
        self.register
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Increment the target register once and return its new value.
    ///
    /// The read-modify-write happens under the holding register lock, so a
    /// concurrent Modbus write is either fully before or fully after it.
    pub fn step(&self) -> Result<u16, DatastoreError> {
        self.datastore
            .update(RegisterClass::HoldingRegister, self.register, |v| {
                v.wrapping_add(1)
            })
    }

    /// Run until `shutdown` fires.
    ///
    /// The first increment happens immediately, then one per interval. A
    /// datastore error means the target register does not exist: the task
    /// logs it and stops with that error rather than retrying.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> Result<()> {
        info!(
            "Value generator started on holding register {} every {:?}",
            self.register, self.interval
        );
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {
                    let value = self.step().map_err(|e| {
                        error!("Value generator stopped: {}", e);
                        e
                    }).with_context(|| format!(
                        "Value generator cannot update holding register {}",
                        self.register
                    ))?;
                    debug!("Holding register {} = {}", self.register, value);
                }
            }
        }

        info!("Value generator stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastore::Access;
    use crate::utility::shutdown;

    #[test]
    fn step_wraps_around() {
        let store = DeviceDatastore::new(4);
        store
            .write(RegisterClass::HoldingRegister, 2, &[u16::MAX - 1], Access::Internal)
            .unwrap();
        let generator = ValueGenerator::new(store, 2, Duration::from_secs(1));
        assert_eq!(generator.step().unwrap(), u16::MAX);
        assert_eq!(generator.step().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn advances_by_one_per_interval() {
        let store = DeviceDatastore::new(10);
        let (trigger, signal) = shutdown::channel();
        let generator = ValueGenerator::new(store.clone(), 0, Duration::from_secs(1));
        let handle = tokio::spawn(generator.run(signal));

        time::sleep(Duration::from_millis(500)).await;
        let first = store.read(RegisterClass::HoldingRegister, 0, 1).unwrap()[0];
        time::sleep(Duration::from_secs(1)).await;
        let second = store.read(RegisterClass::HoldingRegister, 0, 1).unwrap()[0];
        assert_eq!(first, 1);
        assert_eq!(second.wrapping_sub(first), 1);

        trigger.trigger();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_register_is_fatal() {
        let store = DeviceDatastore::new(10);
        let (_trigger, signal) = shutdown::channel();
        let generator = ValueGenerator::new(store, 10, Duration::from_secs(1));
        let err = generator.run(signal).await.unwrap_err();
        assert!(err.downcast_ref::<DatastoreError>().is_some());
    }
}
