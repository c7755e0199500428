// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Daemon Management Module
//!
//! This module runs the simulated device. It handles the lifecycle of:
//!
//! - the Modbus TCP server
//! - the value generator
//! - the control surface refresh loop
//!
//! All of them share one [`DeviceDatastore`] built from the configuration.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_simulator::{config::Config, daemon::launch_daemon::Daemon};
//!
//! async fn example() -> anyhow::Result<()> {
//!     let config = Config::from_file("config.yaml")?;
//!
//!     let mut daemon = Daemon::new(config)?;
//!     daemon.launch().await?;
//!
//!     // Later, trigger a graceful shutdown
//!     daemon.shutdown();
//!
//!     // Wait for all tasks to complete
//!     daemon.join().await?;
//!
//!     Ok(())
//! }
//! ```

use anyhow::{anyhow, Context, Result};
use log::{debug, error, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::address_map::AddressMap;
use crate::config::Config;
use crate::control::{ControlPanel, LogRenderer};
use crate::datastore::DeviceDatastore;
use crate::generator::ValueGenerator;
use crate::modbus;
use crate::utility::shutdown::{self, ShutdownSignal, ShutdownTrigger};

/// How long [`Daemon::join`] waits for each task.
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Coordinates the background services of the simulated device
///
/// The daemon owns the shared datastore and the shutdown trigger. Every task
/// receives a clone of the datastore handle and its own [`ShutdownSignal`].
pub struct Daemon {
    config: Config,
    tasks: Vec<JoinHandle<Result<()>>>,
    shutdown: ShutdownTrigger,
    datastore: DeviceDatastore,
    control_panel: ControlPanel,
    modbus_addr: Option<SocketAddr>,
}

impl Daemon {
    /// Build the datastore and the address map described by `config`
    ///
    /// No task is started yet.
    ///
    /// # Errors
    ///
    /// Fails when the initial values do not fit the datastore or a signal
    /// binding is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let datastore = DeviceDatastore::from_config(&config.datastore)
            .context("Invalid datastore configuration")?;
        let address_map = AddressMap::from_config(&config.signals, datastore.len())
            .context("Invalid signal configuration")?;
        debug!(
            "Datastore of {} entries per table, {} bound signal(s)",
            datastore.len(),
            address_map.len()
        );
        let control_panel =
            ControlPanel::new(datastore.clone(), Arc::new(address_map), config.control.log_window);
        let (trigger, _) = shutdown::channel();

        Ok(Daemon {
            config,
            tasks: Vec::new(),
            shutdown: trigger,
            datastore,
            control_panel,
            modbus_addr: None,
        })
    }

    /// Launch all configured tasks
    ///
    /// The following services may be started:
    /// * Modbus server - If `config.modbus.enabled` is `true`
    /// * Value generator - If `config.generator.enabled` is `true`
    /// * Control surface refresh - Always
    ///
    /// # Errors
    ///
    /// Fails if the Modbus server cannot bind its address.
    pub async fn launch(&mut self) -> Result<()> {
        if self.config.modbus.enabled {
            self.start_modbus_server().await?;
        }

        if self.config.generator.enabled {
            self.start_value_generator();
        }

        self.start_control_refresh();

        Ok(())
    }

    /// Bind the Modbus listener and serve it in the background
    ///
    /// The accept loop runs in its own task; at shutdown that task is
    /// aborted and every open client connection is closed.
    async fn start_modbus_server(&mut self) -> Result<()> {
        let modbus_config = &self.config.modbus;
        info!(
            "Starting modbus server on {}:{}",
            modbus_config.address, modbus_config.port
        );
        let listener = modbus::bind(&modbus_config.address, modbus_config.port).await?;
        self.modbus_addr = Some(listener.local_addr()?);

        let datastore = self.datastore.clone();
        let mut shutdown = self.shutdown.subscribe();
        let task = tokio::spawn(async move {
            let mut server_handle =
                tokio::spawn(modbus::serve(listener, datastore, shutdown.clone()));

            tokio::select! {
                _ = shutdown.wait() => {}
                result = &mut server_handle => {
                    return result.map_err(|e| anyhow!("Modbus server task failed: {}", e))?;
                }
            }

            info!("Shutting down Modbus server...");
            server_handle.abort();

            match time::timeout(JOIN_TIMEOUT, server_handle).await {
                Ok(_) => info!("Modbus server shut down successfully"),
                Err(_) => warn!("Modbus server shutdown timed out, forcing termination"),
            }

            Ok(())
        });

        self.tasks.push(task);
        info!("Modbus server started");
        Ok(())
    }

    fn start_value_generator(&mut self) {
        let generator = ValueGenerator::from_config(self.datastore.clone(), &self.config.generator);
        let task = tokio::spawn(generator.run(self.shutdown.subscribe()));
        self.tasks.push(task);
    }

    fn start_control_refresh(&mut self) {
        let task = tokio::spawn(self.control_panel.clone().run(
            LogRenderer::new(),
            self.config.control.refresh_interval(),
            self.shutdown.subscribe(),
        ));
        self.tasks.push(task);
    }

    /// The shared datastore handle
    pub fn datastore(&self) -> &DeviceDatastore {
        &self.datastore
    }

    /// The operator control surface
    pub fn control_panel(&self) -> &ControlPanel {
        &self.control_panel
    }

    /// Address the Modbus server actually listens on, once launched
    pub fn modbus_addr(&self) -> Option<SocketAddr> {
        self.modbus_addr
    }

    /// A shutdown signal for a front end running beside the daemon
    pub fn subscribe(&self) -> ShutdownSignal {
        self.shutdown.subscribe()
    }

    /// Stop all running tasks
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.shutdown.trigger();
    }

    /// Wait for all tasks to complete
    ///
    /// Consumes the daemon. Call [`shutdown`](Self::shutdown) first, otherwise
    /// each task is given up on after five seconds.
    ///
    /// # Errors
    ///
    /// Returns the first error a task stopped with, after every task has been
    /// waited for. Later errors and panics are only logged.
    pub async fn join(self) -> Result<()> {
        let mut first_error = None;
        for task in self.tasks {
            match time::timeout(JOIN_TIMEOUT, task).await {
                Ok(Ok(Ok(()))) => {}
                Ok(Ok(Err(e))) => {
                    error!("Task failed: {:#}", e);
                    first_error.get_or_insert(e);
                }
                Ok(Err(e)) => error!("Task panicked: {}", e),
                Err(_) => warn!("Task did not complete within timeout period, may be hung"),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
