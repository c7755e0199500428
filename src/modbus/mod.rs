// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! This module exposes the simulated device to Modbus TCP clients.
//!
//! ## Key Components
//!
//! - [`DeviceModbusServer`]: the per-connection service translating Modbus
//!   requests into datastore reads and writes.
//! - [`bind`] / [`serve`]: listener setup and the accept loop used by the daemon.
//!
//! ## Usage
//!
//! ```no_run
//! use rust_modbus_simulator::datastore::DeviceDatastore;
//! use rust_modbus_simulator::modbus;
//! use rust_modbus_simulator::utility::shutdown;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let store = DeviceDatastore::new(100);
//! let (_trigger, signal) = shutdown::channel();
//! let listener = modbus::bind("127.0.0.1", 5030).await?;
//! modbus::serve(listener, store, signal).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Function codes
//!
//! | FC | Request | Table |
//! |----|---------|-------|
//! | 0x01 | Read Coils | coils |
//! | 0x02 | Read Discrete Inputs | discrete inputs |
//! | 0x03 | Read Holding Registers | holding registers |
//! | 0x04 | Read Input Registers | input registers |
//! | 0x05 | Write Single Coil | coils |
//! | 0x06 | Write Single Register | holding registers |
//! | 0x0F | Write Multiple Coils | coils |
//! | 0x10 | Write Multiple Registers | holding registers |
//!
//! Out of range addresses answer IllegalDataAddress, a zero or oversized
//! quantity answers IllegalDataValue and anything else IllegalFunction.
//! Exceptions never close the connection.

pub mod modbus_server;
pub use modbus_server::{bind, serve, DeviceModbusServer};
