// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rust Modbus simulator library
//!
//! A Modbus TCP slave simulating an industrial platform controller: four
//! register tables shared between network clients, a value generator and an
//! operator control surface addressing signals by name.

pub mod address_map;
pub mod config;
pub mod control;
pub mod daemon;
pub mod datastore;
pub mod generator;
pub mod modbus;
pub mod utility;
