// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Tests for the DeviceModbusServer implementation
//!
//! These tests start a server instance on an OS-assigned port and talk to it
//! through a real Modbus TCP client.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_modbus::prelude::*;

use rust_modbus_simulator::address_map::AddressMap;
use rust_modbus_simulator::config::SignalsConfig;
use rust_modbus_simulator::control::ControlPanel;
use rust_modbus_simulator::datastore::{Access, DeviceDatastore, RegisterClass};
use rust_modbus_simulator::modbus;
use rust_modbus_simulator::utility::shutdown;

type TestServer = (
    SocketAddr,
    tokio::task::JoinHandle<anyhow::Result<()>>,
    shutdown::ShutdownTrigger,
);

/// Test utility function to start a Modbus server in the background
///
/// Keep the returned trigger alive: dropping it shuts the server down.
async fn start_test_server(datastore: DeviceDatastore) -> Result<TestServer, Box<dyn std::error::Error>> {
    let _ = env_logger::builder().is_test(true).try_init();

    // Use port 0 to let the OS assign an available port
    let listener = modbus::bind("127.0.0.1", 0).await?;
    let socket_addr = listener.local_addr()?;

    let (trigger, signal) = shutdown::channel();
    let handle = tokio::spawn(modbus::serve(listener, datastore, signal));
    Ok((socket_addr, handle, trigger))
}

#[tokio::test]
async fn test_write_coil_then_read() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    let (socket_addr, server_handle, _trigger) = start_test_server(store.clone()).await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    ctx.write_single_coil(30, true).await??;
    let data = ctx.read_coils(30, 1).await??;
    assert_eq!(data, vec![true]);

    ctx.write_multiple_coils(40, &[true, false, true]).await??;
    let data = ctx.read_coils(39, 5).await??;
    assert_eq!(data, vec![false, true, false, true, false]);
    assert_eq!(store.read(RegisterClass::Coil, 40, 3)?, vec![1, 0, 1]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_holding_and_input_registers() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    store.write(RegisterClass::InputRegister, 5, &[1234, 5678], Access::Internal)?;
    store.write(RegisterClass::DiscreteInput, 2, &[1], Access::Internal)?;
    let (socket_addr, server_handle, _trigger) = start_test_server(store).await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    ctx.write_single_register(2, 999).await??;
    ctx.write_multiple_registers(3, &[101, 202]).await??;
    let data = ctx.read_holding_registers(2, 3).await??;
    assert_eq!(data, vec![999, 101, 202]);

    let data = ctx.read_input_registers(5, 2).await??;
    assert_eq!(data, vec![1234, 5678]);

    let data = ctx.read_discrete_inputs(0, 3).await??;
    assert_eq!(data, vec![false, false, true]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_exceptions_keep_the_connection_open() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    let (socket_addr, server_handle, _trigger) = start_test_server(store.clone()).await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    let result = ctx.read_holding_registers(100, 1).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));

    let result = ctx.write_multiple_registers(99, &[1, 2]).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalDataAddress));
    assert_eq!(store.read(RegisterClass::HoldingRegister, 99, 1)?, vec![0]);

    let result = ctx.masked_write_register(0, 0x00FF, 0x0000).await?;
    assert_eq!(result, Err(ExceptionCode::IllegalFunction));

    // Same connection still serves requests
    ctx.write_single_coil(0, true).await??;
    assert_eq!(ctx.read_coils(0, 1).await??, vec![true]);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_concurrent_clients_share_the_datastore() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    let (socket_addr, server_handle, _trigger) = start_test_server(store.clone()).await?;

    let mut clients = Vec::new();
    for i in 0..4u16 {
        clients.push(tokio::spawn(async move {
            let mut ctx = tcp::connect(socket_addr).await?;
            for round in 0..10u16 {
                ctx.write_single_register(i * 10, round).await??;
            }
            ctx.write_single_coil(i, true).await??;
            ctx.disconnect().await?;
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(())
        }));
    }
    for client in clients {
        client.await?.map_err(|e| e.to_string())?;
    }

    let mut ctx = tcp::connect(socket_addr).await?;
    assert_eq!(ctx.read_coils(0, 4).await??, vec![true; 4]);
    for i in 0..4u16 {
        assert_eq!(ctx.read_holding_registers(i * 10, 1).await??, vec![9]);
    }

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_control_panel_and_clients_see_each_other() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    let map = AddressMap::from_config(&SignalsConfig::default(), store.len())?;
    let panel = ControlPanel::new(store.clone(), Arc::new(map), 10);
    let (socket_addr, server_handle, _trigger) = start_test_server(store).await?;

    let mut ctx = tcp::connect(socket_addr).await?;

    panel.toggle_signal("RUN_BARTEC", true)?;
    assert_eq!(ctx.read_coils(30, 1).await??, vec![true]);

    ctx.write_single_coil(50, true).await??;
    assert!(panel.read_signal("UP_PLATFORM")?);

    ctx.disconnect().await?;
    server_handle.abort();
    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_connections() -> Result<(), Box<dyn std::error::Error>> {
    let store = DeviceDatastore::new(100);
    let (socket_addr, server_handle, trigger) = start_test_server(store.clone()).await?;

    let mut ctx = tcp::connect(socket_addr).await?;
    ctx.write_single_coil(30, true).await??;

    trigger.trigger();

    // The open connection no longer reaches the datastore
    let late_write = time::timeout(Duration::from_secs(1), ctx.write_single_coil(31, true)).await;
    assert!(!matches!(late_write, Ok(Ok(Ok(())))));

    // New clients are turned away while the accept loop still runs
    if let Ok(mut late) = tcp::connect(socket_addr).await {
        let late_read = time::timeout(Duration::from_secs(1), late.read_coils(30, 1)).await;
        assert!(!matches!(late_read, Ok(Ok(Ok(_)))));
    }

    assert_eq!(store.read(RegisterClass::Coil, 30, 2)?, vec![1, 0]);
    server_handle.abort();
    Ok(())
}
