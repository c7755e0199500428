// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Refresh loop of the control surface, driven by a mocked renderer.

use std::sync::Arc;
use std::time::Duration;

use mockall::{mock, Sequence};
use tokio::time;

use rust_modbus_simulator::address_map::AddressMap;
use rust_modbus_simulator::config::SignalsConfig;
use rust_modbus_simulator::control::{ControlPanel, LogEntry, PanelRenderer, PanelSnapshot};
use rust_modbus_simulator::datastore::{Access, DeviceDatastore, RegisterClass};
use rust_modbus_simulator::utility::shutdown;

mock! {
    pub Renderer {}

    impl PanelRenderer for Renderer {
        fn render(&mut self, snapshot: &PanelSnapshot, log: &[LogEntry]);
    }
}

fn panel() -> (DeviceDatastore, ControlPanel) {
    let store = DeviceDatastore::new(100);
    let map = AddressMap::from_config(&SignalsConfig::default(), 100).unwrap();
    let panel = ControlPanel::new(store.clone(), Arc::new(map), 10);
    (store, panel)
}

#[tokio::test(start_paused = true)]
async fn renders_once_per_refresh_interval() {
    let (_, panel) = panel();
    let (trigger, signal) = shutdown::channel();

    let mut renderer = MockRenderer::new();
    renderer
        .expect_render()
        .withf(|snapshot, _| snapshot.coils.len() == 9 && snapshot.inputs.len() == 3)
        .times(3)
        .return_const(());

    let handle = tokio::spawn(panel.run(renderer, Duration::from_secs(1), signal));

    // Ticks at 0 s, 1 s and 2 s
    time::sleep(Duration::from_millis(2500)).await;
    trigger.trigger();
    handle.await.unwrap().unwrap();
}

#[tokio::test(start_paused = true)]
async fn renders_changes_made_between_refreshes() {
    let (store, panel) = panel();
    let (trigger, signal) = shutdown::channel();

    let mut seq = Sequence::new();
    let mut renderer = MockRenderer::new();
    renderer
        .expect_render()
        .withf(|snapshot, log| snapshot.coils.iter().all(|c| !c.active) && log.is_empty())
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());
    renderer
        .expect_render()
        .withf(|snapshot, log| {
            let active: Vec<&str> = snapshot
                .coils
                .iter()
                .filter(|c| c.active)
                .map(|c| c.name.as_str())
                .collect();
            active == ["RUN_BARTEC", "UP_PLATFORM"]
                && snapshot.inputs[0].active
                && log.len() == 1
                && log[0].signal == "RUN_BARTEC"
        })
        .times(1)
        .in_sequence(&mut seq)
        .return_const(());

    let handle = tokio::spawn(panel.clone().run(renderer, Duration::from_secs(1), signal));

    time::sleep(Duration::from_millis(500)).await;
    panel.toggle_signal("RUN_BARTEC", true).unwrap();
    // A Modbus client writing a coil, and a field sensor
    store
        .write(RegisterClass::Coil, 50, &[1], Access::Network)
        .unwrap();
    store
        .write(RegisterClass::DiscreteInput, 0, &[1], Access::Internal)
        .unwrap();

    time::sleep(Duration::from_millis(1000)).await;
    trigger.trigger();
    handle.await.unwrap().unwrap();
}
