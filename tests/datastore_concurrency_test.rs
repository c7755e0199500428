// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Concurrent access to one shared datastore from many threads.

use std::thread;

use rust_modbus_simulator::datastore::{Access, DeviceDatastore, RegisterClass};

const WRITERS: u16 = 8;
const READERS: usize = 4;
const ROUNDS: u16 = 1000;

#[test]
fn concurrent_writers_lose_no_updates() {
    let store = DeviceDatastore::new(usize::from(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|address| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    store
                        .update(RegisterClass::HoldingRegister, address, |v| v + 1)
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(
        store.snapshot(RegisterClass::HoldingRegister),
        vec![ROUNDS; usize::from(WRITERS)]
    );
}

#[test]
fn readers_never_see_a_partial_write() {
    let store = DeviceDatastore::new(16);

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for value in 1..=ROUNDS {
                store
                    .write(RegisterClass::HoldingRegister, 0, &[value; 16], Access::Network)
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..ROUNDS {
                    let values = store.read(RegisterClass::HoldingRegister, 0, 16).unwrap();
                    assert!(values.iter().all(|v| *v == values[0]), "torn read: {:?}", values);
                    // Writes are visible in order
                    assert!(values[0] >= last);
                    last = values[0];
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(store.read(RegisterClass::HoldingRegister, 15, 1).unwrap(), vec![ROUNDS]);
}

#[test]
fn bit_tables_stay_binary_under_contention() {
    let store = DeviceDatastore::new(32);

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                for round in 0..ROUNDS {
                    let state = (round + worker) % 2 == 0;
                    store
                        .write_bits(RegisterClass::Coil, 0, &[state; 32], Access::Network)
                        .unwrap();
                    let bits = store.read_bits(RegisterClass::Coil, 0, 32).unwrap();
                    assert!(bits.iter().all(|b| *b == bits[0]));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert!(store
        .snapshot(RegisterClass::Coil)
        .iter()
        .all(|v| *v <= 1));
}
