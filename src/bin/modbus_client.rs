// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use clap::{Parser, ValueEnum};
use std::error::Error;
use std::net::SocketAddr;
use tokio::time::Duration;
use tokio_modbus::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Operation {
    /// FC 0x01
    ReadCoils,
    /// FC 0x02
    ReadDiscreteInputs,
    /// FC 0x03
    ReadHoldingRegisters,
    /// FC 0x04
    ReadInputRegisters,
    /// FC 0x05, writes `--value` (0 or 1)
    WriteCoil,
    /// FC 0x06, writes `--value`
    WriteRegister,
}

/// Modbus client for poking at the simulated device
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Modbus server address
    #[clap(long, default_value = "127.0.0.1")]
    address: String,

    /// Modbus server port
    #[clap(long, default_value = "5030")]
    port: u16,

    /// Unit identifier
    #[clap(long, default_value = "1")]
    unit: u8,

    /// Request to send
    #[clap(value_enum, default_value = "read-holding-registers")]
    operation: Operation,

    /// Starting register address
    #[clap(long, default_value = "0")]
    register: u16,

    /// Number of entries to read
    #[clap(long, default_value = "1")]
    quantity: u16,

    /// Value for write operations
    #[clap(long, default_value = "1")]
    value: u16,
}

fn print_bits(start: u16, bits: &[bool]) {
    for (i, bit) in bits.iter().enumerate() {
        println!(
            "{:>5}: {}",
            usize::from(start) + i,
            if *bit { "ON" } else { "OFF" }
        );
    }
}

fn print_words(start: u16, words: &[u16]) {
    for (i, word) in words.iter().enumerate() {
        println!("{:>5}: {}", usize::from(start) + i, word);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    let args = Args::parse();

    let socket_addr: SocketAddr = format!("{}:{}", args.address, args.port).parse()?;
    println!("Connecting to Modbus server at {}", socket_addr);

    let mut ctx = tcp::connect_slave(socket_addr, Slave(args.unit)).await?;

    let timeout = Duration::from_secs(1);
    let (register, quantity) = (args.register, args.quantity);
    match args.operation {
        Operation::ReadCoils => {
            let bits = tokio::time::timeout(timeout, ctx.read_coils(register, quantity)).await???;
            print_bits(register, &bits);
        }
        Operation::ReadDiscreteInputs => {
            let bits =
                tokio::time::timeout(timeout, ctx.read_discrete_inputs(register, quantity))
                    .await???;
            print_bits(register, &bits);
        }
        Operation::ReadHoldingRegisters => {
            let words =
                tokio::time::timeout(timeout, ctx.read_holding_registers(register, quantity))
                    .await???;
            print_words(register, &words);
        }
        Operation::ReadInputRegisters => {
            let words =
                tokio::time::timeout(timeout, ctx.read_input_registers(register, quantity))
                    .await???;
            print_words(register, &words);
        }
        Operation::WriteCoil => {
            let state = args.value != 0;
            tokio::time::timeout(timeout, ctx.write_single_coil(register, state)).await???;
            println!("Coil {} set to {}", register, if state { "ON" } else { "OFF" });
        }
        Operation::WriteRegister => {
            tokio::time::timeout(timeout, ctx.write_single_register(register, args.value))
                .await???;
            println!("Holding register {} set to {}", register, args.value);
        }
    }

    ctx.disconnect().await?;
    Ok(())
}
