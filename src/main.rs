// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the Modbus slave simulator

use anyhow::Result;
use clap::Parser;
use log::{error, info};
use rust_modbus_simulator::config::{self, Config};
use rust_modbus_simulator::control::console::{self, ConsoleExit};
use rust_modbus_simulator::daemon::Daemon;

use std::future;
use std::path::PathBuf;
use tokio::signal;

/// Modbus TCP slave simulating an industrial platform controller
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file (YAML format)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to a configuration to validate and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Output the configuration schema as JSON and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Modbus server address
    #[arg(long)]
    modbus_address: Option<String>,

    /// Modbus server port
    #[arg(long)]
    modbus_port: Option<u16>,

    /// Number of entries in every register table
    #[arg(long)]
    size: Option<usize>,

    /// Value generator period in milliseconds
    #[arg(long)]
    generator_interval_ms: Option<u64>,

    /// Read operator commands from stdin (type `help` once started)
    #[arg(long)]
    console: bool,

    /// Enable verbose logging (debug level)
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable all logging output
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.modbus_address.clone(),
        args.modbus_port,
        args.size,
        args.generator_interval_ms,
    );
    config::validate_specific_rules(&config)?;

    info!("Starting Modbus slave simulator");
    let mut daemon = Daemon::new(config)?;
    daemon.launch().await?;

    let console_task = args.console.then(|| {
        tokio::spawn(console::run(
            daemon.control_panel().clone(),
            console::spawn_stdin_reader(),
            tokio::io::stdout(),
            daemon.subscribe(),
        ))
    });

    // Resolves only on an explicit `quit`; a closed stdin keeps the device running.
    let quit_requested = async {
        let Some(task) = console_task else {
            return future::pending().await;
        };
        match task.await {
            Ok(Ok(ConsoleExit::Quit)) => info!("Quit requested from the console"),
            Ok(Ok(exit)) => {
                info!("Console stopped ({:?}), press Ctrl+C to exit", exit);
                future::pending::<()>().await
            }
            Ok(Err(e)) => {
                error!("Console failed: {:#}", e);
                future::pending::<()>().await
            }
            Err(e) => {
                error!("Console task panicked: {}", e);
                future::pending::<()>().await
            }
        }
    };

    tokio::select! {
        res = signal::ctrl_c() => {
            res?;
            info!("Received shutdown signal, terminating daemon");
        }
        _ = quit_requested => {}
    }

    daemon.shutdown();
    daemon.join().await
}
