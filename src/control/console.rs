// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Line-oriented console front end
//!
//! Lets an operator drive the panel from a terminal while the device runs:
//!
//! | Command | Effect |
//! |---------|--------|
//! | `on NAME` / `off NAME` | drive a coil |
//! | `set NAME on\|off` | drive a coil |
//! | `sense NAME on\|off` | force a discrete input |
//! | `status` | print every bound signal |
//! | `log` | print the recent actions |
//! | `help` | list the commands |
//! | `quit` | stop the device |

use std::io::BufRead;
use std::str::FromStr;
use std::thread;

use anyhow::Result;
use log::{debug, error};
use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::{ControlPanel, SignalState};
use crate::utility::ShutdownSignal;

const HELP: &str = "\
commands:
  on NAME | off NAME      drive a coil
  set NAME on|off         drive a coil
  sense NAME on|off       force a discrete input
  status                  show every signal
  log                     show the recent actions
  help                    show this help
  quit                    stop the device";

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Coil { signal: String, state: bool },
    Input { signal: String, state: bool },
    Status,
    Log,
    Help,
    Quit,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseCommandError {
    #[error("Empty command")]
    Empty,

    #[error("Unknown command '{0}', type 'help'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid state '{0}', expected on or off")]
    InvalidState(String),
}

fn parse_state(word: &str) -> Result<bool, ParseCommandError> {
    match word.to_ascii_lowercase().as_str() {
        "on" | "1" | "true" => Ok(true),
        "off" | "0" | "false" => Ok(false),
        _ => Err(ParseCommandError::InvalidState(word.to_string())),
    }
}

impl FromStr for ConsoleCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(ParseCommandError::Empty);
        };

        match (verb.to_ascii_lowercase().as_str(), args) {
            ("on" | "off", [signal]) => Ok(ConsoleCommand::Coil {
                signal: signal.to_string(),
                state: verb.eq_ignore_ascii_case("on"),
            }),
            ("on" | "off", _) => Err(ParseCommandError::Usage("on|off NAME")),
            ("set", [signal, state]) => Ok(ConsoleCommand::Coil {
                signal: signal.to_string(),
                state: parse_state(state)?,
            }),
            ("set", _) => Err(ParseCommandError::Usage("set NAME on|off")),
            ("sense", [signal, state]) => Ok(ConsoleCommand::Input {
                signal: signal.to_string(),
                state: parse_state(state)?,
            }),
            ("sense", _) => Err(ParseCommandError::Usage("sense NAME on|off")),
            ("status", []) => Ok(ConsoleCommand::Status),
            ("log", []) => Ok(ConsoleCommand::Log),
            ("help" | "?", _) => Ok(ConsoleCommand::Help),
            ("quit" | "exit", []) => Ok(ConsoleCommand::Quit),
            _ => Err(ParseCommandError::Unknown(verb.to_string())),
        }
    }
}

/// Why the console loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleExit {
    /// The operator typed `quit`
    Quit,
    /// The input stream closed
    EndOfInput,
    /// The daemon is shutting down
    Shutdown,
}

/// Read stdin lines on a dedicated thread.
///
/// A blocking read on a plain thread never holds up runtime shutdown, unlike
/// `tokio::io::stdin`.
pub fn spawn_stdin_reader() -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel(16);
    thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
        debug!("Console input closed");
    });
    rx
}

fn format_states(title: &str, states: &[SignalState], on: &str, off: &str) -> String {
    let mut out = format!("{}:", title);
    for s in states {
        out.push_str(&format!(
            "\n  {:<26} @{:<5} {}",
            s.name,
            s.address,
            if s.active { on } else { off }
        ));
    }
    out
}

fn execute(panel: &ControlPanel, command: ConsoleCommand) -> String {
    let outcome = match command {
        ConsoleCommand::Coil { signal, state } => panel.toggle_signal(&signal, state),
        ConsoleCommand::Input { signal, state } => panel.set_input(&signal, state),
        ConsoleCommand::Status => {
            let snapshot = panel.snapshot();
            return format!(
                "{}\n{}",
                format_states("Coils", &snapshot.coils, "ON", "OFF"),
                format_states("Discrete inputs", &snapshot.inputs, "Active", "Inactive")
            );
        }
        ConsoleCommand::Log => {
            let entries = panel.recent_log();
            if entries.is_empty() {
                return "(no actions yet)".to_string();
            }
            return entries
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n");
        }
        ConsoleCommand::Help => return HELP.to_string(),
        ConsoleCommand::Quit => return String::new(),
    };

    match outcome {
        Ok(entry) => entry.to_string(),
        Err(e) => {
            error!("Control action failed: {}", e);
            format!("error: {}", e)
        }
    }
}

/// Execute console lines until `quit`, end of input or shutdown.
pub async fn run<W>(
    panel: ControlPanel,
    mut lines: mpsc::Receiver<String>,
    mut output: W,
    mut shutdown: ShutdownSignal,
) -> Result<ConsoleExit>
where
    W: AsyncWrite + Unpin,
{
    loop {
        let line = tokio::select! {
            _ = shutdown.wait() => return Ok(ConsoleExit::Shutdown),
            line = lines.recv() => line,
        };
        let Some(line) = line else {
            return Ok(ConsoleExit::EndOfInput);
        };

        let reply = match line.parse::<ConsoleCommand>() {
            Ok(ConsoleCommand::Quit) => return Ok(ConsoleExit::Quit),
            Ok(command) => execute(&panel, command),
            Err(ParseCommandError::Empty) => continue,
            Err(e) => e.to_string(),
        };
        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
}
