// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Panel rendering seam

use log::{debug, info};

use super::{LogEntry, PanelSnapshot, SignalState};

/// Front end fed by the control surface refresh loop.
///
/// Implementations only display what they receive; they never hold the
/// datastore.
pub trait PanelRenderer: Send {
    fn render(&mut self, snapshot: &PanelSnapshot, log: &[LogEntry]);
}

/// Renders the panel through the `log` facade.
///
/// A changed panel is reported at info level, an unchanged one at debug level
/// so that a quiet device does not flood the output.
#[derive(Debug, Default)]
pub struct LogRenderer {
    last: Option<PanelSnapshot>,
}

impl LogRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

fn describe(states: &[SignalState], on: &str, off: &str) -> String {
    states
        .iter()
        .map(|s| format!("{}={}", s.name, if s.active { on } else { off }))
        .collect::<Vec<_>>()
        .join(" ")
}

impl PanelRenderer for LogRenderer {
    fn render(&mut self, snapshot: &PanelSnapshot, log: &[LogEntry]) {
        let coils = describe(&snapshot.coils, "ON", "OFF");
        let inputs = describe(&snapshot.inputs, "Active", "Inactive");
        let changed = self
            .last
            .as_ref()
            .map_or(true, |last| !last.same_state(snapshot));

        if changed {
            info!("Coils: {}", coils);
            info!("Discrete inputs: {}", inputs);
        } else {
            debug!("Coils: {} | Discrete inputs: {}", coils, inputs);
        }
        debug!("{} recent control action(s)", log.len());

        self.last = Some(snapshot.clone());
    }
}
