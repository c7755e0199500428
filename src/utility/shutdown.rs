// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-modbus-simulator project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Cooperative cancellation for long-running tasks
//!
//! The daemon keeps a [`ShutdownTrigger`]; every task receives a
//! [`ShutdownSignal`] and selects on [`ShutdownSignal::wait`] next to its own
//! suspension point (timer tick, network accept). A task is therefore only
//! ever interrupted while it is suspended, never in the middle of a
//! datastore access.
//!
//! ```
//! use rust_modbus_simulator::utility::shutdown;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let (trigger, mut signal) = shutdown::channel();
//! trigger.trigger();
//! signal.wait().await;
//! assert!(signal.is_triggered());
//! # }
//! ```

use tokio::sync::watch;

/// Create a connected trigger/signal pair.
pub fn channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

/// Owner side: requests shutdown of every subscribed task.
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    /// Signal every subscriber. Calling it twice is harmless.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// A new signal for one more task.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Task side of the shutdown channel.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been requested.
    ///
    /// A dropped trigger counts as a shutdown request, so orphaned tasks stop.
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|stop| *stop).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn late_subscribers_see_the_request() {
        let (trigger, _signal) = channel();
        trigger.trigger();
        let mut late = trigger.subscribe();
        tokio::time::timeout(Duration::from_secs(1), late.wait())
            .await
            .expect("wait should resolve immediately");
    }

    #[tokio::test]
    async fn dropped_trigger_releases_waiters() {
        let (trigger, mut signal) = channel();
        drop(trigger);
        tokio::time::timeout(Duration::from_secs(1), signal.wait())
            .await
            .expect("wait should resolve once the trigger is gone");
        assert!(!signal.is_triggered());
    }
}
