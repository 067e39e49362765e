//! Connectivity poller: samples each endpoint's socket on a fixed cadence.
//!
//! DESIGN
//! ======
//! The poller is a spawned task owned through `Poller`. Each tick reads the
//! three ready states and publishes the derived `Statuses` on a `watch`
//! channel, notifying subscribers only when the triple actually changed. The
//! first tick fires one full period after spawn, so every endpoint reads as
//! waiting until then.
//!
//! LIFECYCLE
//! =========
//! `shutdown` (or dropping the `Poller`) aborts the task. No probe is read and
//! no status is published after that.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::socket::ReadyProbe;
use crate::status::{Endpoint, Statuses};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The three probes the poller samples.
#[derive(Clone)]
pub struct ProbeSet {
    pub chat: Arc<dyn ReadyProbe>,
    pub goal: Arc<dyn ReadyProbe>,
    pub map: Arc<dyn ReadyProbe>,
}

impl ProbeSet {
    #[must_use]
    pub fn get(&self, endpoint: Endpoint) -> &dyn ReadyProbe {
        match endpoint {
            Endpoint::Chat => self.chat.as_ref(),
            Endpoint::Goal => self.goal.as_ref(),
            Endpoint::Map => self.map.as_ref(),
        }
    }
}

/// Read every probe once.
#[must_use]
pub fn poll_once(probes: &ProbeSet) -> Statuses {
    Statuses::from_ready_states(|endpoint| probes.get(endpoint).ready_state())
}

/// Handle to the running poll task.
#[derive(Debug)]
pub struct Poller {
    statuses: watch::Receiver<Statuses>,
    task: Option<JoinHandle<()>>,
}

impl Poller {
    /// Start polling `probes` every `period`.
    ///
    /// # Panics
    ///
    /// Panics if `period` is zero; configuration rejects that earlier.
    #[must_use]
    pub fn spawn(probes: ProbeSet, period: Duration) -> Self {
        let (tx, rx) = watch::channel(Statuses::waiting());
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(period_ms = period.as_millis(), "connectivity poller started");
        let task = tokio::spawn(async move {
            loop {
                ticker.tick().await;
                let next = poll_once(&probes);
                tx.send_if_modified(|current| {
                    if *current == next {
                        return false;
                    }
                    debug!(from = %current, to = %next, "endpoint status changed");
                    *current = next;
                    true
                });
            }
        });

        Self { statuses: rx, task: Some(task) }
    }

    /// Latest published statuses.
    #[must_use]
    pub fn current(&self) -> Statuses {
        *self.statuses.borrow()
    }

    /// Receiver notified whenever the status triple changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Statuses> {
        self.statuses.clone()
    }

    /// Cancel the poll task and wait for it to wind down.
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            info!("connectivity poller stopped");
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
#[path = "poller_test.rs"]
mod tests;
