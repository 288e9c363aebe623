//! Interval poller: re-runs the command on a fixed cadence.
//!
//! The poller shares the webhook listener's [`ExecutionGate`], so a timer run
//! waits for an in-flight webhook run and vice versa. There is no jitter,
//! backoff or skip-if-busy.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info};

use crate::exec::{ExecutionGate, Trigger};

/// Handle to a running poller.
pub struct Poller {
    abort: AbortHandle,
    watcher: JoinHandle<()>,
}

impl Poller {
    /// Stop the poller at its next await point.
    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Wait until the poller has ended, by panic or abort.
    pub async fn finished(self) {
        let _ = self.watcher.await;
    }
}

/// Start the poller on the current runtime.
///
/// A panic inside the loop ends the poller only; it is logged and the rest of
/// the process keeps serving.
pub fn spawn_poller(gate: Arc<ExecutionGate>, command: String, interval: Duration) -> Poller {
    info!(
        interval_ms = interval.as_millis() as u64,
        command = %command,
        "poller_starting"
    );

    let task = tokio::spawn(poll_loop(gate, command, interval));
    let abort = task.abort_handle();

    let watcher = tokio::spawn(async move {
        match task.await {
            Ok(()) => info!("poller_stopped"),
            Err(e) if e.is_panic() => error!(error = %e, "poller_terminated"),
            Err(_) => debug!("poller_cancelled"),
        }
    });

    Poller { abort, watcher }
}

async fn poll_loop(gate: Arc<ExecutionGate>, command: String, interval: Duration) {
    let mut runs: u64 = 0;
    loop {
        tokio::time::sleep(interval).await;
        runs += 1;
        // Failures are already logged by the gate.
        let success = gate.run(&command, Trigger::Poller).await.is_ok();
        debug!(runs = runs, success = success, "poller_tick");
    }
}
