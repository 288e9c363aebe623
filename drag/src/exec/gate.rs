//! The execution gate: one lock, held for the whole life of a command.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::shell::ShellRunner;

/// What caused a command execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Init,
    Webhook,
    Poller,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Init => write!(f, "init"),
            Trigger::Webhook => write!(f, "webhook"),
            Trigger::Poller => write!(f, "poller"),
        }
    }
}

/// A command that did not complete successfully.
///
/// Never fatal; callers map it to an HTTP status or a log line.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("could not start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {}", exit_description(.code))]
    Failed { command: String, code: Option<i32> },
}

impl ExecError {
    /// Exit code of the failed command, `None` if it never ran or was signalled.
    pub fn code(&self) -> Option<i32> {
        match self {
            ExecError::Spawn { .. } => None,
            ExecError::Failed { code, .. } => *code,
        }
    }
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Runs one command line to completion.
///
/// Implementations must not return before the command has exited; the gate
/// relies on that to keep executions from overlapping.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<(), ExecError>>;
}

/// Process-wide mutual exclusion around command execution.
///
/// Concurrent callers block on the lock and each runs its own invocation in
/// turn; nothing is coalesced or dropped. There is no timeout, so a hung
/// command blocks every later trigger.
pub struct ExecutionGate {
    lock: Mutex<()>,
    runner: Arc<dyn CommandRunner>,
}

impl ExecutionGate {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            lock: Mutex::new(()),
            runner,
        }
    }

    /// Gate backed by the platform shell.
    pub fn shell() -> Self {
        Self::new(Arc::new(ShellRunner))
    }

    /// Acquire the lock, run `command`, and release the lock once it exits.
    pub async fn run(&self, command: &str, trigger: Trigger) -> Result<(), ExecError> {
        let waited = Instant::now();
        let _guard = self.lock.lock().await;
        debug!(
            trigger = %trigger,
            waited_ms = waited.elapsed().as_millis() as u64,
            "execution_gate_acquired"
        );

        let started = Instant::now();
        let result = self.runner.run(command).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(()) => info!(
                trigger = %trigger,
                command = %command,
                duration_ms = duration_ms,
                "command_succeeded"
            ),
            Err(e) => error!(
                trigger = %trigger,
                command = %command,
                exit_code = ?e.code(),
                duration_ms = duration_ms,
                error = %e,
                "command_failed"
            ),
        }

        result
    }
}
