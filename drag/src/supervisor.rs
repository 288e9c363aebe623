//! Process supervision: split into a webhook host and the wrapped service.
//!
//! ```text
//! drag <service> [args...]
//!   ├─ parent: exec(<service> [args...])   keeps the PID, becomes the service
//!   └─ child:  tokio runtime → poller + webhook listener, forever
//! ```
//!
//! The split happens before any thread exists, so the forked child starts
//! from a single-threaded image and builds its own runtime.

use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::Arc;

use anyhow::{anyhow, Context, Error, Result};
use nix::unistd::{fork, ForkResult, Pid};
use tracing::{info, warn};

use crate::exec::{run_blocking, ExecutionGate};
use crate::poller::spawn_poller;
use crate::web::{listen, AppState};
use crate::Config;

/// Which side of the split the current process is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Will replace itself with the wrapped service.
    Supervisor { child: Pid },
    /// Serves webhooks and runs the poller; never execs.
    WebhookHost,
}

/// Full startup after configuration has been loaded.
///
/// Runs the init command, splits, and then either serves webhooks or execs
/// the wrapped service. Without a wrapped service nothing is forked and this
/// process serves webhooks itself. Only returns on a fatal error or after a
/// graceful listener shutdown.
pub fn run(config: Config, wrapped: Vec<String>) -> Result<()> {
    if let Some(init) = &config.init_command {
        // Best effort; the outcome is already logged.
        let _ = run_blocking(init);
    }

    if wrapped.is_empty() {
        warn!("no_wrapped_service");
        return run_webhook_host(config);
    }

    match split()? {
        Role::WebhookHost => run_webhook_host(config),
        Role::Supervisor { child } => {
            info!(
                webhook_pid = child.as_raw(),
                service = ?wrapped,
                "exec_wrapped_service"
            );
            Err(exec_wrapped(&wrapped))
        }
    }
}

/// Fork into supervisor and webhook host.
///
/// Must be called while the process is still single-threaded.
pub fn split() -> Result<Role> {
    // SAFETY: no runtime or other thread has been started yet, so the child
    // is free to allocate, log and build its own runtime after the fork.
    match unsafe { fork() }.context("Failed to fork webhook process")? {
        ForkResult::Parent { child } => Ok(Role::Supervisor { child }),
        ForkResult::Child => Ok(Role::WebhookHost),
    }
}

/// Replace the current process image with `args[0] args[1..]`.
///
/// `PATH` is searched for the program. Only returns if the exec failed, and
/// the returned error is fatal.
pub fn exec_wrapped(args: &[String]) -> Error {
    let Some((program, rest)) = args.split_first() else {
        return anyhow!("No service command given to run");
    };

    let err = Command::new(program).args(rest).exec();
    Error::new(err).context(format!("Could not run {:?}", args))
}

/// Build the multi-threaded runtime and serve webhooks on it.
pub fn run_webhook_host(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    runtime.block_on(serve_webhooks(config))
}

/// Start the poller (if configured) and the webhook listener on one gate.
pub async fn serve_webhooks(config: Config) -> Result<()> {
    let gate = Arc::new(ExecutionGate::shell());

    let _poller = config
        .interval
        .map(|interval| spawn_poller(Arc::clone(&gate), config.command.clone(), interval));

    info!(
        port = config.port,
        poller_enabled = config.interval.is_some(),
        "webhook_host_starting"
    );

    listen(AppState::new(config, gate)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_wrapped_without_args() {
        let err = exec_wrapped(&[]);
        assert_eq!(err.to_string(), "No service command given to run");
    }

    #[test]
    fn test_exec_wrapped_missing_program() {
        let args = vec![
            "/nonexistent/drag-wrapped-service".to_string(),
            "--flag".to_string(),
        ];
        let err = exec_wrapped(&args);
        assert!(err.to_string().starts_with("Could not run"));
        assert!(err.to_string().contains("drag-wrapped-service"));
        let io = err.downcast_ref::<std::io::Error>().unwrap();
        assert_eq!(io.kind(), std::io::ErrorKind::NotFound);
    }
}
