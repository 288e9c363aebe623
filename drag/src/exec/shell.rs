//! Shell invocation of opaque command lines.
//!
//! Command strings are handed verbatim to the platform shell. Whoever controls
//! the environment controls what runs here.

use std::process::{Command, ExitStatus};

use futures::future::{BoxFuture, FutureExt};
use tracing::{error, info};

use super::gate::{CommandRunner, ExecError, Trigger};

/// Build a shell command appropriate for the platform.
///
/// stdio is inherited so command output ends up next to our own logs.
pub fn shell_command(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_line);
        c
    }
}

/// [`CommandRunner`] that runs each command line through `sh -c`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run<'a>(&'a self, command: &'a str) -> BoxFuture<'a, Result<(), ExecError>> {
        async move {
            let status = tokio::process::Command::from(shell_command(command))
                .status()
                .await
                .map_err(|source| ExecError::Spawn {
                    command: command.to_string(),
                    source,
                })?;
            check_status(command, status)
        }
        .boxed()
    }
}

/// Run a command line synchronously, outside any gate.
///
/// Used for the init command, which runs once before the runtime starts and
/// before the process split. Failures are logged and returned, never fatal.
pub fn run_blocking(command: &str) -> Result<(), ExecError> {
    let result = shell_command(command)
        .status()
        .map_err(|source| ExecError::Spawn {
            command: command.to_string(),
            source,
        })
        .and_then(|status| check_status(command, status));

    match &result {
        Ok(()) => info!(trigger = %Trigger::Init, command = %command, "command_succeeded"),
        Err(e) => error!(
            trigger = %Trigger::Init,
            command = %command,
            exit_code = ?e.code(),
            error = %e,
            "command_failed"
        ),
    }

    result
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), ExecError> {
    if status.success() {
        Ok(())
    } else {
        Err(ExecError::Failed {
            command: command.to_string(),
            code: status.code(),
        })
    }
}
