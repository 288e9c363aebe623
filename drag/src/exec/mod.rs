//! Serialized execution of the configured shell command.
//!
//! Every trigger (webhook, poller) goes through one [`ExecutionGate`], so at
//! most one command runs at any instant in the webhook-serving process.

pub mod gate;
pub mod shell;

pub use gate::{CommandRunner, ExecError, ExecutionGate, Trigger};
pub use shell::{run_blocking, shell_command, ShellRunner};
