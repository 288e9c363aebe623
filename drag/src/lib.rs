//! drag - Lightweight webhook daemon for containers.
//!
//! drag wraps a container's main service. It forks a webhook listener that
//! runs a shell command whenever an authenticated GitLab/GitHub push arrives,
//! optionally re-running it on a timer, and then execs the wrapped service in
//! its own place.
//!
//! ## Architecture
//!
//! ```text
//! POST → Signature check → Execution gate → sh -c $DRAG_COMMAND → 200/500
//!                              ↑
//!                     Interval poller (optional)
//! ```

pub mod config;
pub mod exec;
pub mod logging;
pub mod poller;
pub mod supervisor;
pub mod web;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use exec::{CommandRunner, ExecError, ExecutionGate, ShellRunner, Trigger};
pub use poller::{spawn_poller, Poller};
pub use web::{router, AppState};
