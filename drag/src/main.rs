//! drag - webhook listener that wraps a container's main service.
//!
//! Usage: `drag <service> [args...]`
//!
//! Reads `DRAG_SECRET`, `DRAG_COMMAND` and optionally `DRAG_INIT` and
//! `DRAG_INTERVAL`, runs the init command once, then forks: the child serves
//! webhooks on port 1291 while this process execs `<service>`.

use anyhow::{Context, Result};
use tracing::info;

use drag::{supervisor, Config};

fn main() -> Result<()> {
    drag::logging::init();

    info!(version = env!("CARGO_PKG_VERSION"), "drag_starting");

    // Load configuration from environment
    let config = Config::from_env().context("Invalid configuration")?;
    info!(
        command = %config.command,
        init_configured = config.init_command.is_some(),
        interval = ?config.interval,
        port = config.port,
        "config_loaded"
    );

    let wrapped: Vec<String> = std::env::args().skip(1).collect();

    supervisor::run(config, wrapped)
}
