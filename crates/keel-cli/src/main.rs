//! Keel CLI
//!
//! Runs an application's tests through the keel build daemon.
//!
//! # Installation
//!
//! ```bash
//! cargo install --path crates/keel-cli
//! ```
//!
//! # Logging
//!
//! Logs go to stderr, filtered by `KEEL_LOG` (or `log_level` in the config
//! file), then `RUST_LOG`, defaulting to `warn`.

mod args;
mod commands;
mod console;
mod router;
mod signal_handler;

use anyhow::Context;
use clap::Parser;
use keel_core::config::KeelConfig;
use keel_core::error::{FATAL_EXIT_CODE, KeelError};
use tracing_subscriber::EnvFilter;

use args::Cli;

fn main() {
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            console::CliConsole::new().error(&format!("{e:#}"));
            e.downcast_ref::<KeelError>()
                .map_or(FATAL_EXIT_CODE, KeelError::exit_code)
        }
    };

    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = KeelConfig::load().context("failed to load keel configuration")?;
    init_logging(&config);
    if !config.color {
        colored::control::set_override(false);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start the async runtime")?;

    Ok(runtime.block_on(router::route(cli, config))?)
}

/// Initialize logging to stderr; stdout carries test output
fn init_logging(config: &KeelConfig) {
    let filter = if config.log_level.is_some() {
        EnvFilter::try_new(config.log_filter()).map_err(|_| ())
    } else {
        EnvFilter::try_from_default_env().map_err(|_| ())
    }
    .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(config.color)
        .init();
}
