//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands;
use keel_core::config::KeelConfig;
use keel_core::error::KeelResult;

/// Route CLI commands to their handlers, returning the process exit code
pub async fn route(cli: Cli, config: KeelConfig) -> KeelResult<i32> {
    match cli.command {
        Commands::Test { args } => commands::test::execute(args, &config).await,
    }
}
