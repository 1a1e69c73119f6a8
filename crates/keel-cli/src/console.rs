//! CLI console utilities

use colored::*;

/// Formatted messages on stderr; stdout belongs to the test output
pub struct CliConsole;

impl CliConsole {
    pub const fn new() -> Self {
        Self
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }
}

impl Default for CliConsole {
    fn default() -> Self {
        Self::new()
    }
}
