//! CLI commands
