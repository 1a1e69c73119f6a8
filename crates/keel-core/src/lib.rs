//! Keel Core Library
//!
//! Test orchestration for the keel CLI: argument routing, app root discovery,
//! the two test flows (manifest-based and daemon-streamed), and conversion of
//! streamed test output for display.

pub mod args;
pub mod config;
pub mod daemon;
pub mod error;
pub mod flow;
pub mod interrupt;
pub mod output;
pub mod project;

// Re-export commonly used types
pub use args::{ArgRoute, TestArgs, route_test_args};
pub use config::KeelConfig;
pub use daemon::{DaemonClient, DaemonEndpoint, SocketDaemonClient};
pub use error::{DaemonError, KeelError, KeelResult};
pub use flow::{TestInvocation, current_environ, run_tests};
pub use interrupt::{InterruptHandle, InterruptReason};
pub use output::{OutputConverter, select_converter};
pub use project::{AppLocation, ProjectKind, locate_app_root};
