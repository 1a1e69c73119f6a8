//! Routing of `keel test` arguments
//!
//! Flag parsing is disabled for the test subcommand: everything after it is
//! handed to the underlying test runner, except for the handful of flags keel
//! understands itself. [`route_test_args`] pulls those out in a single forward
//! pass and leaves the rest untouched, in order.

use std::path::PathBuf;

/// Flags recognized by keel itself, as pulled out of the passthrough list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestArgs {
    /// Arguments forwarded untouched to the test runner
    pub passthrough: Vec<String>,
    /// `--trace <file>` / `--trace=<file>`
    pub trace_file: Option<PathBuf>,
    /// `--codegen-debug`
    pub codegen_debug: bool,
    /// `--prepare`
    pub prepare_only: bool,
    /// `--no-color`
    pub no_color: bool,
}

/// Outcome of routing the raw argument list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgRoute {
    /// `-h` / `--help` was seen; nothing should run
    Help,
    /// Run tests with the routed arguments
    Run(TestArgs),
}

/// Split keel's own flags from the test runner's arguments.
pub fn route_test_args<S: AsRef<str>>(raw: &[S]) -> ArgRoute {
    let mut routed = TestArgs::default();
    let mut tokens = raw.iter().map(AsRef::as_ref);

    while let Some(arg) = tokens.next() {
        match arg {
            "-h" | "--help" => return ArgRoute::Help,
            "--trace" => match tokens.next() {
                Some(value) => routed.trace_file = Some(PathBuf::from(value)),
                None => tracing::warn!("--trace given without a file; ignoring it"),
            },
            "--codegen-debug" => routed.codegen_debug = true,
            "--prepare" => routed.prepare_only = true,
            "--no-color" => routed.no_color = true,
            _ => match arg.strip_prefix("--trace=") {
                Some(value) => routed.trace_file = Some(PathBuf::from(value)),
                None => routed.passthrough.push(arg.to_string()),
            },
        }
    }

    ArgRoute::Run(routed)
}

/// Whether the test runner arguments ask for the structured test-event stream.
pub fn requests_json_events<S: AsRef<str>>(args: &[S]) -> bool {
    args.iter()
        .any(|arg| matches!(arg.as_ref(), "-json" | "--json" | "-json=true" | "--json=true"))
}
