//! Test execution flows
//!
//! - `manifest` - daemon resolves a command line, keel runs it as a child
//! - `stream` - daemon compiles and runs the tests, keel relays the output
//!
//! [`run_tests`] picks the flow for the project and wires it to the
//! terminal.

pub mod manifest;
pub mod stream;

pub use manifest::run_manifest_flow;
pub use stream::run_stream_flow;

use crate::args::TestArgs;
use crate::daemon::{DaemonClient, TestRequest, TestSpecRequest};
use crate::error::KeelResult;
use crate::interrupt::InterruptHandle;
use crate::output::select_converter;
use crate::project::{AppLocation, ProjectKind};
use tracing::info;

/// Everything needed to run tests once
#[derive(Debug, Clone)]
pub struct TestInvocation {
    pub location: AppLocation,
    pub args: TestArgs,
    /// `KEY=VALUE` entries forwarded to the daemon
    pub environ: Vec<String>,
    /// Colorize rendered log output
    pub color: bool,
}

impl TestInvocation {
    /// `color` is the configured default; `--no-color` turns it off.
    pub fn new(location: AppLocation, args: TestArgs, environ: Vec<String>, color: bool) -> Self {
        let color = color && !args.no_color;
        Self {
            location,
            args,
            environ,
            color,
        }
    }

    pub fn spec_request(&self) -> TestSpecRequest {
        TestSpecRequest {
            app_root: self.location.app_root.clone(),
            working_dir: self.location.working_dir.clone(),
            args: self.args.passthrough.clone(),
            environ: self.environ.clone(),
        }
    }

    pub fn test_request(&self) -> TestRequest {
        TestRequest {
            app_root: self.location.app_root.clone(),
            working_dir: self.location.working_dir.clone(),
            args: self.args.passthrough.clone(),
            environ: self.environ.clone(),
            trace_file: self.args.trace_file.clone(),
            codegen_debug: self.args.codegen_debug,
        }
    }
}

/// Run tests for `invocation` against the terminal's stdio.
///
/// Returns the exit code the process should finish with.
pub async fn run_tests<D>(daemon: &D, invocation: &TestInvocation, interrupt: &InterruptHandle) -> KeelResult<i32>
where
    D: DaemonClient + ?Sized,
{
    let kind = ProjectKind::detect(&invocation.location.app_root, invocation.args.prepare_only);
    info!(?kind, app_root = %invocation.location.app_root.display(), "running tests");

    match kind {
        ProjectKind::ManifestBased => {
            let mut stdout = std::io::stdout();
            run_manifest_flow(
                daemon,
                invocation.spec_request(),
                invocation.args.prepare_only,
                interrupt,
                &mut stdout,
            )
            .await
        }
        ProjectKind::Compiled => {
            let converter = select_converter(&invocation.args.passthrough, invocation.color);
            run_stream_flow(
                daemon,
                invocation.test_request(),
                converter.as_ref(),
                interrupt,
                tokio::io::stdout(),
                tokio::io::stderr(),
            )
            .await
        }
    }
}

/// The current process environment as `KEY=VALUE` entries
pub fn current_environ() -> Vec<String> {
    std::env::vars_os()
        .map(|(key, value)| format!("{}={}", key.to_string_lossy(), value.to_string_lossy()))
        .collect()
}
