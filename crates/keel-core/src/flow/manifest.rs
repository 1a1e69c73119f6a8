//! Manifest-based projects: the daemon resolves the test command, keel runs it

use crate::daemon::{DaemonClient, TestSpec, TestSpecRequest};
use crate::error::{KeelError, KeelResult};
use crate::interrupt::InterruptHandle;
use std::io::Write;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Resolve the project's test command and run it, or print its environment
/// when `prepare_only` is set.
///
/// Returns the exit code the process should finish with.
#[instrument(skip_all, fields(app_root = %request.app_root.display(), prepare_only = prepare_only))]
pub async fn run_manifest_flow<D, W>(
    daemon: &D,
    request: TestSpecRequest,
    prepare_only: bool,
    interrupt: &InterruptHandle,
    out: &mut W,
) -> KeelResult<i32>
where
    D: DaemonClient + ?Sized,
    W: Write,
{
    let spec = tokio::select! {
        biased;
        _ = interrupt.cancelled() => return Err(KeelError::Cancelled),
        result = daemon.test_spec(request) => result.map_err(|e| {
            if e.is_not_found() {
                KeelError::NoTestCommand
            } else {
                KeelError::from(e)
            }
        })?,
    };

    if prepare_only {
        for entry in &spec.environ {
            writeln!(out, "{entry}")?;
        }
        out.flush()?;
        return Ok(0);
    }

    run_test_command(&spec, interrupt).await
}

/// Run the resolved command with the terminal attached and wait for it.
async fn run_test_command(spec: &TestSpec, interrupt: &InterruptHandle) -> KeelResult<i32> {
    let mut cmd = Command::new(&spec.command);
    cmd.args(&spec.args)
        .env_clear()
        .envs(parse_environ(&spec.environ))
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let mut child = cmd
        .spawn()
        .map_err(|e| KeelError::subprocess(&spec.command, format!("failed to start: {e}")))?;
    info!(command = %spec.command, pid = ?child.id(), "started test command");

    // The child is in our process group and gets a terminal Ctrl-C itself.
    let status = tokio::select! {
        status = child.wait() => status,
        _ = interrupt.cancelled() => {
            debug!(reason = ?interrupt.reason(), "interrupted, waiting for test command to exit");
            child.wait().await
        }
    }
    .map_err(|e| KeelError::subprocess(&spec.command, format!("failed to wait: {e}")))?;

    match status.code() {
        Some(code) => {
            debug!(code, "test command exited");
            Ok(code)
        }
        None => Err(KeelError::subprocess(&spec.command, describe_abnormal_exit(status))),
    }
}

/// Split `KEY=VALUE` entries; entries without a key are skipped.
fn parse_environ(environ: &[String]) -> impl Iterator<Item = (&str, &str)> {
    environ.iter().filter_map(|entry| match entry.split_once('=') {
        Some((key, value)) if !key.is_empty() => Some((key, value)),
        _ => {
            debug!(entry = %entry, "skipping malformed environment entry");
            None
        }
    })
}

#[cfg(unix)]
fn describe_abnormal_exit(status: ExitStatus) -> String {
    use std::os::unix::process::ExitStatusExt;

    match status.signal() {
        Some(signal) => format!("terminated by signal {signal}"),
        None => format!("exited abnormally ({status})"),
    }
}

#[cfg(not(unix))]
fn describe_abnormal_exit(status: ExitStatus) -> String {
    format!("exited abnormally ({status})")
}
