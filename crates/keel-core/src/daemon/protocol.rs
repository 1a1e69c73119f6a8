//! Daemon wire protocol
//!
//! Uses JSON-Lines: one request line from the client, then one or more
//! response lines from the daemon on the same connection.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parameters of a `test_spec` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpecRequest {
    pub app_root: PathBuf,
    pub working_dir: PathBuf,
    pub args: Vec<String>,
    /// `KEY=VALUE` entries of the invoking environment
    pub environ: Vec<String>,
}

/// Parameters of a `run_test` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestRequest {
    pub app_root: PathBuf,
    pub working_dir: PathBuf,
    pub args: Vec<String>,
    /// `KEY=VALUE` entries of the invoking environment
    pub environ: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_file: Option<PathBuf>,
    #[serde(default)]
    pub codegen_debug: bool,
}

/// How to run a manifest project's own test command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestSpec {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Complete environment for the child, as `KEY=VALUE` entries
    #[serde(default)]
    pub environ: Vec<String>,
}

/// Request from the CLI to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", content = "params", rename_all = "snake_case")]
pub enum DaemonRequest {
    TestSpec(TestSpecRequest),
    RunTest(TestRequest),
    /// Sent on a `run_test` connection to stop the run
    Cancel,
}

impl DaemonRequest {
    /// Serialize request to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}

/// Terminal stream a frame is destined for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameTarget {
    Stdout,
    Stderr,
}

/// One chunk of test output, normally a single line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFrame {
    pub target: FrameTarget,
    pub data: Vec<u8>,
}

impl OutputFrame {
    pub fn stdout(data: impl Into<Vec<u8>>) -> Self {
        Self {
            target: FrameTarget::Stdout,
            data: data.into(),
        }
    }

    pub fn stderr(data: impl Into<Vec<u8>>) -> Self {
        Self {
            target: FrameTarget::Stderr,
            data: data.into(),
        }
    }
}

/// One message of a running test stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Output(OutputFrame),
    /// Build diagnostics rendered by the daemon
    Diagnostics(String),
    /// The run finished with this exit code
    Exit(i32),
}

/// Response line from the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DaemonResponse {
    TestSpec(TestSpec),
    Output { stream: FrameTarget, data: String },
    Diagnostics { message: String },
    Exit { code: i32 },
    Error { code: String, message: String },
}

impl DaemonResponse {
    /// Parse response from JSON line
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line.trim())
    }

    /// Serialize response to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        Ok(format!("{}\n", serde_json::to_string(self)?))
    }
}
