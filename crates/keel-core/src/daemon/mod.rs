//! Client side of the keel build daemon
//!
//! The daemon owns compilation and test execution; this module only knows how
//! to ask it for work and how to consume what it streams back.
//!
//! ## Calls
//!
//! - `test_spec`: resolve the command line for a manifest project
//! - `run_test`: compile and run tests, streaming output until an exit status

pub mod protocol;
pub mod socket;

pub use protocol::{
    DaemonRequest, DaemonResponse, FrameTarget, OutputFrame, StreamEvent, TestRequest, TestSpec,
    TestSpecRequest,
};
pub use socket::SocketDaemonClient;

use crate::error::DaemonError;
use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Ordered stream of events from a running test
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, DaemonError>> + Send>>;

/// Operations the CLI needs from the daemon
#[async_trait]
pub trait DaemonClient: Send + Sync {
    /// Resolve how to run tests for a manifest-based project
    async fn test_spec(&self, request: TestSpecRequest) -> Result<TestSpec, DaemonError>;

    /// Start a test run for a compiled project.
    ///
    /// When `cancel` fires the client tells the daemon to stop and closes its
    /// side of the connection; the returned stream then ends after the events
    /// that were already received.
    async fn run_compiled_test(
        &self,
        request: TestRequest,
        cancel: CancellationToken,
    ) -> Result<EventStream, DaemonError>;
}

/// Where the daemon listens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DaemonEndpoint {
    /// Unix domain socket path
    Unix(PathBuf),
    /// TCP `host:port`
    Tcp(String),
}

impl Default for DaemonEndpoint {
    fn default() -> Self {
        if cfg!(unix) {
            let base = dirs::cache_dir().unwrap_or_else(std::env::temp_dir);
            Self::Unix(base.join("keel").join("daemon.sock"))
        } else {
            Self::Tcp("127.0.0.1:7437".to_string())
        }
    }
}

impl fmt::Display for DaemonEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => write!(f, "tcp:{addr}"),
        }
    }
}
