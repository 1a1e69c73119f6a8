//! Error types for keel test orchestration

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for keel operations
pub type KeelResult<T> = Result<T, KeelError>;

/// Exit code used for every fatal error
pub const FATAL_EXIT_CODE: i32 = 1;

/// Errors raised while talking to the build daemon
#[derive(Error, Debug, Clone)]
pub enum DaemonError {
    /// The daemon could not be reached at all
    #[error("could not connect to the keel daemon at {endpoint}: {message}")]
    Unavailable { endpoint: String, message: String },

    /// The daemon has nothing to offer for the request
    #[error("{message}")]
    NotFound { message: String },

    /// The daemon refused the request in its current state
    #[error("{message}")]
    FailedPrecondition { message: String },

    /// The connection dropped or failed mid-call
    #[error("daemon connection failure: {message}")]
    Transport { message: String },

    /// The daemon sent something we could not decode
    #[error("unexpected daemon response: {message}")]
    Protocol { message: String },

    /// Any other error reported by the daemon, surfaced verbatim
    #[error("{message}")]
    Remote { code: String, message: String },
}

impl DaemonError {
    /// Create a new unavailable error
    pub fn unavailable(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a new transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a new protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Map a daemon error response onto a typed error
    pub fn from_remote(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "not_found" => Self::NotFound { message },
            "failed_precondition" => Self::FailedPrecondition { message },
            _ => Self::Remote {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Whether this is the daemon's "not found" signal
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<std::io::Error> for DaemonError {
    fn from(error: std::io::Error) -> Self {
        Self::transport(error.to_string())
    }
}

impl From<serde_json::Error> for DaemonError {
    fn from(error: serde_json::Error) -> Self {
        Self::protocol(error.to_string())
    }
}

/// Main error type for keel
#[derive(Error, Debug)]
pub enum KeelError {
    /// Configuration related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// No application root above the working directory
    #[error(
        "no keel.app found in {} or any parent directory.\nNote: run this command from inside a keel application.",
        .start.display()
    )]
    AppRootNotFound { start: PathBuf },

    /// Manifest project without a test command
    #[error(
        "application does not define any tests.\nNote: Add a 'test' script command to package.json to run tests."
    )]
    NoTestCommand,

    /// Daemon errors
    #[error(transparent)]
    Daemon(#[from] DaemonError),

    /// The test command could not be started or did not exit normally
    #[error("test command {command}: {message}")]
    Subprocess { command: String, message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Task was cancelled
    #[error("operation was cancelled")]
    Cancelled,
}

impl KeelError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new subprocess failure
    pub fn subprocess(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Subprocess {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Exit code the process should terminate with for this error
    pub fn exit_code(&self) -> i32 {
        FATAL_EXIT_CODE
    }
}
