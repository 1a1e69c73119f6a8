//! Application root discovery and project kind detection

use crate::error::{KeelError, KeelResult};
use std::path::{Path, PathBuf};

/// Marker file identifying a keel application root
pub const APP_MARKER_FILE: &str = "keel.app";

/// Package manifest whose presence selects the manifest flow
pub const PACKAGE_MANIFEST_FILE: &str = "package.json";

/// How tests for a project are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    /// The daemon hands back a command line that keel runs as a child process
    ManifestBased,
    /// The daemon compiles and runs the tests, streaming output back
    Compiled,
}

impl ProjectKind {
    /// Decide which flow applies to the app at `app_root`.
    ///
    /// `--prepare` only has meaning for manifest projects, so it forces that flow.
    pub fn detect(app_root: &Path, prepare_only: bool) -> Self {
        if prepare_only || app_root.join(PACKAGE_MANIFEST_FILE).exists() {
            Self::ManifestBased
        } else {
            Self::Compiled
        }
    }
}

/// Location of the app and of the directory the user invoked keel from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppLocation {
    /// Directory holding `keel.app`
    pub app_root: PathBuf,
    /// Invocation directory relative to `app_root` (`.` at the root)
    pub working_dir: PathBuf,
}

/// Walk up from `start` until a directory with `keel.app` is found.
pub fn locate_app_root(start: &Path) -> KeelResult<AppLocation> {
    let root = start
        .ancestors()
        .find(|dir| dir.join(APP_MARKER_FILE).is_file())
        .ok_or_else(|| KeelError::AppRootNotFound {
            start: start.to_path_buf(),
        })?;

    let relative = start.strip_prefix(root).unwrap_or(Path::new(""));
    let working_dir = if relative.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        relative.to_path_buf()
    };

    tracing::debug!(app_root = %root.display(), working_dir = %working_dir.display(), "located app root");

    Ok(AppLocation {
        app_root: root.to_path_buf(),
        working_dir,
    })
}
