//! Error types and the best-effort wrapper used by the hooks

use std::path::PathBuf;

use thiserror::Error;
use tracing::warn;

/// Errors from reading or publishing the server registry
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode registry: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Failed to publish registry to {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry path has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// Errors from launching the engine
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Working directory does not exist: {0}")]
    MissingWorkingDir(PathBuf),
}

/// Run a fallible operation whose failure must not reach the caller
///
/// Errors are logged at WARN and collapse to `None`.
pub fn best_effort<T, E, F>(label: &str, op: F) -> Option<T>
where
    F: FnOnce() -> Result<T, E>,
    E: std::fmt::Display,
{
    match op() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(operation = label, error = %e, "best-effort operation failed, continuing");
            None
        }
    }
}
