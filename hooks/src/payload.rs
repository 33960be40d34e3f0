//! Hook input and output documents

use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

/// JSON document the host writes to the hook's stdin
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HookPayload {
    /// Session working directory
    #[serde(default)]
    pub cwd: Option<String>,
}

impl HookPayload {
    /// Parse a payload; anything unusable is treated as `{}`
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Self::default();
        }
        match serde_json::from_str(input) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(error = %e, "HookPayload::parse: invalid payload, using defaults");
                Self::default()
            }
        }
    }

    /// Read and parse stdin
    pub fn from_reader<R: Read>(mut reader: R) -> Self {
        let mut input = String::new();
        if let Err(e) = reader.read_to_string(&mut input) {
            debug!(error = %e, "HookPayload::from_reader: failed to read input");
            return Self::default();
        }
        Self::parse(&input)
    }

    /// Canonical project directory for this session
    ///
    /// Uses `cwd` when present and non-empty, else the process working
    /// directory.
    pub fn project_dir(&self) -> PathBuf {
        let raw = match self.cwd.as_deref().filter(|c| !c.is_empty()) {
            Some(cwd) => PathBuf::from(cwd),
            None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        };
        resolve_dir(&raw)
    }
}

/// Symlink-free absolute form of `path`, or `path` itself if that fails
pub fn resolve_dir(path: &Path) -> PathBuf {
    match path.canonicalize() {
        Ok(resolved) => resolved,
        Err(e) => {
            debug!(?path, error = %e, "resolve_dir: canonicalize failed, using raw path");
            path.to_path_buf()
        }
    }
}

/// Single line a SessionStart hook prints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookOutput {
    pub hook_specific_output: HookSpecificOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HookSpecificOutput {
    pub hook_event_name: String,
    pub additional_context: String,
}

impl HookOutput {
    pub fn session_start(context: impl Into<String>) -> Self {
        Self {
            hook_specific_output: HookSpecificOutput {
                hook_event_name: "SessionStart".to_string(),
                additional_context: context.into(),
            },
        }
    }

    /// Serialize as one JSON line (no trailing newline)
    pub fn to_line(&self) -> String {
        // A struct of two strings always serializes
        serde_json::to_string(self).unwrap_or_default()
    }
}
