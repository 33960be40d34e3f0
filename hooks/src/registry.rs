//! Shared on-disk registry of running engine processes
//!
//! One JSON file per user (`~/.local/share/sema/servers.json`) lists every
//! engine process believed to be running and the project it serves:
//!
//! ```json
//! [
//!   { "pid": 41213, "project_root": "/home/me/src/app", "port": 9102 }
//! ]
//! ```
//!
//! There is no lock. Writers publish with write-to-temp-then-rename, so a
//! reader always sees a complete document, and two writers racing each other
//! resolve as last-rename-wins. The file is bookkeeping, not a ledger: any
//! read problem degrades to an empty registry.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::error::RegistryError;

/// A single engine process record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// OS process id of the engine
    pub pid: u32,
    /// Canonical project directory the engine serves
    pub project_root: PathBuf,
    /// Fields this crate does not interpret (e.g. `port`), kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RegistryEntry {
    pub fn new(pid: u32, project_root: impl Into<PathBuf>) -> Self {
        Self {
            pid,
            project_root: project_root.into(),
            extra: Map::new(),
        }
    }

    /// Attach the port the engine listens on
    pub fn with_port(mut self, port: u16) -> Self {
        self.extra.insert("port".to_string(), Value::from(port));
        self
    }

    /// Port recorded by the engine, if any
    pub fn port(&self) -> Option<u16> {
        self.extra
            .get("port")
            .and_then(Value::as_u64)
            .and_then(|p| u16::try_from(p).ok())
    }
}

/// Snapshot of the registry as read from disk
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    /// Valid entries in file order
    pub entries: Vec<RegistryEntry>,
    /// Array elements that could not be read as entries
    pub dropped: usize,
}

impl Registry {
    /// Whether publishing `entries` would change what is on disk
    pub fn differs_from(&self, entries: &[RegistryEntry]) -> bool {
        self.dropped > 0 || self.entries.as_slice() != entries
    }

    fn from_json(content: &str) -> Self {
        let elements = match serde_json::from_str::<Value>(content) {
            Ok(Value::Array(elements)) => elements,
            Ok(other) => {
                debug!(kind = json_kind(&other), "Registry::from_json: not an array, treating as empty");
                return Self::default();
            }
            Err(e) => {
                debug!(error = %e, "Registry::from_json: invalid JSON, treating as empty");
                return Self::default();
            }
        };

        let mut registry = Self::default();
        for element in elements {
            match serde_json::from_value::<RegistryEntry>(element) {
                Ok(entry) => registry.entries.push(entry),
                Err(e) => {
                    debug!(error = %e, "Registry::from_json: dropping malformed entry");
                    registry.dropped += 1;
                }
            }
        }
        registry
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Reads and atomically rewrites the registry file
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file location
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the registry; never fails
    pub fn load(&self) -> Registry {
        debug!(path = ?self.path, "RegistryStore::load: called");
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let registry = Registry::from_json(&content);
                debug!(
                    entries = registry.entries.len(),
                    dropped = registry.dropped,
                    "RegistryStore::load: parsed"
                );
                registry
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("RegistryStore::load: no registry file");
                Registry::default()
            }
            Err(e) => {
                warn!(path = ?self.path, error = %e, "Registry unreadable, treating as empty");
                Registry::default()
            }
        }
    }

    /// Publish `entries` atomically
    ///
    /// The document is written to a uniquely named file beside the registry
    /// and renamed over it, so readers see either the old or the new content.
    pub fn save(&self, entries: &[RegistryEntry]) -> Result<(), RegistryError> {
        debug!(path = ?self.path, count = entries.len(), "RegistryStore::save: called");
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| RegistryError::NoParent(self.path.clone()))?;

        fs::create_dir_all(parent).map_err(|source| RegistryError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        let content = serde_json::to_string_pretty(entries)?;

        let mut temp = tempfile::Builder::new()
            .prefix(".servers-")
            .suffix(".json.tmp")
            .tempfile_in(parent)
            .map_err(|source| RegistryError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        write_document(&mut temp, content.as_bytes()).map_err(|source| RegistryError::Io {
            path: temp.path().to_path_buf(),
            source,
        })?;

        temp.persist(&self.path).map_err(|e| RegistryError::Persist {
            path: self.path.clone(),
            source: e.error,
        })?;

        debug!(path = ?self.path, "RegistryStore::save: published");
        Ok(())
    }

    /// Read-modify-write; saves only when the result differs from what was read
    ///
    /// Returns whether the file was written.
    pub fn update<F>(&self, f: F) -> Result<bool, RegistryError>
    where
        F: FnOnce(&[RegistryEntry]) -> Vec<RegistryEntry>,
    {
        let current = self.load();
        let next = f(&current.entries);
        if !current.differs_from(&next) {
            debug!("RegistryStore::update: unchanged, skipping write");
            return Ok(false);
        }
        self.save(&next)?;
        Ok(true)
    }

    /// Record an engine process for a project
    ///
    /// Any previous entry for the same project root is replaced. The engine
    /// calls this once it is about to serve its health endpoint.
    pub fn register(&self, entry: RegistryEntry) -> Result<(), RegistryError> {
        debug!(pid = entry.pid, project_root = ?entry.project_root, "RegistryStore::register: called");
        let pid = entry.pid;
        let root = entry.project_root.clone();
        self.update(move |entries| {
            let mut next: Vec<RegistryEntry> = entries
                .iter()
                .filter(|e| e.project_root != entry.project_root)
                .cloned()
                .collect();
            next.push(entry);
            next
        })?;
        info!(pid, project_root = ?root, "Registered engine process");
        Ok(())
    }
}

fn write_document(temp: &mut NamedTempFile, bytes: &[u8]) -> std::io::Result<()> {
    temp.write_all(bytes)?;
    temp.write_all(b"\n")?;
    temp.flush()?;
    temp.as_file().sync_all()
}
