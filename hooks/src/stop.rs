//! SessionEnd orchestration
//!
//! Stops the engine serving the session's project and prunes registry entries
//! whose processes are gone. Every step tolerates failure.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::RegistryError;
use crate::process::ProcessSupervisor;
use crate::registry::{RegistryEntry, RegistryStore};

/// Signal attempt against a registered engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationAttempt {
    pub pid: u32,
    pub delivered: bool,
}

/// What a stop call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Whether a registry file existed
    pub registry_present: bool,
    /// Entries matching the project that were signalled and dropped
    pub terminated: Vec<TerminationAttempt>,
    /// Entries for other projects dropped because their process is gone
    pub pruned: usize,
    /// Whether the registry was rewritten
    pub written: bool,
}

/// Stops the engine for a project and tidies the registry
pub struct StopCoordinator {
    store: RegistryStore,
    supervisor: Arc<dyn ProcessSupervisor>,
}

impl StopCoordinator {
    pub fn new(store: RegistryStore, supervisor: Arc<dyn ProcessSupervisor>) -> Self {
        Self { store, supervisor }
    }

    /// Run the stop flow for an already-resolved project directory
    pub fn run(&self, project_dir: &Path) -> Result<StopReport, RegistryError> {
        debug!(?project_dir, registry = ?self.store.path(), "StopCoordinator::run: called");
        let mut report = StopReport::default();

        if !self.store.exists() {
            debug!("StopCoordinator::run: no registry, nothing to do");
            return Ok(report);
        }
        report.registry_present = true;

        let mut terminated = Vec::new();
        let mut pruned = 0;
        let written = self.store.update(|entries| {
            let mut remaining: Vec<RegistryEntry> = Vec::with_capacity(entries.len());
            for entry in entries {
                if entry.project_root == project_dir {
                    // Dropped whether or not the signal lands
                    let delivered = self.supervisor.terminate(entry.pid);
                    info!(pid = entry.pid, delivered, "Sent SIGTERM to project engine");
                    terminated.push(TerminationAttempt {
                        pid: entry.pid,
                        delivered,
                    });
                } else if self.supervisor.is_alive(entry.pid) {
                    remaining.push(entry.clone());
                } else {
                    debug!(pid = entry.pid, project_root = ?entry.project_root, "Pruning dead registry entry");
                    pruned += 1;
                }
            }
            remaining
        })?;

        report.terminated = terminated;
        report.pruned = pruned;
        report.written = written;
        debug!(?report, "StopCoordinator::run: done");
        Ok(report)
    }
}
