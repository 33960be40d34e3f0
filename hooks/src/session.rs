//! Hook entry points
//!
//! Each hook reads its payload, resolves the project directory and runs its
//! coordinator. Neither returns an error: the host session must never fail
//! because of the engine.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::Config;
use crate::error::best_effort;
use crate::health::HttpHealthProbe;
use crate::payload::{HookOutput, HookPayload};
use crate::process::{BinaryLocator, OsProcessSupervisor};
use crate::registry::RegistryStore;
use crate::start::{StartCoordinator, StartOutcome, StartSettings};
use crate::stop::{StopCoordinator, StopReport};

/// Build a start coordinator wired to the real network and OS
pub fn start_coordinator(config: &Config) -> StartCoordinator {
    StartCoordinator::new(
        Arc::new(HttpHealthProbe::new(config.health_timeout())),
        Arc::new(OsProcessSupervisor::new()),
        BinaryLocator::new(config.search_path.clone()),
        StartSettings::from(config),
    )
}

/// Build a stop coordinator wired to the configured registry and the OS
pub fn stop_coordinator(config: &Config) -> StopCoordinator {
    StopCoordinator::new(
        RegistryStore::new(config.registry_path()),
        Arc::new(OsProcessSupervisor::new()),
    )
}

/// SessionStart: returns the single status line to print
pub async fn session_start(config: &Config, payload: &HookPayload) -> HookOutput {
    let project_dir = payload.project_dir();
    debug!(?project_dir, "session_start: called");

    let coordinator = start_coordinator(config);
    let outcome: StartOutcome = coordinator.run(&project_dir).await;
    info!(?outcome, "session_start: finished");
    HookOutput::session_start(outcome.message(coordinator.settings()))
}

/// SessionEnd: stops the project's engine; failures are logged and dropped
pub fn session_end(config: &Config, payload: &HookPayload) -> Option<StopReport> {
    let project_dir = payload.project_dir();
    debug!(?project_dir, "session_end: called");

    let report = best_effort("session-end", || stop_coordinator(config).run(&project_dir));
    if let Some(report) = &report
        && report.registry_present
    {
        info!(
            terminated = report.terminated.len(),
            pruned = report.pruned,
            written = report.written,
            "session_end: finished"
        );
    }
    report
}
