//! SessionStart orchestration
//!
//! ```text
//! CHECKING_HEALTH ──alive──▶ AlreadyRunning
//!        │
//!        ▼
//! LOCATING_BINARY ──missing──▶ BinaryMissing
//!        │
//!        ▼
//!    LAUNCHING ──spawn error──▶ Failed
//!        │
//!        ▼
//!     POLLING ──▶ Ready | TimedOut
//! ```
//!
//! Startup is fire-and-forget: a slow engine still reports "started".

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::address::port_for_dir;
use crate::config::Config;
use crate::health::HealthProbe;
use crate::process::{BinaryLocator, LaunchConfig, ProcessSupervisor};

/// Launch and readiness settings
#[derive(Debug, Clone)]
pub struct StartSettings {
    pub engine_binary: String,
    pub serve_args: Vec<String>,
    pub install_hint: String,
    pub ready_poll_attempts: u32,
    pub ready_poll_interval: Duration,
}

impl Default for StartSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for StartSettings {
    fn from(config: &Config) -> Self {
        Self {
            engine_binary: config.engine_binary.clone(),
            serve_args: config.serve_args.clone(),
            install_hint: config.install_hint.clone(),
            ready_poll_attempts: config.ready_poll_attempts,
            ready_poll_interval: config.ready_poll_interval(),
        }
    }
}

/// Terminal state of a start attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// An engine already answered on the derived port
    AlreadyRunning { port: u16 },
    /// The engine executable is not on the search path
    BinaryMissing,
    /// Launched and answered a readiness probe
    Ready { port: u16, pid: u32 },
    /// Launched but did not answer within the polling budget
    TimedOut { port: u16, pid: u32 },
    /// Launch failed unexpectedly
    Failed { port: u16, reason: String },
}

impl StartOutcome {
    pub fn port(&self) -> Option<u16> {
        match self {
            StartOutcome::AlreadyRunning { port }
            | StartOutcome::Ready { port, .. }
            | StartOutcome::TimedOut { port, .. }
            | StartOutcome::Failed { port, .. } => Some(*port),
            StartOutcome::BinaryMissing => None,
        }
    }

    /// Human-readable status for the host session
    pub fn message(&self, settings: &StartSettings) -> String {
        let name = &settings.engine_binary;
        let serve = format!("{} {}", name, settings.serve_args.join(" "));
        let serve = serve.trim_end();
        match self {
            StartOutcome::AlreadyRunning { port } => format!(
                "{} already running (port {}); prefer `{} \"<complete question>\"` over grep.",
                serve, port, name
            ),
            StartOutcome::BinaryMissing => format!(
                "Warning: {} not found in PATH. Install with: {}",
                name, settings.install_hint
            ),
            StartOutcome::Ready { port, .. } | StartOutcome::TimedOut { port, .. } => format!(
                "{} started (port {}); prefer `{} \"<complete question>\"` over grep (plain output is agent-friendly).",
                serve, port, name
            ),
            StartOutcome::Failed { port, reason } => {
                format!("Warning: {} could not be started (port {}): {}", serve, port, reason)
            }
        }
    }
}

/// Brings up the engine for a project if it is not already serving
pub struct StartCoordinator {
    probe: Arc<dyn HealthProbe>,
    supervisor: Arc<dyn ProcessSupervisor>,
    locator: BinaryLocator,
    settings: StartSettings,
}

impl StartCoordinator {
    pub fn new(
        probe: Arc<dyn HealthProbe>,
        supervisor: Arc<dyn ProcessSupervisor>,
        locator: BinaryLocator,
        settings: StartSettings,
    ) -> Self {
        Self {
            probe,
            supervisor,
            locator,
            settings,
        }
    }

    pub fn settings(&self) -> &StartSettings {
        &self.settings
    }

    /// Run the start flow for an already-resolved project directory
    pub async fn run(&self, project_dir: &Path) -> StartOutcome {
        debug!(?project_dir, "StartCoordinator::run: called");
        let port = port_for_dir(project_dir);

        if self.probe.is_alive(port).await {
            info!(port, "Engine already running");
            return StartOutcome::AlreadyRunning { port };
        }

        let Some(program) = self.locator.locate(&self.settings.engine_binary) else {
            warn!(binary = %self.settings.engine_binary, "Engine executable not found on search path");
            return StartOutcome::BinaryMissing;
        };

        let launch = LaunchConfig::detached(program, self.settings.serve_args.clone(), project_dir);
        let pid = match self.supervisor.launch(&launch) {
            Ok(pid) => pid,
            Err(e) => {
                warn!(port, error = %e, "Failed to launch engine");
                return StartOutcome::Failed {
                    port,
                    reason: e.to_string(),
                };
            }
        };

        if self.wait_ready(port).await {
            info!(port, pid, "Engine ready");
            StartOutcome::Ready { port, pid }
        } else {
            info!(port, pid, "Engine launched but not yet answering");
            StartOutcome::TimedOut { port, pid }
        }
    }

    async fn wait_ready(&self, port: u16) -> bool {
        for attempt in 1..=self.settings.ready_poll_attempts {
            tokio::time::sleep(self.settings.ready_poll_interval).await;
            if self.probe.is_alive(port).await {
                debug!(port, attempt, "StartCoordinator::wait_ready: healthy");
                return true;
            }
        }
        false
    }
}
