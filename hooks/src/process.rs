//! Engine process control
//!
//! Launching, liveness checks and termination go through [`ProcessSupervisor`]
//! so the coordinators can be exercised against fakes.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::error::LaunchError;

/// How to launch the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchConfig {
    /// Executable to run
    pub program: PathBuf,
    /// Arguments passed to the executable
    pub args: Vec<String>,
    /// Working directory of the new process
    pub working_dir: PathBuf,
    /// Start the child in its own session so it outlives the caller
    pub detach_from_parent: bool,
    /// Share the caller's stdin/stdout/stderr
    pub inherit_streams: bool,
}

impl LaunchConfig {
    /// Detached launch with no inherited streams
    pub fn detached(program: impl Into<PathBuf>, args: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
            detach_from_parent: true,
            inherit_streams: false,
        }
    }
}

/// OS process capabilities needed by the coordinators
pub trait ProcessSupervisor: Send + Sync {
    /// Start a process and return its pid without waiting for it
    fn launch(&self, config: &LaunchConfig) -> Result<u32, LaunchError>;

    /// Whether `pid` exists and can be signalled by us
    fn is_alive(&self, pid: u32) -> bool;

    /// Request graceful termination; returns whether the signal was delivered
    fn terminate(&self, pid: u32) -> bool;
}

/// [`ProcessSupervisor`] backed by real processes and signals
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessSupervisor;

impl OsProcessSupervisor {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSupervisor for OsProcessSupervisor {
    fn launch(&self, config: &LaunchConfig) -> Result<u32, LaunchError> {
        debug!(?config, "OsProcessSupervisor::launch: called");
        if !config.working_dir.is_dir() {
            return Err(LaunchError::MissingWorkingDir(config.working_dir.clone()));
        }

        let mut cmd = Command::new(&config.program);
        cmd.args(&config.args).current_dir(&config.working_dir);

        if !config.inherit_streams {
            cmd.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::null());
        }

        if config.detach_from_parent {
            detach(&mut cmd);
        }

        let child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: config.program.clone(),
            source,
        })?;

        // Dropping the handle does not wait on or kill the child
        let pid = child.id();
        info!(pid, program = ?config.program, cwd = ?config.working_dir, "Launched engine process");
        Ok(pid)
    }

    fn is_alive(&self, pid: u32) -> bool {
        let result = signalable(pid).is_some_and(is_process_running);
        debug!(pid, result, "OsProcessSupervisor::is_alive: checked");
        result
    }

    fn terminate(&self, pid: u32) -> bool {
        let result = signalable(pid).is_some_and(send_terminate);
        debug!(pid, result, "OsProcessSupervisor::terminate: signalled");
        result
    }
}

/// Pids that are safe to pass to `kill(2)` as a single process
///
/// 0 and negative values address process groups.
fn signalable(pid: u32) -> Option<i32> {
    i32::try_from(pid).ok().filter(|&p| p > 0)
}

fn is_process_running(pid: i32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        // Signal 0 checks existence and permission without delivering anything
        kill(Pid::from_raw(pid), None).is_ok()
    }

    #[cfg(windows)]
    {
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH"])
            .output()
            .map(|o| !o.stdout.is_empty() && !String::from_utf8_lossy(&o.stdout).contains("No tasks"))
            .unwrap_or(false)
    }
}

fn send_terminate(pid: i32) -> bool {
    #[cfg(unix)]
    {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid), Signal::SIGTERM).is_ok()
    }

    #[cfg(windows)]
    {
        // Without /F taskkill asks the process to close
        Command::new("taskkill")
            .args(["/PID", &pid.to_string()])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: setsid is async-signal-safe and touches no parent state
    unsafe {
        cmd.pre_exec(|| {
            nix::unistd::setsid().map_err(std::io::Error::from)?;
            Ok(())
        });
    }
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;

    const DETACHED_PROCESS: u32 = 0x0000_0008;
    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    cmd.creation_flags(DETACHED_PROCESS | CREATE_NEW_PROCESS_GROUP);
}

/// Locates the engine executable on a search path
#[derive(Debug, Clone, Default)]
pub struct BinaryLocator {
    /// PATH-style override; `None` uses the process environment
    search_path: Option<String>,
}

impl BinaryLocator {
    pub fn new(search_path: Option<String>) -> Self {
        Self { search_path }
    }

    /// Absolute path of `name`, or `None` when it is not installed
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/"));
                which::which_in(name, Some(paths), cwd).ok()
            }
            None => which::which(name).ok(),
        };
        debug!(name, ?found, "BinaryLocator::locate: searched");
        found
    }
}
