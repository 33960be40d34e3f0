//! sema-hook - agent session hooks for the sema engine
//!
//! CLI entry point. The `session-*` hooks always exit zero; the other
//! commands report errors normally.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, warn};

use sema_hooks::cli::{Cli, Command};
use sema_hooks::config::{Config, state_dir};
use sema_hooks::health::{HealthProbe, HttpHealthProbe};
use sema_hooks::payload::{HookPayload, resolve_dir};
use sema_hooks::process::{OsProcessSupervisor, ProcessSupervisor};
use sema_hooks::registry::{RegistryEntry, RegistryStore};
use sema_hooks::{port_for_dir, session};

fn parse_level(level: Option<&str>) -> tracing::Level {
    match level.map(|s| s.to_uppercase()).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}

/// Log file created on first write, so a hook that logs nothing leaves no trace
struct LazyLogFile {
    path: PathBuf,
    file: Option<File>,
}

impl LazyLogFile {
    fn new(path: PathBuf) -> Self {
        Self { path, file: None }
    }

    fn file(&mut self) -> io::Result<&mut File> {
        if self.file.is_none() {
            if let Some(dir) = self.path.parent() {
                fs::create_dir_all(dir)?;
            }
            let file = fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
            self.file = Some(file);
        }
        self.file
            .as_mut()
            .ok_or_else(|| io::Error::other("log file unavailable"))
    }
}

impl Write for LazyLogFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(file) => file.flush(),
            None => Ok(()),
        }
    }
}

/// Log to a file; stdout belongs to the hook protocol
fn setup_logging(level: Option<&str>) -> Result<()> {
    let log_file = LazyLogFile::new(state_dir().join("logs").join("hooks.log"));

    let level = parse_level(level);
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .try_init()
        .map_err(|e| eyre::eyre!("Failed to install log subscriber: {}", e))?;

    debug!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(cli.config.as_ref());
    let level = cli
        .log_level
        .clone()
        .or_else(|| loaded.as_ref().ok().and_then(|c| c.log_level.clone()));
    // Hooks run without logging rather than fail
    let is_hook = matches!(cli.command, Command::SessionStart | Command::SessionEnd);
    if let Err(e) = setup_logging(level.as_deref())
        && !is_hook
    {
        eprintln!("Warning: logging disabled: {:#}", e);
    }

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::SessionStart => {
            let config = hook_config(loaded);
            cmd_session_start(&config).await;
            Ok(())
        }
        Command::SessionEnd => {
            let config = hook_config(loaded);
            cmd_session_end(&config);
            Ok(())
        }
        Command::Register {
            pid,
            project_root,
            port,
        } => {
            let config = loaded.context("Failed to load configuration")?;
            cmd_register(&config, pid, &project_root, port)
        }
        Command::Status => {
            let config = loaded.context("Failed to load configuration")?;
            cmd_status(&config).await
        }
        Command::Port { dir } => cmd_port(dir.as_deref()),
    }
}

fn hook_config(loaded: Result<Config>) -> Config {
    loaded.unwrap_or_else(|e| {
        warn!(error = %e, "Using default configuration");
        Config::default()
    })
}

/// Emit exactly one status line for the host
async fn cmd_session_start(config: &Config) {
    let payload = HookPayload::from_reader(std::io::stdin().lock());
    let output = session::session_start(config, &payload).await;

    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{}", output.to_line()).and_then(|_| stdout.flush()) {
        warn!(error = %e, "Failed to write hook output");
    }
}

fn cmd_session_end(config: &Config) {
    let payload = HookPayload::from_reader(std::io::stdin().lock());
    session::session_end(config, &payload);
}

fn cmd_register(config: &Config, pid: u32, project_root: &std::path::Path, port: Option<u16>) -> Result<()> {
    let project_root = resolve_dir(project_root);
    let mut entry = RegistryEntry::new(pid, &project_root);
    if let Some(port) = port {
        entry = entry.with_port(port);
    }

    let store = RegistryStore::new(config.registry_path());
    store
        .register(entry)
        .context(format!("Failed to register engine in {}", store.path().display()))?;
    println!(
        "{} Registered pid {} for {}",
        "✓".green(),
        pid,
        project_root.display().to_string().cyan()
    );
    Ok(())
}

async fn cmd_status(config: &Config) -> Result<()> {
    let store = RegistryStore::new(config.registry_path());
    println!("Registry: {}", store.path().display().to_string().cyan());
    if !store.exists() {
        println!("No registry file");
        return Ok(());
    }

    let registry = store.load();
    if registry.entries.is_empty() {
        println!("No engines registered");
    }

    let supervisor = OsProcessSupervisor::new();
    let probe = HttpHealthProbe::new(config.health_timeout());
    for entry in &registry.entries {
        let port = entry.port().unwrap_or_else(|| port_for_dir(&entry.project_root));
        let process = if supervisor.is_alive(entry.pid) {
            "alive".green()
        } else {
            "dead".red()
        };
        let health = if probe.is_alive(port).await {
            "healthy".green()
        } else {
            "not answering".yellow()
        };
        println!(
            "  {} {} {} {} {}",
            entry.pid.to_string().yellow(),
            process,
            format!(":{}", port).dimmed(),
            health,
            entry.project_root.display()
        );
    }

    if registry.dropped > 0 {
        println!("{} {} malformed entries", "!".yellow(), registry.dropped);
    }
    Ok(())
}

fn cmd_port(dir: Option<&std::path::Path>) -> Result<()> {
    let raw = match dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    println!("{}", port_for_dir(&resolve_dir(&raw)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level(Some("debug")), tracing::Level::DEBUG);
        assert_eq!(parse_level(Some("Warning")), tracing::Level::WARN);
        assert_eq!(parse_level(Some("nonsense")), tracing::Level::INFO);
        assert_eq!(parse_level(None), tracing::Level::INFO);
    }

    #[test]
    fn test_lazy_log_file_created_on_first_write() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("logs").join("hooks.log");
        let mut log = LazyLogFile::new(path.clone());

        log.flush().unwrap();
        assert!(!path.parent().unwrap().exists());

        log.write_all(b"first\n").unwrap();
        log.write_all(b"second\n").unwrap();
        log.flush().unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
