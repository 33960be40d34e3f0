//! Configuration for the sema session hooks

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Hook configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine executable name looked up on the search path
    pub engine_binary: String,

    /// Arguments that start the engine's server
    pub serve_args: Vec<String>,

    /// Install command shown when the engine is missing
    pub install_hint: String,

    /// Registry file override
    pub registry_path: Option<PathBuf>,

    /// Executable search path override (PATH syntax)
    pub search_path: Option<String>,

    /// Timeout for a single health probe
    pub health_timeout_ms: u64,

    /// Number of readiness probes after launch
    pub ready_poll_attempts: u32,

    /// Delay before each readiness probe
    pub ready_poll_interval_ms: u64,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_binary: "sema".to_string(),
            serve_args: vec!["serve".to_string()],
            install_hint: "curl -fsSL https://sema.sh/install.sh | sh".to_string(),
            registry_path: None,
            search_path: None,
            health_timeout_ms: 500,
            ready_poll_attempts: 30,
            ready_poll_interval_ms: 100,
            log_level: None,
        }
    }
}

/// Base directory for sema's per-user state (`~/.local/share/sema`)
///
/// The engine uses this literal location on every platform, so this does not
/// follow `dirs::data_local_dir`.
pub fn state_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("sema")
}

/// Default user config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sema").join("hooks.yml"))
}

impl Config {
    /// Load config from an explicit path, the user config file, or defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        debug!(?config_path, "Config::load: called");
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        if let Some(user_config) = default_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        debug!("Config::load: no config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        debug!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Registry file in effect
    pub fn registry_path(&self) -> PathBuf {
        self.registry_path
            .clone()
            .unwrap_or_else(|| state_dir().join("servers.json"))
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_millis(self.health_timeout_ms)
    }

    pub fn ready_poll_interval(&self) -> Duration {
        Duration::from_millis(self.ready_poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.engine_binary, "sema");
        assert_eq!(config.serve_args, vec!["serve"]);
        assert_eq!(config.health_timeout(), Duration::from_millis(500));
        assert_eq!(config.ready_poll_attempts, 30);
        assert_eq!(config.ready_poll_interval(), Duration::from_millis(100));
        assert!(config.install_hint.contains("install.sh"));
    }

    #[test]
    fn test_default_registry_path() {
        let config = Config::default();
        assert!(config.registry_path().ends_with(".local/share/sema/servers.json"));
    }

    #[test]
    fn test_registry_path_override() {
        let config = Config {
            registry_path: Some(PathBuf::from("/custom/servers.json")),
            ..Default::default()
        };
        assert_eq!(config.registry_path(), PathBuf::from("/custom/servers.json"));
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hooks.yml");
        fs::write(&path, "engine_binary: sema-dev\nhealth_timeout_ms: 250\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.engine_binary, "sema-dev");
        assert_eq!(config.health_timeout_ms, 250);
        assert_eq!(config.ready_poll_attempts, 30);
        assert_eq!(config.serve_args, vec!["serve"]);
    }

    #[test]
    fn test_explicit_missing_config_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("hooks.yml");
        fs::write(&path, "health_timeout_ms: [not, a, number]\n").unwrap();
        assert!(Config::load(Some(&path)).is_err());
    }
}
