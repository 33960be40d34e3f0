//! End-to-end tests driving the sema-hook binary

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use sema_hooks::{RegistryEntry, RegistryStore, port_for_dir};
use tempfile::TempDir;

/// Isolated HOME, config, registry and empty search path
struct Sandbox {
    root: TempDir,
}

impl Sandbox {
    fn new() -> Self {
        let sandbox = Self {
            root: TempDir::new().expect("Failed to create temp dir"),
        };
        fs::create_dir_all(sandbox.bin_dir()).unwrap();
        fs::create_dir_all(sandbox.project()).unwrap();
        let config = format!(
            "registry_path: {}\nsearch_path: {}\nhealth_timeout_ms: 100\nready_poll_attempts: 3\nready_poll_interval_ms: 20\n",
            sandbox.registry_path().display(),
            sandbox.bin_dir().display()
        );
        fs::write(sandbox.config_path(), config).unwrap();
        sandbox
    }

    fn home(&self) -> PathBuf {
        self.root.path().join("home")
    }

    fn bin_dir(&self) -> PathBuf {
        self.root.path().join("bin")
    }

    fn project(&self) -> PathBuf {
        self.root.path().join("project")
    }

    fn config_path(&self) -> PathBuf {
        self.root.path().join("hooks.yml")
    }

    fn registry_path(&self) -> PathBuf {
        self.root.path().join("state").join("servers.json")
    }

    fn store(&self) -> RegistryStore {
        RegistryStore::new(self.registry_path())
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("sema-hook").expect("binary should build");
        cmd.env("HOME", self.home())
            .env("XDG_CONFIG_HOME", self.home().join(".config"))
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path());
        cmd
    }

    fn payload(&self, dir: &Path) -> String {
        serde_json::json!({ "cwd": dir, "session_id": "test" }).to_string()
    }
}

fn single_context_line(stdout: &[u8]) -> String {
    let text = String::from_utf8(stdout.to_vec()).expect("stdout should be UTF-8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 1, "expected exactly one line, got {:?}", text);

    let value: serde_json::Value = serde_json::from_str(lines[0]).expect("hook output should be JSON");
    assert_eq!(value["hookSpecificOutput"]["hookEventName"], "SessionStart");
    value["hookSpecificOutput"]["additionalContext"]
        .as_str()
        .expect("additionalContext should be a string")
        .to_string()
}

#[test]
fn test_session_start_missing_binary_warns_with_install_hint() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .arg("session-start")
        .write_stdin(sandbox.payload(&sandbox.project()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let context = single_context_line(&output);
    assert!(context.starts_with("Warning: sema not found in PATH"));
    assert!(context.contains("Install with: curl -fsSL https://sema.sh/install.sh | sh"));
}

#[test]
fn test_session_start_tolerates_garbage_input() {
    let sandbox = Sandbox::new();
    let output = sandbox
        .cmd()
        .current_dir(sandbox.project())
        .arg("session-start")
        .write_stdin("this is not json")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    assert!(single_context_line(&output).contains("not found"));
}

#[test]
fn test_session_start_tolerates_unreadable_config() {
    let sandbox = Sandbox::new();
    fs::write(sandbox.config_path(), "ready_poll_attempts: [broken").unwrap();
    let output = sandbox
        .cmd()
        .env("PATH", sandbox.bin_dir())
        .arg("session-start")
        .write_stdin(sandbox.payload(&sandbox.project()))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    // Falls back to defaults, so exactly one status line still comes out
    single_context_line(&output);
}

#[test]
fn test_session_end_without_registry_is_silent() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("session-end")
        .write_stdin(sandbox.payload(&sandbox.project()))
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(!sandbox.registry_path().exists());
    assert!(!sandbox.registry_path().parent().unwrap().exists());
    // Not even a log file
    assert!(!sandbox.home().join(".local").exists());
}

#[test]
fn test_session_end_with_empty_stdin() {
    let sandbox = Sandbox::new();
    sandbox.store().save(&[]).unwrap();

    sandbox
        .cmd()
        .current_dir(sandbox.project())
        .arg("session-end")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    assert!(sandbox.store().load().entries.is_empty());
}

#[cfg(unix)]
#[test]
fn test_register_then_session_end_terminates_engine() {
    use std::os::unix::process::ExitStatusExt;

    let sandbox = Sandbox::new();
    let mut engine = std::process::Command::new("sleep").arg("30").spawn().unwrap();
    let project = sandbox.project().canonicalize().unwrap();

    sandbox
        .cmd()
        .args(["register", "--pid", &engine.id().to_string(), "--project-root"])
        .arg(&project)
        .args(["--port", &port_for_dir(&project).to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered pid"));

    let other = RegistryEntry::new(std::process::id(), "/some/other/project");
    let mut entries = sandbox.store().load().entries;
    entries.push(other.clone());
    sandbox.store().save(&entries).unwrap();

    sandbox
        .cmd()
        .arg("session-end")
        .write_stdin(sandbox.payload(&project))
        .assert()
        .success();

    let status = engine.wait().unwrap();
    assert_eq!(status.signal(), Some(15));
    assert_eq!(sandbox.store().load().entries, vec![other]);
}

#[cfg(unix)]
#[test]
fn test_session_end_prunes_dead_entries() {
    let sandbox = Sandbox::new();
    let mut dead = std::process::Command::new("true").spawn().unwrap();
    let dead_pid = dead.id();
    dead.wait().unwrap();

    let live = RegistryEntry::new(std::process::id(), "/live/project").with_port(9001);
    sandbox
        .store()
        .save(&[live.clone(), RegistryEntry::new(dead_pid, "/dead/project")])
        .unwrap();

    sandbox
        .cmd()
        .arg("session-end")
        .write_stdin(sandbox.payload(&sandbox.project()))
        .assert()
        .success();

    assert_eq!(sandbox.store().load().entries, vec![live]);
}

#[test]
fn test_port_matches_library_derivation() {
    let sandbox = Sandbox::new();
    let expected = port_for_dir(&sandbox.project().canonicalize().unwrap());

    sandbox
        .cmd()
        .arg("port")
        .arg(sandbox.project())
        .assert()
        .success()
        .stdout(format!("{}\n", expected));
}

#[test]
fn test_status_lists_registered_engines() {
    let sandbox = Sandbox::new();
    sandbox
        .store()
        .save(&[RegistryEntry::new(std::process::id(), "/listed/project")])
        .unwrap();

    sandbox
        .cmd()
        .arg("status")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(predicate::str::contains("/listed/project"))
        .stdout(predicate::str::contains("alive"));
}

#[test]
fn test_status_without_registry() {
    let sandbox = Sandbox::new();
    sandbox
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("No registry file"));
}
