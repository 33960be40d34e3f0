//! sema-hooks - session lifecycle for the sema engine
//!
//! An agent host runs `sema-hook session-start` when a session opens and
//! `sema-hook session-end` when it closes. The start hook makes sure a
//! `sema serve` process is answering for the session's project; the end hook
//! stops it and tidies the shared registry of running engines.
//!
//! # Rendezvous
//!
//! Independent processes find a project's engine without talking to each
//! other: the port is a pure function of the project's canonical path (see
//! [`address`]). The engine itself records `{pid, project_root}` in the
//! per-user registry (see [`registry`]) so the end hook knows what to signal.
//!
//! # Modules
//!
//! - [`address`] - FNV-1a port derivation
//! - [`health`] - HTTP health probe
//! - [`process`] - launch, liveness and termination of OS processes
//! - [`registry`] - shared registry file with atomic publish
//! - [`start`] / [`stop`] - the two coordinators
//! - [`session`] - hook entry points wiring the above together

pub mod address;
pub mod cli;
pub mod config;
pub mod error;
pub mod health;
pub mod payload;
pub mod process;
pub mod registry;
pub mod session;
pub mod start;
pub mod stop;

pub use address::{PORT_BASE, PORT_SPAN, fnv1a64, port_for_bytes, port_for_dir};
pub use config::Config;
pub use error::{LaunchError, RegistryError, best_effort};
pub use health::{HealthProbe, HttpHealthProbe};
pub use payload::{HookOutput, HookPayload, resolve_dir};
pub use process::{BinaryLocator, LaunchConfig, OsProcessSupervisor, ProcessSupervisor};
pub use registry::{Registry, RegistryEntry, RegistryStore};
pub use start::{StartCoordinator, StartOutcome, StartSettings};
pub use stop::{StopCoordinator, StopReport, TerminationAttempt};
