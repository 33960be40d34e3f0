//! CLI argument parsing for sema-hook

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sema-hook")]
#[command(author, version, about = "Starts and stops the per-project sema engine for agent sessions", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// SessionStart hook: ensure the engine is serving this project
    SessionStart,

    /// SessionEnd hook: stop this project's engine and prune the registry
    SessionEnd,

    /// Record a running engine in the registry
    Register {
        /// Engine process id
        #[arg(long)]
        pid: u32,

        /// Project directory the engine serves
        #[arg(long)]
        project_root: PathBuf,

        /// Port the engine listens on
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show registered engines and whether they are alive
    Status,

    /// Print the derived engine port for a directory
    Port {
        /// Project directory (default: current directory)
        dir: Option<PathBuf>,
    },
}
