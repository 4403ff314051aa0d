// src/cli.rs

//! CLI argument parsing using `clap`.
//!
//! The host's service manager starts `outset serve` for each privilege
//! context and calls `outset lifecycle` for one-shot boot/login activations.
//! Installer postinstall steps call `outset signal on-demand`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{LifecycleEvent, PrivilegeContext, SignalKind};

/// Command-line arguments for `outset`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "outset",
    version,
    about = "Run queued scripts and packages at boot, at login, and on demand.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `$OUTSET_CONFIG`, else `/usr/local/outset/outset.toml`.
    /// A missing file means "all defaults".
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `OUTSET_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run the resident service for one privilege context.
    ///
    /// Watches that context's trigger markers until shut down.
    Serve {
        #[arg(long, value_name = "CONTEXT")]
        context: PrivilegeContext,

        /// Lifecycle event that caused this activation, processed first.
        #[arg(long, value_name = "EVENT")]
        lifecycle: Option<LifecycleEvent>,
    },

    /// Process one lifecycle event and exit when idle.
    Lifecycle {
        #[arg(value_name = "EVENT")]
        event: LifecycleEvent,

        #[arg(long, value_name = "CONTEXT")]
        context: PrivilegeContext,
    },

    /// Run a single category now, in the category's own context.
    Run {
        #[arg(value_name = "CATEGORY")]
        category: String,

        /// List what would run without executing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Create a trigger marker (used by installer postinstall steps).
    Signal {
        #[arg(value_name = "SIGNAL")]
        kind: SignalKind,
    },

    /// Create the queue layout and register both resident services.
    Install,

    /// De-register both resident services.
    Uninstall,

    /// Print services, categories, units with eligibility, ledgers and host
    /// facts.
    Status,

    /// Drop ledger records whose unit no longer exists.
    Cleanup {
        #[arg(long, value_name = "CONTEXT")]
        context: PrivilegeContext,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
