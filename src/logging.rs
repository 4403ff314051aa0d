// src/logging.rs

//! Logging setup for `outset` using `tracing` + `tracing-subscriber`.
//!
//! Filter selection, first match wins:
//! 1. `--log-level` CLI flag
//! 2. `OUTSET_LOG`, either a bare level ("debug") or a full filter
//!    directive ("outset::trigger=trace,info")
//! 3. `info`
//!
//! Logs go to STDERR; `status` and `run` reports use STDOUT. When STDERR is
//! not a terminal (the service manager's log file) colours are disabled.

use std::io::IsTerminal;

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

/// `notify` is chatty at debug level; keep it at warn unless asked.
const QUIET_DEPENDENCIES: &str = "notify=warn";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var("OUTSET_LOG").ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env.map(str::trim)) {
        (Some(lvl), _) => format!("{},{QUIET_DEPENDENCIES}", level_name(lvl)),
        (None, Some(spec)) if !spec.is_empty() => {
            if spec.contains('=') {
                spec.to_string()
            } else {
                format!("{spec},{QUIET_DEPENDENCIES}")
            }
        }
        _ => format!("info,{QUIET_DEPENDENCIES}"),
    };

    match EnvFilter::try_new(&directives) {
        Ok(filter) => Ok(filter),
        Err(e) => {
            eprintln!("outset: ignoring invalid OUTSET_LOG {directives:?}: {e}");
            Ok(EnvFilter::try_new(format!("info,{QUIET_DEPENDENCIES}"))?)
        }
    }
}

fn level_name(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
