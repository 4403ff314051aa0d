// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`unit_runner`] runs one unit as a child process via
//!   `tokio::process::Command` and maps its exit status.
//! - [`backend`] provides the `UnitExecutor` trait and the production
//!   `ProcessExecutor`; tests replace it with a fake.

use std::fmt;

pub mod backend;
pub mod unit_runner;

pub use backend::{ProcessExecutor, UnitExecutor};

/// Outcome of executing one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitStatus {
    Succeeded,
    /// Exited unsuccessfully. `code` is `None` when killed by a signal.
    Failed { code: Option<i32> },
    /// Could not be started at all.
    LaunchFailed { reason: String },
}

impl UnitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, UnitStatus::Succeeded)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitStatus::Succeeded => f.write_str("ok"),
            UnitStatus::Failed { code: Some(code) } => write!(f, "failed (exit {code})"),
            UnitStatus::Failed { code: None } => f.write_str("failed (killed)"),
            UnitStatus::LaunchFailed { reason } => write!(f, "launch failed: {reason}"),
        }
    }
}
