// src/exec/backend.rs

//! Pluggable unit executor.
//!
//! The scheduler talks to a `UnitExecutor` instead of spawning processes
//! itself, so tests can swap in a fake that records what ran.

use std::future::Future;
use std::pin::Pin;

use crate::exec::UnitStatus;
use crate::exec::unit_runner::run_unit;
use crate::registry::Unit;

/// Trait abstracting how a single unit is executed.
pub trait UnitExecutor: Send + Sync {
    /// Run `unit` to completion. Implementations report every failure
    /// through the returned status.
    fn execute<'a>(
        &'a self,
        unit: &'a Unit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>>;
}

/// Real executor: one child process per unit.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    package_installer: Vec<String>,
}

impl ProcessExecutor {
    /// `package_installer` is the program plus leading arguments used for
    /// package units; the package path is appended.
    pub fn new(package_installer: Vec<String>) -> Self {
        Self { package_installer }
    }
}

impl UnitExecutor for ProcessExecutor {
    fn execute<'a>(
        &'a self,
        unit: &'a Unit,
    ) -> Pin<Box<dyn Future<Output = UnitStatus> + Send + 'a>> {
        Box::pin(run_unit(unit, &self.package_installer))
    }
}
