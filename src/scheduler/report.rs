// src/scheduler/report.rs

use std::fmt;

use tracing::{info, warn};

use crate::exec::UnitStatus;
use crate::registry::{Category, Unit};

/// Status of one executed unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    pub unit: Unit,
    pub status: UnitStatus,
}

/// Outcome of one `run_category` call, in execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category: Category,
    /// Every unit that was attempted, with its status.
    pub results: Vec<UnitResult>,
    /// `once` units left out because they already ran.
    pub skipped: Vec<Unit>,
}

impl CategoryReport {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            results: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &UnitResult> {
        self.results.iter().filter(|r| r.status.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &UnitResult> {
        self.results.iter().filter(|r| !r.status.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed().next().is_none()
    }

    /// File names of attempted units, in order.
    pub fn executed_names(&self) -> Vec<String> {
        self.results.iter().map(|r| r.unit.file_name()).collect()
    }

    pub fn log_summary(&self) {
        let failed = self.failed().count();
        if failed > 0 {
            warn!(
                category = %self.category,
                executed = self.results.len(),
                failed,
                skipped = self.skipped.len(),
                "category run finished with failures"
            );
            for r in self.failed() {
                warn!(category = %self.category, unit = ?r.unit.path, status = %r.status, "unit failed");
            }
        } else {
            info!(
                category = %self.category,
                executed = self.results.len(),
                skipped = self.skipped.len(),
                "category run finished"
            );
        }
    }
}

impl fmt::Display for CategoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.category)?;
        for r in self.results.iter() {
            writeln!(f, "  {:<40} {}", r.unit.file_name(), r.status)?;
        }
        for unit in self.skipped.iter() {
            writeln!(f, "  {:<40} already ran", unit.file_name())?;
        }
        Ok(())
    }
}
