// src/scheduler/mod.rs

//! Execution scheduler.
//!
//! Given a category, resolve its units, drop `once` units that already ran
//! in this context, execute the rest strictly in order, and record each
//! success in the ledger before moving on. One failing unit never stops the
//! remaining ones.

pub mod report;

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::errors::{OutsetError, Result};
use crate::exec::{UnitExecutor, UnitStatus};
use crate::ledger::{Ledger, UnitIdentity};
use crate::registry::{Category, DirectoryRegistry, Unit};
use crate::types::{PrivilegeContext, RepeatPolicy};

pub use report::{CategoryReport, UnitResult};

/// Whether a unit would run on the next trigger of its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    Eligible,
    AlreadyRan,
    /// Content could not be read; the unit would be reported as failed.
    Unreadable(String),
}

/// Runs categories for exactly one privilege context.
pub struct Scheduler {
    context: PrivilegeContext,
    registry: DirectoryRegistry,
    ledger: Box<dyn Ledger>,
    executor: Arc<dyn UnitExecutor>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("context", &self.context)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        context: PrivilegeContext,
        registry: DirectoryRegistry,
        ledger: Box<dyn Ledger>,
        executor: Arc<dyn UnitExecutor>,
    ) -> Self {
        Self {
            context,
            registry,
            ledger,
            executor,
        }
    }

    pub fn context(&self) -> PrivilegeContext {
        self.context
    }

    pub fn registry(&self) -> &DirectoryRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &dyn Ledger {
        self.ledger.as_ref()
    }

    pub fn ledger_mut(&mut self) -> &mut dyn Ledger {
        self.ledger.as_mut()
    }

    fn check_context(&self, category: Category) -> Result<()> {
        if category.context() != self.context {
            return Err(OutsetError::ContextMismatch {
                category: category.name().to_string(),
                expected: category.context(),
                actual: self.context,
            });
        }
        Ok(())
    }

    fn identity(&self, unit: &Unit) -> std::result::Result<UnitIdentity, String> {
        UnitIdentity::of(self.registry.fs().as_ref(), &unit.path).map_err(|e| format!("{e:#}"))
    }

    /// Eligibility of every unit in `category`, without executing anything.
    pub fn eligible_units(&self, category: Category) -> Result<Vec<(Unit, Eligibility)>> {
        let units = self.registry.units_in(category)?;
        Ok(units
            .into_iter()
            .map(|unit| {
                let eligibility = match category.policy() {
                    RepeatPolicy::Every => Eligibility::Eligible,
                    RepeatPolicy::Once => match self.identity(&unit) {
                        Ok(id) if self.ledger.has_run(&id, self.context) => {
                            Eligibility::AlreadyRan
                        }
                        Ok(_) => Eligibility::Eligible,
                        Err(reason) => Eligibility::Unreadable(reason),
                    },
                };
                (unit, eligibility)
            })
            .collect())
    }

    /// Run every eligible unit of `category` in order.
    ///
    /// Only enumeration and context errors are returned; unit failures are
    /// reported in the `CategoryReport`.
    pub async fn run_category(&mut self, category: Category) -> Result<CategoryReport> {
        self.check_context(category)?;
        let units = self.registry.units_in(category)?;
        let policy = category.policy();

        info!(
            category = %category,
            context = %self.context,
            units = units.len(),
            "running category"
        );

        let mut report = CategoryReport::new(category);

        for unit in units {
            // Identity is only needed for run-once bookkeeping.
            let identity = match policy {
                RepeatPolicy::Every => None,
                RepeatPolicy::Once => match self.identity(&unit) {
                    Ok(id) => Some(id),
                    Err(reason) => {
                        error!(unit = ?unit.path, error = %reason, "cannot fingerprint unit");
                        report.results.push(UnitResult {
                            unit,
                            status: UnitStatus::LaunchFailed { reason },
                        });
                        continue;
                    }
                },
            };

            if let Some(ref id) = identity {
                if self.ledger.has_run(id, self.context) {
                    debug!(unit = %id, "once unit already ran; skipping");
                    report.skipped.push(unit);
                    continue;
                }
            }

            let status = self.executor.execute(&unit).await;

            // Mark before moving on so a crash mid-queue never re-runs units
            // that already completed.
            if status.is_success() {
                if let Some(ref id) = identity {
                    if let Err(e) = self.ledger.mark_run(id, self.context) {
                        error!(unit = %id, error = %e, "failed to record completed unit");
                    }
                }
            }

            report.results.push(UnitResult { unit, status });
        }

        report.log_summary();
        Ok(report)
    }
}
