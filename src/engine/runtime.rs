// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::engine::event_handlers::{CoreCommand, CoreStep};
use crate::errors::Result;
use crate::registry::Category;
use crate::scheduler::{CategoryReport, Scheduler};
use crate::trigger::TriggerMarker;
use crate::types::{SignalKind, Trigger};

use super::core::ServiceCore;
use super::{Batch, RuntimeEvent};

/// How an in-flight batch ended.
enum BatchOutcome {
    Finished(Vec<CategoryReport>),
    Shutdown,
}

/// Drives one context's resident service: feeds `RuntimeEvent`s into the
/// pure `ServiceCore` and carries out the commands it returns.
///
/// While a batch runs, events are still received so triggers arriving
/// mid-run are queued by the core instead of being lost. A shutdown during a
/// batch drops the batch future, which kills the running unit's process; that
/// unit is not marked as run. Signals still queued when the loop ends have
/// their markers raised again, so the next start serves them.
pub struct Runtime {
    core: ServiceCore,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    scheduler: Scheduler,
    markers: Vec<TriggerMarker>,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("core", &self.core)
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    /// `markers` are the markers this runtime may raise when escalating to
    /// another context.
    pub fn new(
        core: ServiceCore,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        scheduler: Scheduler,
        markers: Vec<TriggerMarker>,
    ) -> Self {
        Self {
            core,
            event_rx,
            scheduler,
            markers,
        }
    }

    /// Main event loop.
    ///
    /// Failed category runs are logged and never end the loop; only a
    /// shutdown request, a closed channel or one-shot idleness do.
    pub async fn run(mut self) -> Result<()> {
        info!(context = %self.core.context(), "outset service started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            let step = self.core.step(event);
            if !self.drive(step).await {
                info!("core requested exit; stopping runtime");
                break;
            }
        }

        self.requeue_pending_signals();
        info!(context = %self.core.context(), "runtime exiting");
        Ok(())
    }

    /// Execute the commands of `step`, then of every follow-up step produced
    /// by finished batches. Returns whether the loop should keep running.
    async fn drive(&mut self, mut step: CoreStep) -> bool {
        loop {
            let mut batch = None;
            for command in step.commands {
                match command {
                    CoreCommand::Escalate(signals) => self.escalate(&signals),
                    CoreCommand::RunBatch(b) => batch = Some(b),
                    CoreCommand::RequestExit => info!("core issued RequestExit command"),
                }
            }

            if !step.keep_running {
                return false;
            }

            let Some(batch) = batch else {
                return true;
            };

            match self.run_batch(batch).await {
                BatchOutcome::Finished(reports) => {
                    let failed: usize = reports.iter().map(|r| r.failed().count()).sum();
                    debug!(categories = reports.len(), failed, "batch finished");
                    step = self.core.step(RuntimeEvent::BatchFinished);
                }
                BatchOutcome::Shutdown => return false,
            }
        }
    }

    fn escalate(&self, signals: &[SignalKind]) {
        for signal in signals {
            match self.markers.iter().find(|m| m.kind() == *signal) {
                Some(marker) => {
                    if let Err(e) = marker.raise() {
                        error!(%signal, error = %e, "failed to escalate to other context");
                    }
                }
                None => warn!(%signal, "no marker configured for escalation"),
            }
        }
    }

    /// Queued signals, and signals still buffered in the closed channel, had
    /// their markers removed by the watcher; put them back.
    fn requeue_pending_signals(&mut self) {
        let mut signals = self.core.pending_signals();
        self.event_rx.close();
        while let Ok(event) = self.event_rx.try_recv() {
            if let RuntimeEvent::Triggered(Trigger::Signal(kind)) = event {
                if !signals.contains(&kind) {
                    signals.push(kind);
                }
            }
        }
        if signals.is_empty() {
            return;
        }
        warn!(?signals, "stopping with queued signals; re-raising their markers");
        for signal in signals {
            match self.markers.iter().find(|m| m.kind() == signal) {
                Some(marker) => {
                    if let Err(e) = marker.raise() {
                        error!(%signal, error = %e, "failed to re-raise queued signal");
                    }
                }
                None => warn!(%signal, "no marker configured; queued signal dropped"),
            }
        }
    }

    async fn run_batch(&mut self, batch: Batch) -> BatchOutcome {
        info!(triggers = ?batch.triggers, categories = ?batch.categories, "starting batch");

        let Self {
            core,
            event_rx,
            scheduler,
            ..
        } = self;

        let work = run_categories(scheduler, &batch.categories);
        tokio::pin!(work);

        loop {
            tokio::select! {
                reports = &mut work => return BatchOutcome::Finished(reports),
                Some(event) = event_rx.recv() => {
                    debug!(?event, "runtime received event during batch");
                    if matches!(event, RuntimeEvent::ShutdownRequested) {
                        warn!("shutdown requested during batch; terminating running unit");
                        return BatchOutcome::Shutdown;
                    }
                    // While active the core only queues triggers.
                    let step = core.step(event);
                    if !step.keep_running {
                        return BatchOutcome::Shutdown;
                    }
                }
            }
        }
    }
}

/// Run `categories` in order. A failing category is logged and the next one
/// still runs.
async fn run_categories(scheduler: &mut Scheduler, categories: &[Category]) -> Vec<CategoryReport> {
    let mut reports = Vec::new();
    for category in categories.iter().copied() {
        match scheduler.run_category(category).await {
            Ok(report) => reports.push(report),
            Err(e) if e.is_configuration() => {
                warn!(category = %category, error = %e, "category not runnable; skipping");
            }
            Err(e) => {
                error!(category = %category, error = %e, "category run failed");
            }
        }
    }
    reports
}
