// src/trigger/pending.rs

use std::collections::BTreeSet;

use tracing::debug;

use crate::types::{SignalKind, Trigger};

/// Triggers that arrived while a run was in progress.
///
/// This is a set of flags rather than a counting queue: N arrivals of the
/// same trigger during one run produce exactly one follow-up run.
#[derive(Debug, Default)]
pub struct PendingTriggers {
    pending: BTreeSet<Trigger>,
}

impl PendingTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if there are no pending triggers.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Remember `trigger` for the next run. Returns `false` when it was
    /// already pending and has been coalesced.
    pub fn record(&mut self, trigger: Trigger) -> bool {
        let inserted = self.pending.insert(trigger);
        debug!(%trigger, inserted, "recorded pending trigger");
        inserted
    }

    /// Signals among the pending triggers.
    pub fn signals(&self) -> Vec<SignalKind> {
        self.pending
            .iter()
            .filter_map(|t| match t {
                Trigger::Signal(kind) => Some(*kind),
                Trigger::Lifecycle(_) => None,
            })
            .collect()
    }

    /// Take every pending trigger, in a stable order.
    pub fn drain(&mut self) -> Vec<Trigger> {
        let triggers: Vec<Trigger> = std::mem::take(&mut self.pending).into_iter().collect();
        debug!(drained = triggers.len(), "drained pending triggers");
        triggers
    }
}
