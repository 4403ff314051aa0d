// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! The core consumes [`RuntimeEvent`]s and produces an updated state plus a
//! list of commands for the IO shell (`engine::runtime::Runtime`), which
//! runs categories, raises markers and handles shutdown.
//!
//! It has no channels, no Tokio types and performs no IO, so every
//! scheduling decision can be unit tested directly.

use crate::engine::event_handlers::{CoreStep, handle_batch_finished, handle_trigger};
use crate::engine::{RuntimeEvent, RuntimeOptions};
use crate::service::{Dispatcher, ServiceState};
use crate::trigger::PendingTriggers;
use crate::types::{PrivilegeContext, SignalKind};

#[derive(Debug)]
pub struct ServiceCore {
    dispatcher: Dispatcher,
    pending: PendingTriggers,
    state: ServiceState,
    options: RuntimeOptions,
}

impl ServiceCore {
    /// A core for a registered service that has not run anything yet.
    pub fn new(dispatcher: Dispatcher, options: RuntimeOptions) -> Self {
        Self {
            dispatcher,
            pending: PendingTriggers::new(),
            state: ServiceState::Registered,
            options,
        }
    }

    pub fn context(&self) -> PrivilegeContext {
        self.dispatcher.context()
    }

    pub fn state(&self) -> ServiceState {
        self.state
    }

    /// Whether no batch is running.
    pub fn is_idle(&self) -> bool {
        self.state != ServiceState::Active
    }

    /// Number of distinct triggers waiting for the next batch.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Signals queued for a follow-up batch that has not started yet.
    pub fn pending_signals(&self) -> Vec<SignalKind> {
        self.pending.signals()
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::Triggered(trigger) => handle_trigger(
                &self.dispatcher,
                &mut self.pending,
                &mut self.state,
                &self.options,
                trigger,
            ),
            RuntimeEvent::BatchFinished => handle_batch_finished(
                &self.dispatcher,
                &mut self.pending,
                &mut self.state,
                &self.options,
            ),
            RuntimeEvent::ShutdownRequested => CoreStep::stop(),
        }
    }
}
