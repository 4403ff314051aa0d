// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use tracing::{debug, info};

use crate::engine::{Batch, RuntimeOptions};
use crate::service::{Dispatcher, ServiceState, ServiceTransition};
use crate::trigger::PendingTriggers;
use crate::types::{SignalKind, Trigger};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Raise these markers so another context's service runs the work.
    Escalate(Vec<SignalKind>),
    /// Run these categories, in order, then report `BatchFinished`.
    RunBatch(Batch),
    /// Request that the process exits (one-shot mode, idle).
    RequestExit,
}

/// Decision returned by the core after handling a single `RuntimeEvent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn continue_with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    pub fn stop() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

/// Move `state` along `transition`. The core only asks for transitions that
/// are valid from the states it produces, so a rejection is logged and the
/// state is left as is.
pub(crate) fn transition(state: &mut ServiceState, transition: ServiceTransition) {
    match state.apply(transition) {
        Ok(next) => {
            debug!(from = %state, to = %next, "service state change");
            *state = next;
        }
        Err(e) => debug!(error = %e, "ignored service state transition"),
    }
}

/// Plan a batch for `triggers`: categories deduplicated in trigger order,
/// escalations collected alongside.
pub fn plan_batch(dispatcher: &Dispatcher, triggers: Vec<Trigger>) -> Vec<CoreCommand> {
    let mut categories = Vec::new();
    let mut escalate = Vec::new();

    for trigger in triggers.iter() {
        let plan = dispatcher.plan(*trigger);
        for category in plan.run {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        for signal in plan.escalate {
            if !escalate.contains(&signal) {
                escalate.push(signal);
            }
        }
    }

    let mut commands = Vec::new();
    if !escalate.is_empty() {
        commands.push(CoreCommand::Escalate(escalate));
    }
    if !categories.is_empty() {
        commands.push(CoreCommand::RunBatch(Batch {
            triggers,
            categories,
        }));
    }
    commands
}

fn starts_batch(commands: &[CoreCommand]) -> bool {
    commands
        .iter()
        .any(|c| matches!(c, CoreCommand::RunBatch(_)))
}

/// Handle a trigger.
///
/// - While a batch is active the trigger is only recorded as pending
///   (coalesced with identical pending triggers).
/// - Otherwise it is planned immediately.
pub fn handle_trigger(
    dispatcher: &Dispatcher,
    pending: &mut PendingTriggers,
    state: &mut ServiceState,
    options: &RuntimeOptions,
    trigger: Trigger,
) -> CoreStep {
    if *state == ServiceState::Active {
        let fresh = pending.record(trigger);
        info!(%trigger, coalesced = !fresh, "trigger arrived during run; queued");
        return CoreStep::continue_with(Vec::new());
    }

    let commands = plan_batch(dispatcher, vec![trigger]);
    if starts_batch(&commands) {
        transition(state, ServiceTransition::Activate);
        return CoreStep::continue_with(commands);
    }

    finish_if_idle(commands, pending, options)
}

/// Handle completion of the active batch: start a follow-up batch for
/// everything that queued up, or go idle.
pub fn handle_batch_finished(
    dispatcher: &Dispatcher,
    pending: &mut PendingTriggers,
    state: &mut ServiceState,
    options: &RuntimeOptions,
) -> CoreStep {
    transition(state, ServiceTransition::Finish);

    if !pending.is_empty() {
        let commands = plan_batch(dispatcher, pending.drain());
        if starts_batch(&commands) {
            transition(state, ServiceTransition::Activate);
            return CoreStep::continue_with(commands);
        }
        return finish_if_idle(commands, pending, options);
    }

    finish_if_idle(Vec::new(), pending, options)
}

/// In one-shot mode, exit once there is nothing left to do.
fn finish_if_idle(
    mut commands: Vec<CoreCommand>,
    pending: &PendingTriggers,
    options: &RuntimeOptions,
) -> CoreStep {
    if options.exit_when_idle && pending.is_empty() {
        commands.push(CoreCommand::RequestExit);
        return CoreStep {
            commands,
            keep_running: false,
        };
    }
    CoreStep::continue_with(commands)
}
