// src/engine/mod.rs

//! Resident service engine for one privilege context.
//!
//! This module ties together:
//! - the dispatcher (trigger → categories for this context)
//! - the pending-trigger set (what happens when triggers arrive mid-run)
//! - the main runtime event loop that reacts to:
//!   - lifecycle triggers handed in by the host
//!   - consumed trigger markers
//!   - batch completion
//!   - shutdown signals
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use crate::registry::Category;
use crate::types::Trigger;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit once idle with nothing pending (one-shot lifecycle
    /// activations).
    pub exit_when_idle: bool,
}

/// A set of categories run back to back for one or more triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub triggers: Vec<Trigger>,
    pub categories: Vec<Category>,
}

/// Events flowing into the runtime from the host, the marker watcher and
/// the runtime itself.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A lifecycle event fired or a marker was consumed.
    Triggered(Trigger),
    /// The batch started by the last `RunBatch` command finished.
    BatchFinished,
    /// Graceful shutdown requested (e.g. SIGTERM from the service manager).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod runtime;

pub use self::core::ServiceCore;
pub use event_handlers::{CoreCommand, CoreStep};
pub use runtime::Runtime;
