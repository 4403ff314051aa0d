// src/trigger/mod.rs

//! Trigger sources.
//!
//! Lifecycle triggers (boot, login) are delivered by the host's own service
//! activation and arrive through the CLI; nothing here polls for them.
//! External signals are marker files:
//!
//! - [`marker`] raises and consumes a marker atomically.
//! - [`watcher`] turns marker creation into runtime events (`notify` plus a
//!   polling backstop).
//! - [`pending`] coalesces triggers that arrive while a run is active.

pub mod marker;
pub mod pending;
pub mod watcher;

pub use marker::TriggerMarker;
pub use pending::PendingTriggers;
pub use watcher::{WatcherHandle, observe_marker, spawn_marker_watcher};
