// src/ledger/mod.rs

//! Run-state ledger.
//!
//! Records which `once` units already completed, per privilege context.
//! A unit's identity is its path plus a blake3 fingerprint of its content,
//! so editing a script in place makes it eligible again.

pub mod fingerprint;
pub mod store;

pub use fingerprint::{UnitIdentity, compute_fingerprint};
pub use store::{FileLedger, Ledger, MemoryLedger, RunRecord};
