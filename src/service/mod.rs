// src/service/mod.rs

//! Privilege context manager.
//!
//! - [`descriptor`] describes the two resident services (system, user).
//! - [`registrar`] registers them with the host, one independent attempt
//!   per service.
//! - [`dispatch`] decides which categories a context runs for a trigger and
//!   which must be escalated to the other context.
//! - [`state`] is the per-service lifecycle state machine.

pub mod descriptor;
pub mod dispatch;
pub mod registrar;
pub mod state;

pub use descriptor::{ServiceDescriptor, TriggerSpec, default_descriptors};
pub use dispatch::{DispatchPlan, Dispatcher};
pub use registrar::{
    FileServiceRegistrar, RegistrationOutcome, RegistrationStatus, ServiceRegistrar, register_all,
    unregister_all,
};
pub use state::{InvalidTransition, ServiceState, ServiceTransition};
