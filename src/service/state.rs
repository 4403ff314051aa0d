// src/service/state.rs

use std::fmt;

/// Lifecycle of one resident service.
///
/// `Unregistered -> Registered -> Active -> Idle -> Active -> ...`, and back
/// to `Unregistered` only through an explicit uninstall. There is no failed
/// state: a failed registration simply leaves the service `Unregistered`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Unregistered,
    Registered,
    /// Running a batch of categories.
    Active,
    /// Waiting on its trigger source.
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceTransition {
    Register,
    Activate,
    Finish,
    Unregister,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: ServiceState,
    pub transition: ServiceTransition,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cannot {:?} a service that is {:?}", self.transition, self.from)
    }
}

impl std::error::Error for InvalidTransition {}

impl ServiceState {
    pub fn apply(self, transition: ServiceTransition) -> Result<ServiceState, InvalidTransition> {
        use ServiceState::*;
        use ServiceTransition::*;

        match (self, transition) {
            // Registration and uninstall are idempotent.
            (Unregistered | Registered, Register) => Ok(Registered),
            (Unregistered | Registered | Idle, Unregister) => Ok(Unregistered),
            (Idle, Register) => Ok(Idle),

            (Registered | Idle, Activate) => Ok(Active),
            (Active, Finish) => Ok(Idle),

            (from, transition) => Err(InvalidTransition { from, transition }),
        }
    }

    pub fn is_registered(self) -> bool {
        self != ServiceState::Unregistered
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServiceState::Unregistered => "unregistered",
            ServiceState::Registered => "registered",
            ServiceState::Active => "active",
            ServiceState::Idle => "idle",
        };
        f.write_str(s)
    }
}
