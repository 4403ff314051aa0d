use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use outset::errors::{OutsetError, Result};
use outset::service::{RegistrationStatus, ServiceDescriptor, ServiceRegistrar, ServiceState};

/// In-memory registrar. Labels added with [`FakeRegistrar::failing`] are
/// rejected with a registration error.
#[derive(Debug, Default)]
pub struct FakeRegistrar {
    registered: Mutex<HashMap<String, ServiceDescriptor>>,
    failing: HashSet<String>,
}

impl FakeRegistrar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, label: &str) -> Self {
        self.failing.insert(label.to_string());
        self
    }

    pub fn labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = self.registered.lock().unwrap().keys().cloned().collect();
        labels.sort();
        labels
    }
}

impl ServiceRegistrar for FakeRegistrar {
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<RegistrationStatus> {
        if self.failing.contains(&descriptor.label) {
            return Err(OutsetError::Registration {
                service: descriptor.label.clone(),
                reason: "rejected by fake service manager".to_string(),
            });
        }

        let mut registered = self.registered.lock().unwrap();
        if registered.get(&descriptor.label) == Some(descriptor) {
            return Ok(RegistrationStatus::AlreadyRegistered);
        }
        registered.insert(descriptor.label.clone(), descriptor.clone());
        Ok(RegistrationStatus::Registered)
    }

    fn unregister(&self, label: &str) -> Result<bool> {
        Ok(self.registered.lock().unwrap().remove(label).is_some())
    }

    fn status(&self, label: &str) -> ServiceState {
        if self.registered.lock().unwrap().contains_key(label) {
            ServiceState::Registered
        } else {
            ServiceState::Unregistered
        }
    }
}
