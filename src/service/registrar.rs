// src/service/registrar.rs

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{OutsetError, Result};
use crate::fs::FileSystem;
use crate::service::descriptor::ServiceDescriptor;
use crate::service::state::ServiceState;

/// What a successful registration did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationStatus {
    /// Descriptor written (new or changed).
    Registered,
    /// An identical descriptor was already in place; nothing changed.
    AlreadyRegistered,
}

/// Registers resident services with the host's service manager.
pub trait ServiceRegistrar: Send + Sync {
    /// Idempotent: registering an already registered, unchanged descriptor
    /// is not an error and creates no duplicate.
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<RegistrationStatus>;

    /// Returns `false` when the service was not registered.
    fn unregister(&self, label: &str) -> Result<bool>;

    /// `Registered` or `Unregistered`; activity is tracked by the service
    /// itself.
    fn status(&self, label: &str) -> ServiceState;
}

/// Writes one `<label>.toml` descriptor per service into a directory the
/// host's service manager reads.
#[derive(Debug, Clone)]
pub struct FileServiceRegistrar {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileServiceRegistrar {
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
        }
    }

    fn descriptor_path(&self, label: &str) -> PathBuf {
        self.dir.join(format!("{label}.toml"))
    }

    fn registration_error(label: &str, e: impl std::fmt::Display) -> OutsetError {
        OutsetError::Registration {
            service: label.to_string(),
            reason: e.to_string(),
        }
    }
}

impl ServiceRegistrar for FileServiceRegistrar {
    fn register(&self, descriptor: &ServiceDescriptor) -> Result<RegistrationStatus> {
        let label = descriptor.label.as_str();
        let path = self.dir.join(descriptor.file_name());
        let rendered = descriptor
            .render()
            .map_err(|e| Self::registration_error(label, e))?;

        if self.fs.is_file(&path) {
            match self.fs.read_to_string(&path) {
                Ok(existing) if existing == rendered => {
                    debug!(service = %label, "descriptor unchanged; already registered");
                    return Ok(RegistrationStatus::AlreadyRegistered);
                }
                Ok(_) => info!(service = %label, "descriptor changed; re-registering"),
                Err(e) => warn!(service = %label, error = %e, "existing descriptor unreadable; replacing"),
            }
        }

        self.fs
            .write_atomic(&path, rendered.as_bytes())
            .map_err(|e| Self::registration_error(label, format!("{e:#}")))?;
        info!(service = %label, ?path, "registered service");
        Ok(RegistrationStatus::Registered)
    }

    fn unregister(&self, label: &str) -> Result<bool> {
        let removed = self
            .fs
            .remove_file(&self.descriptor_path(label))
            .map_err(|e| Self::registration_error(label, format!("{e:#}")))?;
        if removed {
            info!(service = %label, "unregistered service");
        }
        Ok(removed)
    }

    fn status(&self, label: &str) -> ServiceState {
        if self.fs.is_file(&self.descriptor_path(label)) {
            ServiceState::Registered
        } else {
            ServiceState::Unregistered
        }
    }
}

/// Per-service result of a bulk registration.
#[derive(Debug)]
pub struct RegistrationOutcome {
    pub label: String,
    pub result: Result<RegistrationStatus>,
}

/// Register every descriptor independently. One failure never prevents the
/// remaining registrations; each result is reported on its own.
pub fn register_all(
    registrar: &dyn ServiceRegistrar,
    descriptors: &[ServiceDescriptor],
) -> Vec<RegistrationOutcome> {
    descriptors
        .iter()
        .map(|descriptor| {
            let result = registrar.register(descriptor);
            if let Err(ref e) = result {
                warn!(service = %descriptor.label, error = %e, "service registration failed");
            }
            RegistrationOutcome {
                label: descriptor.label.clone(),
                result,
            }
        })
        .collect()
}

/// Uninstall counterpart of [`register_all`].
pub fn unregister_all(
    registrar: &dyn ServiceRegistrar,
    descriptors: &[ServiceDescriptor],
) -> Vec<(String, Result<bool>)> {
    descriptors
        .iter()
        .map(|descriptor| {
            let result = registrar.unregister(&descriptor.label);
            if let Err(ref e) = result {
                warn!(service = %descriptor.label, error = %e, "service de-registration failed");
            }
            (descriptor.label.clone(), result)
        })
        .collect()
}
