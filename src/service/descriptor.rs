// src/service/descriptor.rs

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::types::{PrivilegeContext, SignalKind, TriggerKind};

/// One trigger a resident service is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub kind: TriggerKind,
    /// Marker path, for `external-signal` triggers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marker: Option<PathBuf>,
}

impl TriggerSpec {
    pub fn lifecycle(kind: TriggerKind) -> Self {
        Self { kind, marker: None }
    }

    pub fn signal(marker: impl Into<PathBuf>) -> Self {
        Self {
            kind: TriggerKind::ExternalSignal,
            marker: Some(marker.into()),
        }
    }
}

/// Declarative record the host's service manager consumes to launch a
/// resident service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub label: String,
    pub context: PrivilegeContext,
    pub program_arguments: Vec<String>,
    pub keep_alive: bool,
    pub triggers: Vec<TriggerSpec>,
}

impl ServiceDescriptor {
    pub fn file_name(&self) -> String {
        format!("{}.toml", self.label)
    }

    pub fn render(&self) -> Result<String> {
        Ok(toml::to_string(self)?)
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// The two resident services: one per privilege context.
///
/// - `system`: boot, login (login window), and the login-privileged marker.
/// - `user`: login and the on-demand marker.
pub fn default_descriptors(cfg: &ConfigFile) -> Vec<ServiceDescriptor> {
    let program = cfg.services.program.to_string_lossy().into_owned();
    let serve = |context: PrivilegeContext| {
        vec![
            program.clone(),
            "serve".to_string(),
            "--context".to_string(),
            context.to_string(),
        ]
    };

    vec![
        ServiceDescriptor {
            label: format!("{}.system", cfg.services.label_prefix),
            context: PrivilegeContext::System,
            program_arguments: serve(PrivilegeContext::System),
            keep_alive: true,
            triggers: vec![
                TriggerSpec::lifecycle(TriggerKind::Boot),
                TriggerSpec::lifecycle(TriggerKind::Login),
                TriggerSpec::signal(cfg.marker_path(SignalKind::LoginPrivileged)),
            ],
        },
        ServiceDescriptor {
            label: format!("{}.user", cfg.services.label_prefix),
            context: PrivilegeContext::User,
            program_arguments: serve(PrivilegeContext::User),
            keep_alive: true,
            triggers: vec![
                TriggerSpec::lifecycle(TriggerKind::Login),
                TriggerSpec::signal(cfg.marker_path(SignalKind::OnDemand)),
            ],
        },
    ]
}
