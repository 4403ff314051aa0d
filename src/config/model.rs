// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::{OutsetError, Result};
use crate::types::{PrivilegeContext, SignalKind};

pub const DEFAULT_ROOT: &str = "/usr/local/outset";
pub const DEFAULT_STATE_DIR: &str = "/usr/local/outset/share";
pub const DEFAULT_DESCRIPTOR_DIR: &str = "/usr/local/outset/services";
pub const DEFAULT_PROGRAM: &str = "/usr/local/bin/outset";
pub const DEFAULT_ON_DEMAND_MARKER: &str = "/var/tmp/.outset.on-demand";
pub const DEFAULT_PRIVILEGED_MARKER: &str = "/var/tmp/.outset.login-privileged";

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [paths]
/// root = "/usr/local/outset"
/// state_dir = "/usr/local/outset/share"
///
/// [trigger]
/// on_demand_marker = "/var/tmp/.outset.on-demand"
/// poll_interval_secs = 30
///
/// [execution]
/// package_installer = ["installer", "-target", "/", "-pkg"]
/// exclude = ["*.md"]
///
/// [services]
/// descriptor_dir = "/usr/local/outset/services"
///
/// [login]
/// ignored_users = ["admin"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub paths: PathsSection,

    #[serde(default)]
    pub trigger: TriggerSection,

    #[serde(default)]
    pub execution: ExecutionSection,

    #[serde(default)]
    pub services: ServicesSection,

    #[serde(default)]
    pub login: LoginSection,
}

/// Validated configuration. Construct through `ConfigFile::try_from`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub paths: PathsSection,
    pub trigger: TriggerSection,
    pub execution: ExecutionSection,
    pub services: ServicesSection,
    pub login: LoginSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(raw: RawConfigFile) -> Self {
        Self {
            paths: raw.paths,
            trigger: raw.trigger,
            execution: raw.execution,
            services: raw.services,
            login: raw.login,
        }
    }

    /// Ledger file owned by the given context.
    ///
    /// The user ledger lives under `paths.user_state_dir`, falling back to
    /// `$HOME/.local/state/outset` so an unprivileged service can write it.
    pub fn ledger_path(&self, context: PrivilegeContext) -> Result<PathBuf> {
        match context {
            PrivilegeContext::System => Ok(self.paths.state_dir.join("system.ledger.toml")),
            PrivilegeContext::User => {
                let dir = match &self.paths.user_state_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::var_os("HOME")
                        .map(|home| Path::new(&home).join(".local/state/outset"))
                        .ok_or_else(|| {
                            OutsetError::ConfigError(
                                "[paths].user_state_dir is not set and $HOME is unavailable"
                                    .to_string(),
                            )
                        })?,
                };
                Ok(dir.join("user.ledger.toml"))
            }
        }
    }

    pub fn marker_path(&self, kind: SignalKind) -> &Path {
        match kind {
            SignalKind::OnDemand => &self.trigger.on_demand_marker,
            SignalKind::LoginPrivileged => &self.trigger.privileged_marker,
        }
    }
}

/// `[paths]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct PathsSection {
    /// Queue root holding one directory per category.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory for the system-context ledger.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Directory for the user-context ledger.
    #[serde(default)]
    pub user_state_dir: Option<PathBuf>,
}

fn default_root() -> PathBuf {
    PathBuf::from(DEFAULT_ROOT)
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            state_dir: default_state_dir(),
            user_state_dir: None,
        }
    }
}

/// `[trigger]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerSection {
    #[serde(default = "default_on_demand_marker")]
    pub on_demand_marker: PathBuf,

    #[serde(default = "default_privileged_marker")]
    pub privileged_marker: PathBuf,

    /// Backstop polling interval for markers, on top of filesystem
    /// notifications.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

fn default_on_demand_marker() -> PathBuf {
    PathBuf::from(DEFAULT_ON_DEMAND_MARKER)
}

fn default_privileged_marker() -> PathBuf {
    PathBuf::from(DEFAULT_PRIVILEGED_MARKER)
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl Default for TriggerSection {
    fn default() -> Self {
        Self {
            on_demand_marker: default_on_demand_marker(),
            privileged_marker: default_privileged_marker(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecutionSection {
    /// Program and leading arguments used to install package units. The
    /// package path is appended as the last argument.
    #[serde(default = "default_package_installer")]
    pub package_installer: Vec<String>,

    /// Glob patterns (matched against file names) that are never treated as
    /// units, e.g. `README*`.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_package_installer() -> Vec<String> {
    ["installer", "-target", "/", "-pkg"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            package_installer: default_package_installer(),
            exclude: Vec::new(),
        }
    }
}

/// `[services]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicesSection {
    /// Where service descriptors are written on install.
    #[serde(default = "default_descriptor_dir")]
    pub descriptor_dir: PathBuf,

    /// Program the host's service manager launches.
    #[serde(default = "default_program")]
    pub program: PathBuf,

    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
}

fn default_descriptor_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DESCRIPTOR_DIR)
}

fn default_program() -> PathBuf {
    PathBuf::from(DEFAULT_PROGRAM)
}

fn default_label_prefix() -> String {
    "io.outset".to_string()
}

impl Default for ServicesSection {
    fn default() -> Self {
        Self {
            descriptor_dir: default_descriptor_dir(),
            program: default_program(),
            label_prefix: default_label_prefix(),
        }
    }
}

/// `[login]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginSection {
    /// Users for whom login triggers do nothing.
    #[serde(default)]
    pub ignored_users: Vec<String>,
}
