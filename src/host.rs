// src/host.rs

//! Read-only host identity facts.
//!
//! These are only ever logged for diagnostics; scheduling never depends on
//! them. Every accessor returns `None` when the fact is not available.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::fs::FileSystem;

pub trait HostFacts: Send + Sync {
    fn os_version(&self) -> Option<String>;
    fn os_build(&self) -> Option<String>;
    fn hardware_model(&self) -> Option<String>;
    fn marketing_model(&self) -> Option<String>;
    fn serial_number(&self) -> Option<String>;
}

/// Facts read from `/etc/os-release` and the DMI tables under `/sys`.
#[derive(Debug, Clone)]
pub struct LocalHostFacts {
    fs: Arc<dyn FileSystem>,
}

impl LocalHostFacts {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn os_release(&self, key: &str) -> Option<String> {
        let contents = self.fs.read_to_string(Path::new("/etc/os-release")).ok()?;
        os_release_value(&contents, key)
    }

    fn dmi(&self, name: &str) -> Option<String> {
        let path = Path::new("/sys/class/dmi/id").join(name);
        let value = self.fs.read_to_string(&path).ok()?;
        let value = value.trim();
        (!value.is_empty()).then(|| value.to_string())
    }
}

impl HostFacts for LocalHostFacts {
    fn os_version(&self) -> Option<String> {
        self.os_release("VERSION_ID")
    }

    fn os_build(&self) -> Option<String> {
        self.os_release("BUILD_ID")
            .or_else(|| self.os_release("VERSION_CODENAME"))
    }

    fn hardware_model(&self) -> Option<String> {
        self.dmi("product_name")
    }

    fn marketing_model(&self) -> Option<String> {
        self.dmi("product_family")
            .or_else(|| self.dmi("product_version"))
    }

    fn serial_number(&self) -> Option<String> {
        self.dmi("product_serial")
    }
}

/// Look up `key` in os-release formatted text, stripping optional quotes.
pub fn os_release_value(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let (k, v) = line.trim().split_once('=')?;
        if k.trim() != key {
            return None;
        }
        let v = v.trim().trim_matches('"').trim_matches('\'');
        (!v.is_empty()).then(|| v.to_string())
    })
}

/// Name of the user this process acts for, from `$USER` / `$LOGNAME`.
pub fn current_user() -> Option<String> {
    ["USER", "LOGNAME"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|name| !name.trim().is_empty())
}

pub fn log_host_facts(facts: &dyn HostFacts) {
    let unknown = || "unknown".to_string();
    info!(
        os_version = %facts.os_version().unwrap_or_else(unknown),
        os_build = %facts.os_build().unwrap_or_else(unknown),
        hardware_model = %facts.hardware_model().unwrap_or_else(unknown),
        marketing_model = %facts.marketing_model().unwrap_or_else(unknown),
        serial_number = %facts.serial_number().unwrap_or_else(unknown),
        "host facts"
    );
}
