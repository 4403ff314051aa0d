// src/registry/category.rs

//! The fixed set of queue categories.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::errors::{OutsetError, Result};
use crate::types::{PrivilegeContext, RepeatPolicy, TriggerKind};

/// A named queue directory. Every category has exactly one privilege
/// context, one repeat policy and one trigger kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    BootOnce,
    BootEvery,
    LoginOnce,
    LoginEvery,
    LoginPrivileged,
    LoginWindow,
    OnDemand,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::BootOnce,
        Category::BootEvery,
        Category::LoginOnce,
        Category::LoginEvery,
        Category::LoginPrivileged,
        Category::LoginWindow,
        Category::OnDemand,
    ];

    /// Directory name under the queue root.
    pub fn name(self) -> &'static str {
        match self {
            Category::BootOnce => "boot-once",
            Category::BootEvery => "boot-every",
            Category::LoginOnce => "login-once",
            Category::LoginEvery => "login-every",
            Category::LoginPrivileged => "login-privileged",
            Category::LoginWindow => "login-window",
            Category::OnDemand => "on-demand",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name() == name)
            .ok_or_else(|| OutsetError::CategoryNotFound(name.to_string()))
    }

    /// Context whose service executes units of this category.
    ///
    /// `login-privileged` is discovered on user login but runs in `system`.
    pub fn context(self) -> PrivilegeContext {
        match self {
            Category::BootOnce
            | Category::BootEvery
            | Category::LoginPrivileged
            | Category::LoginWindow => PrivilegeContext::System,
            Category::LoginOnce | Category::LoginEvery | Category::OnDemand => {
                PrivilegeContext::User
            }
        }
    }

    pub fn policy(self) -> RepeatPolicy {
        match self {
            Category::BootOnce | Category::LoginOnce => RepeatPolicy::Once,
            _ => RepeatPolicy::Every,
        }
    }

    pub fn trigger(self) -> TriggerKind {
        match self {
            Category::BootOnce | Category::BootEvery => TriggerKind::Boot,
            Category::LoginOnce
            | Category::LoginEvery
            | Category::LoginPrivileged
            | Category::LoginWindow => TriggerKind::Login,
            Category::OnDemand => TriggerKind::ExternalSignal,
        }
    }

    pub fn dir(self, root: &Path) -> PathBuf {
        root.join(self.name())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = OutsetError;

    fn from_str(s: &str) -> Result<Self> {
        Category::from_name(s.trim())
    }
}
