use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Execution boundary a unit runs under.
///
/// - `System`: the elevated context (boot-time and login-window work, plus
///   escalated login work).
/// - `User`: the logged-in user's context (login and on-demand work).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrivilegeContext {
    System,
    User,
}

impl PrivilegeContext {
    pub fn as_str(self) -> &'static str {
        match self {
            PrivilegeContext::System => "system",
            PrivilegeContext::User => "user",
        }
    }
}

impl fmt::Display for PrivilegeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrivilegeContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "system" | "root" => Ok(PrivilegeContext::System),
            "user" => Ok(PrivilegeContext::User),
            other => Err(format!(
                "invalid privilege context: {other} (expected \"system\" or \"user\")"
            )),
        }
    }
}

/// How many times a unit in a category may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatPolicy {
    /// At most once per unit identity and context, ever.
    Once,
    /// Every time the category is triggered.
    Every,
}

/// What kind of trigger wakes a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerKind {
    Boot,
    Login,
    ExternalSignal,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerKind::Boot => f.write_str("lifecycle:boot"),
            TriggerKind::Login => f.write_str("lifecycle:login"),
            TriggerKind::ExternalSignal => f.write_str("external-signal"),
        }
    }
}

/// Lifecycle events delivered by the host's own service activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LifecycleEvent {
    Boot,
    Login,
}

impl FromStr for LifecycleEvent {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "boot" => Ok(LifecycleEvent::Boot),
            "login" => Ok(LifecycleEvent::Login),
            other => Err(format!(
                "invalid lifecycle event: {other} (expected \"boot\" or \"login\")"
            )),
        }
    }
}

/// Asynchronous requests delivered through marker files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignalKind {
    /// Run the `on-demand` category in the user context.
    OnDemand,
    /// Run the `login-privileged` category in the system context.
    LoginPrivileged,
}

impl SignalKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SignalKind::OnDemand => "on-demand",
            SignalKind::LoginPrivileged => "login-privileged",
        }
    }

    /// The context whose resident service watches and consumes this marker.
    pub fn owner(self) -> PrivilegeContext {
        match self {
            SignalKind::OnDemand => PrivilegeContext::User,
            SignalKind::LoginPrivileged => PrivilegeContext::System,
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on-demand" | "ondemand" => Ok(SignalKind::OnDemand),
            "login-privileged" => Ok(SignalKind::LoginPrivileged),
            other => Err(format!(
                "invalid signal: {other} (expected \"on-demand\" or \"login-privileged\")"
            )),
        }
    }
}

/// A single scheduling event as seen by a resident service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Trigger {
    Lifecycle(LifecycleEvent),
    Signal(SignalKind),
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Lifecycle(LifecycleEvent::Boot) => f.write_str("boot"),
            Trigger::Lifecycle(LifecycleEvent::Login) => f.write_str("login"),
            Trigger::Signal(kind) => write!(f, "signal:{kind}"),
        }
    }
}
