// src/service/dispatch.rs

use tracing::{debug, info};

use crate::registry::Category;
use crate::types::{LifecycleEvent, PrivilegeContext, SignalKind, Trigger};

/// What a resident service does for one trigger.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchPlan {
    /// Categories this context runs itself, in order.
    pub run: Vec<Category>,
    /// Signals to raise so another context's service does the work.
    pub escalate: Vec<SignalKind>,
}

impl DispatchPlan {
    pub fn is_empty(&self) -> bool {
        self.run.is_empty() && self.escalate.is_empty()
    }
}

/// Maps triggers to categories for one privilege context.
///
/// `login-privileged` is discovered by the user context's login trigger but
/// is never run there: the user plan escalates it through the
/// login-privileged marker, which only the system service consumes.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    context: PrivilegeContext,
    ignored_users: Vec<String>,
    current_user: Option<String>,
}

impl Dispatcher {
    pub fn new(context: PrivilegeContext) -> Self {
        Self {
            context,
            ignored_users: Vec::new(),
            current_user: None,
        }
    }

    /// Login triggers do nothing when `current_user` is in `ignored`.
    pub fn with_ignored_users(mut self, ignored: Vec<String>, current_user: Option<String>) -> Self {
        self.ignored_users = ignored;
        self.current_user = current_user;
        self
    }

    pub fn context(&self) -> PrivilegeContext {
        self.context
    }

    fn user_is_ignored(&self) -> bool {
        match &self.current_user {
            Some(user) => self.ignored_users.iter().any(|u| u == user),
            None => false,
        }
    }

    pub fn plan(&self, trigger: Trigger) -> DispatchPlan {
        use PrivilegeContext::{System, User};

        let plan = match (self.context, trigger) {
            (System, Trigger::Lifecycle(LifecycleEvent::Boot)) => DispatchPlan {
                run: vec![Category::BootOnce, Category::BootEvery],
                escalate: Vec::new(),
            },
            (System, Trigger::Lifecycle(LifecycleEvent::Login)) => DispatchPlan {
                run: vec![Category::LoginWindow],
                escalate: Vec::new(),
            },
            (System, Trigger::Signal(SignalKind::LoginPrivileged)) => DispatchPlan {
                run: vec![Category::LoginPrivileged],
                escalate: Vec::new(),
            },
            (User, Trigger::Lifecycle(LifecycleEvent::Login)) => {
                if self.user_is_ignored() {
                    info!(
                        user = ?self.current_user,
                        "user is in ignored_users; skipping login processing"
                    );
                    DispatchPlan::default()
                } else {
                    DispatchPlan {
                        run: vec![Category::LoginOnce, Category::LoginEvery],
                        escalate: vec![SignalKind::LoginPrivileged],
                    }
                }
            }
            (User, Trigger::Signal(SignalKind::OnDemand)) => DispatchPlan {
                run: vec![Category::OnDemand],
                escalate: Vec::new(),
            },
            (context, trigger) => {
                debug!(%context, %trigger, "trigger not handled by this context");
                DispatchPlan::default()
            }
        };

        debug_assert!(plan.run.iter().all(|c| c.context() == self.context));
        plan
    }
}
