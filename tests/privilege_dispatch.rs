// tests/privilege_dispatch.rs

mod common;
use crate::common::{FakeExecutor, TestResult, init_tracing, mock_scheduler, unit_path, with_timeout};

use std::sync::Arc;

use tokio::sync::mpsc;

use outset::engine::{Runtime, RuntimeEvent, RuntimeOptions, ServiceCore};
use outset::fs::mock::MockFileSystem;
use outset::registry::Category;
use outset::service::{DispatchPlan, Dispatcher};
use outset::trigger::{TriggerMarker, observe_marker};
use outset::types::{LifecycleEvent, PrivilegeContext, SignalKind, Trigger};

const BOOT: Trigger = Trigger::Lifecycle(LifecycleEvent::Boot);
const LOGIN: Trigger = Trigger::Lifecycle(LifecycleEvent::Login);

fn markers(fs: &MockFileSystem) -> Vec<TriggerMarker> {
    vec![
        TriggerMarker::new(
            SignalKind::OnDemand,
            "/markers/.outset.on-demand",
            Arc::new(fs.clone()),
        ),
        TriggerMarker::new(
            SignalKind::LoginPrivileged,
            "/markers/.outset.login-privileged",
            Arc::new(fs.clone()),
        ),
    ]
}

fn one_shot() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

#[test]
fn system_context_plans() {
    let dispatcher = Dispatcher::new(PrivilegeContext::System);

    assert_eq!(
        dispatcher.plan(BOOT).run,
        vec![Category::BootOnce, Category::BootEvery]
    );
    assert_eq!(dispatcher.plan(LOGIN).run, vec![Category::LoginWindow]);
    assert_eq!(
        dispatcher.plan(Trigger::Signal(SignalKind::LoginPrivileged)).run,
        vec![Category::LoginPrivileged]
    );
    assert!(dispatcher.plan(Trigger::Signal(SignalKind::OnDemand)).is_empty());
}

#[test]
fn user_context_plans() {
    let dispatcher = Dispatcher::new(PrivilegeContext::User);

    let login = dispatcher.plan(LOGIN);
    assert_eq!(login.run, vec![Category::LoginOnce, Category::LoginEvery]);
    assert_eq!(login.escalate, vec![SignalKind::LoginPrivileged]);

    assert_eq!(
        dispatcher.plan(Trigger::Signal(SignalKind::OnDemand)).run,
        vec![Category::OnDemand]
    );
    assert!(dispatcher.plan(BOOT).is_empty());
    assert!(dispatcher.plan(Trigger::Signal(SignalKind::LoginPrivileged)).is_empty());
}

#[test]
fn plans_only_name_categories_of_their_own_context() {
    let triggers = [
        BOOT,
        LOGIN,
        Trigger::Signal(SignalKind::OnDemand),
        Trigger::Signal(SignalKind::LoginPrivileged),
    ];
    for context in [PrivilegeContext::System, PrivilegeContext::User] {
        let dispatcher = Dispatcher::new(context);
        for trigger in triggers {
            let plan = dispatcher.plan(trigger);
            assert!(
                plan.run.iter().all(|c| c.context() == context),
                "{context} plan for {trigger} crosses contexts: {plan:?}"
            );
        }
    }
}

#[test]
fn ignored_users_skip_login_processing() {
    let ignored = Dispatcher::new(PrivilegeContext::User)
        .with_ignored_users(vec!["admin".to_string()], Some("admin".to_string()));
    assert_eq!(ignored.plan(LOGIN), DispatchPlan::default());

    // On-demand runs are not login processing.
    assert_eq!(
        ignored.plan(Trigger::Signal(SignalKind::OnDemand)).run,
        vec![Category::OnDemand]
    );

    let other = Dispatcher::new(PrivilegeContext::User)
        .with_ignored_users(vec!["admin".to_string()], Some("alice".to_string()));
    assert!(!other.plan(LOGIN).is_empty());
}

#[tokio::test]
async fn login_privileged_runs_in_system_after_user_login_escalates() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::LoginOnce, "01-user-once"), "u1");
    fs.add_executable(unit_path(Category::LoginEvery, "01-user-every"), "u2");
    fs.add_executable(unit_path(Category::LoginPrivileged, "01-as-root"), "p");

    // User context: login.
    let user_exec = FakeExecutor::new();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    tx.send(RuntimeEvent::Triggered(LOGIN)).await?;
    let user = Runtime::new(
        ServiceCore::new(Dispatcher::new(PrivilegeContext::User), one_shot()),
        rx,
        mock_scheduler(&fs, PrivilegeContext::User, &user_exec),
        markers(&fs),
    );
    with_timeout(user.run()).await?;

    assert_eq!(user_exec.executed(), vec!["01-user-once", "01-user-every"]);
    let privileged = markers(&fs).remove(1);
    assert!(privileged.is_pending());

    // System context: consume the escalation marker and run.
    let system_exec = FakeExecutor::new();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    assert!(observe_marker(&privileged, &tx).await);
    let system = Runtime::new(
        ServiceCore::new(Dispatcher::new(PrivilegeContext::System), one_shot()),
        rx,
        mock_scheduler(&fs, PrivilegeContext::System, &system_exec),
        markers(&fs),
    );
    with_timeout(system.run()).await?;

    assert_eq!(system_exec.executed(), vec!["01-as-root"]);
    assert!(!privileged.is_pending());
    Ok(())
}

#[tokio::test]
async fn ignored_user_login_neither_runs_nor_escalates() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::LoginEvery, "01-user-every"), "u");

    let executor = FakeExecutor::new();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    tx.send(RuntimeEvent::Triggered(LOGIN)).await?;

    let dispatcher = Dispatcher::new(PrivilegeContext::User)
        .with_ignored_users(vec!["kiosk".to_string()], Some("kiosk".to_string()));
    let runtime = Runtime::new(
        ServiceCore::new(dispatcher, one_shot()),
        rx,
        mock_scheduler(&fs, PrivilegeContext::User, &executor),
        markers(&fs),
    );
    with_timeout(runtime.run()).await?;

    assert!(executor.executed().is_empty());
    assert!(markers(&fs).iter().all(|m| !m.is_pending()));
    Ok(())
}

#[tokio::test]
async fn missing_category_dir_does_not_abort_the_batch() -> TestResult {
    init_tracing();

    // boot-once exists, boot-every does not.
    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::BootOnce, "01-a"), "a");

    let executor = FakeExecutor::new();
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(8);
    tx.send(RuntimeEvent::Triggered(BOOT)).await?;

    let runtime = Runtime::new(
        ServiceCore::new(Dispatcher::new(PrivilegeContext::System), one_shot()),
        rx,
        mock_scheduler(&fs, PrivilegeContext::System, &executor),
        markers(&fs),
    );
    with_timeout(runtime.run()).await?;

    assert_eq!(executor.executed(), vec!["01-a"]);
    Ok(())
}
