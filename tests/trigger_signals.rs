// tests/trigger_signals.rs

mod common;
use crate::common::{FakeExecutor, TestResult, init_tracing, mock_scheduler, unit_path, with_timeout};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::timeout;

use outset::engine::{CoreCommand, Runtime, RuntimeEvent, RuntimeOptions, ServiceCore};
use outset::fs::mock::MockFileSystem;
use outset::fs::{FileSystem, RealFileSystem};
use outset::registry::Category;
use outset::service::{Dispatcher, ServiceState};
use outset::trigger::{PendingTriggers, TriggerMarker, observe_marker, spawn_marker_watcher};
use outset::types::{LifecycleEvent, PrivilegeContext, SignalKind, Trigger};

const ON_DEMAND: Trigger = Trigger::Signal(SignalKind::OnDemand);

fn on_demand_marker(fs: &MockFileSystem) -> TriggerMarker {
    TriggerMarker::new(SignalKind::OnDemand, "/markers/.outset.on-demand", Arc::new(fs.clone()))
}

fn batch_categories(commands: &[CoreCommand]) -> Option<Vec<Category>> {
    commands.iter().find_map(|c| match c {
        CoreCommand::RunBatch(batch) => Some(batch.categories.clone()),
        _ => None,
    })
}

#[test]
fn marker_is_consumed_exactly_once() -> TestResult {
    let fs = MockFileSystem::new();
    let marker = on_demand_marker(&fs);

    assert!(!marker.is_pending());
    marker.raise()?;
    marker.raise()?;
    assert!(marker.is_pending());

    assert!(marker.consume());
    assert!(!marker.consume());
    assert!(!marker.is_pending());
    Ok(())
}

#[tokio::test]
async fn duplicate_observations_forward_one_event() -> TestResult {
    let fs = MockFileSystem::new();
    let marker = on_demand_marker(&fs);
    let (tx, mut rx) = mpsc::channel(8);

    marker.raise()?;
    marker.raise()?;

    assert!(observe_marker(&marker, &tx).await);
    assert!(!observe_marker(&marker, &tx).await);
    drop(tx);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], RuntimeEvent::Triggered(ON_DEMAND)));
    Ok(())
}

#[test]
fn pending_triggers_coalesce() {
    let mut pending = PendingTriggers::new();
    assert!(pending.record(ON_DEMAND));
    assert!(!pending.record(ON_DEMAND));
    assert!(pending.record(Trigger::Lifecycle(LifecycleEvent::Login)));

    assert_eq!(pending.len(), 2);
    let drained = pending.drain();
    assert_eq!(drained.len(), 2);
    assert!(pending.is_empty());
}

#[test]
fn signals_during_a_run_produce_exactly_one_follow_up() {
    let mut core = ServiceCore::new(
        Dispatcher::new(PrivilegeContext::User),
        RuntimeOptions::default(),
    );
    assert_eq!(core.state(), ServiceState::Registered);

    let first = core.step(RuntimeEvent::Triggered(ON_DEMAND));
    assert_eq!(batch_categories(&first.commands), Some(vec![Category::OnDemand]));
    assert_eq!(core.state(), ServiceState::Active);

    for _ in 0..3 {
        let queued = core.step(RuntimeEvent::Triggered(ON_DEMAND));
        assert!(queued.commands.is_empty());
        assert!(queued.keep_running);
    }
    assert_eq!(core.pending_len(), 1);

    let follow_up = core.step(RuntimeEvent::BatchFinished);
    assert_eq!(batch_categories(&follow_up.commands), Some(vec![Category::OnDemand]));
    assert_eq!(core.state(), ServiceState::Active);

    let done = core.step(RuntimeEvent::BatchFinished);
    assert!(done.commands.is_empty());
    assert!(done.keep_running);
    assert_eq!(core.state(), ServiceState::Idle);
    assert!(core.is_idle());
}

#[test]
fn one_shot_core_exits_when_idle() {
    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let mut core = ServiceCore::new(Dispatcher::new(PrivilegeContext::System), options);

    let started = core.step(RuntimeEvent::Triggered(Trigger::Lifecycle(LifecycleEvent::Boot)));
    assert_eq!(
        batch_categories(&started.commands),
        Some(vec![Category::BootOnce, Category::BootEvery])
    );

    let finished = core.step(RuntimeEvent::BatchFinished);
    assert!(!finished.keep_running);
    assert!(finished.commands.contains(&CoreCommand::RequestExit));
}

#[test]
fn shutdown_stops_the_core() {
    let mut core = ServiceCore::new(
        Dispatcher::new(PrivilegeContext::User),
        RuntimeOptions::default(),
    );
    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(!step.keep_running);
}

#[tokio::test]
async fn runtime_runs_one_follow_up_for_signals_received_mid_batch() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::OnDemand, "run.sh"), "echo");

    let executor = FakeExecutor::new().with_delay(Duration::from_millis(100));
    let scheduler = mock_scheduler(&fs, PrivilegeContext::User, &executor);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    for _ in 0..3 {
        rt_tx.send(RuntimeEvent::Triggered(ON_DEMAND)).await?;
    }

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let core = ServiceCore::new(Dispatcher::new(PrivilegeContext::User), options);
    let runtime = Runtime::new(core, rt_rx, scheduler, Vec::new());

    with_timeout(runtime.run()).await?;

    assert_eq!(executor.executed(), vec!["run.sh", "run.sh"]);
    Ok(())
}

#[tokio::test]
async fn shutdown_mid_batch_stops_the_runtime() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::OnDemand, "01-slow"), "sleep");
    fs.add_executable(unit_path(Category::OnDemand, "02-never"), "echo");

    let executor = FakeExecutor::new().with_delay(Duration::from_secs(30));
    let scheduler = mock_scheduler(&fs, PrivilegeContext::User, &executor);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    rt_tx.send(RuntimeEvent::Triggered(ON_DEMAND)).await?;
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = ServiceCore::new(
        Dispatcher::new(PrivilegeContext::User),
        RuntimeOptions::default(),
    );
    let runtime = Runtime::new(core, rt_rx, scheduler, Vec::new());

    with_timeout(runtime.run()).await?;

    // The slow unit was interrupted before it could be recorded.
    assert!(executor.executed().is_empty());
    Ok(())
}

#[tokio::test]
async fn signal_queued_at_shutdown_is_raised_again() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.add_executable(unit_path(Category::OnDemand, "slow"), "sleep");
    let marker = on_demand_marker(&fs);

    let executor = FakeExecutor::new().with_delay(Duration::from_secs(30));
    let scheduler = mock_scheduler(&fs, PrivilegeContext::User, &executor);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    rt_tx.send(RuntimeEvent::Triggered(ON_DEMAND)).await?;

    // A second request arrives mid-batch and the watcher consumes its marker.
    marker.raise()?;
    assert!(observe_marker(&marker, &rt_tx).await);
    assert!(!marker.is_pending());

    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;

    let core = ServiceCore::new(
        Dispatcher::new(PrivilegeContext::User),
        RuntimeOptions::default(),
    );
    let runtime = Runtime::new(core, rt_rx, scheduler, vec![marker.clone()]);
    with_timeout(runtime.run()).await?;

    assert!(executor.executed().is_empty());
    assert!(marker.is_pending(), "queued request must survive the shutdown");
    Ok(())
}

#[tokio::test]
async fn signal_left_in_the_channel_at_shutdown_is_raised_again() -> TestResult {
    init_tracing();

    let fs = MockFileSystem::new();
    let marker = on_demand_marker(&fs);
    let executor = FakeExecutor::new();
    let scheduler = mock_scheduler(&fs, PrivilegeContext::User, &executor);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    rt_tx.send(RuntimeEvent::ShutdownRequested).await?;
    marker.raise()?;
    assert!(observe_marker(&marker, &rt_tx).await);

    let core = ServiceCore::new(
        Dispatcher::new(PrivilegeContext::User),
        RuntimeOptions::default(),
    );
    let runtime = Runtime::new(core, rt_rx, scheduler, vec![marker.clone()]);
    with_timeout(runtime.run()).await?;

    assert!(executor.executed().is_empty());
    assert!(marker.is_pending());
    Ok(())
}

#[tokio::test]
async fn observing_without_a_runtime_keeps_the_marker() -> TestResult {
    let fs = MockFileSystem::new();
    let marker = on_demand_marker(&fs);
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(1);
    drop(rt_rx);

    marker.raise()?;
    assert!(!observe_marker(&marker, &rt_tx).await);
    assert!(marker.is_pending());
    Ok(())
}

#[test]
fn marker_directory_is_created_through_the_filesystem() -> TestResult {
    let fs = MockFileSystem::new();
    let marker = TriggerMarker::new(
        SignalKind::OnDemand,
        "/var/outset/markers/.outset.on-demand",
        Arc::new(fs.clone()),
    );

    marker.ensure_parent()?;

    assert!(fs.is_dir(std::path::Path::new("/var/outset/markers")));
    assert!(!marker.is_pending());
    Ok(())
}

#[cfg(unix)]
#[test]
fn raising_a_marker_never_writes_through_a_symlink() -> TestResult {
    let dir = tempfile::tempdir()?;
    let victim = dir.path().join("victim");
    std::fs::write(&victim, "precious")?;

    // Plant a symlink at a predictable temp name next to the marker.
    let planted = dir
        .path()
        .join(format!("..outset.on-demand.{}.tmp", std::process::id()));
    std::os::unix::fs::symlink(&victim, &planted)?;

    let marker_path = dir.path().join(".outset.on-demand");
    let marker = TriggerMarker::new(SignalKind::OnDemand, marker_path.clone(), Arc::new(RealFileSystem));
    marker.raise()?;
    marker.raise()?;

    assert_eq!(std::fs::read_to_string(&victim)?, "precious");
    assert!(std::fs::symlink_metadata(&marker_path)?.file_type().is_file());
    assert!(std::fs::symlink_metadata(&planted)?.file_type().is_symlink());

    // No temp files are left behind.
    let entries = std::fs::read_dir(dir.path())?.count();
    assert_eq!(entries, 3);
    Ok(())
}

#[tokio::test]
async fn watcher_turns_a_marker_into_a_single_trigger() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let marker = TriggerMarker::new(
        SignalKind::OnDemand,
        dir.path().join(".outset.on-demand"),
        Arc::clone(&fs),
    );

    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let _watcher = spawn_marker_watcher(vec![marker.clone()], rt_tx, Duration::from_secs(1))?;

    marker.raise()?;
    marker.raise()?;

    let event = with_timeout(rt_rx.recv()).await;
    assert!(matches!(event, Some(RuntimeEvent::Triggered(ON_DEMAND))));

    // Nothing else arrives: both raises were served by the one consume.
    let extra = timeout(Duration::from_millis(1500), rt_rx.recv()).await;
    assert!(extra.is_err(), "unexpected extra event: {extra:?}");
    assert!(!marker.is_pending());
    Ok(())
}

#[tokio::test]
async fn watcher_picks_up_markers_raised_before_start() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let marker = TriggerMarker::new(
        SignalKind::LoginPrivileged,
        dir.path().join(".outset.login-privileged"),
        Arc::new(RealFileSystem),
    );
    marker.raise()?;

    let (rt_tx, mut rt_rx) = mpsc::channel::<RuntimeEvent>(16);
    let _watcher = spawn_marker_watcher(vec![marker.clone()], rt_tx, Duration::from_secs(60))?;

    let event = with_timeout(rt_rx.recv()).await;
    assert!(matches!(
        event,
        Some(RuntimeEvent::Triggered(Trigger::Signal(SignalKind::LoginPrivileged)))
    ));
    Ok(())
}
