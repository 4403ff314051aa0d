// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod host;
pub mod ledger;
pub mod logging;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod trigger;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, bail};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, default_config_path, load_or_default};
use crate::engine::{Runtime, RuntimeEvent, RuntimeOptions, ServiceCore};
use crate::exec::{ProcessExecutor, UnitExecutor};
use crate::fs::{FileSystem, RealFileSystem};
use crate::host::{HostFacts, LocalHostFacts, current_user, log_host_facts};
use crate::ledger::{FileLedger, Ledger};
use crate::registry::{Category, DirectoryRegistry};
use crate::scheduler::{Eligibility, Scheduler};
use crate::service::{
    Dispatcher, FileServiceRegistrar, ServiceRegistrar, default_descriptors, register_all,
    unregister_all,
};
use crate::trigger::{TriggerMarker, spawn_marker_watcher};
use crate::types::{LifecycleEvent, PrivilegeContext, SignalKind, Trigger};

/// High-level entry point used by `main.rs`.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_or_default(&config_path)?;
    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    match args.command {
        Command::Serve { context, lifecycle } => serve(&cfg, fs, context, lifecycle).await,
        Command::Lifecycle { event, context } => run_lifecycle(&cfg, fs, context, event).await,
        Command::Run { category, dry_run } => run_single(&cfg, fs, &category, dry_run).await,
        Command::Signal { kind } => {
            for marker in trigger_markers(&cfg, fs).iter().filter(|m| m.kind() == kind) {
                marker.raise()?;
            }
            Ok(())
        }
        Command::Install => install(&cfg, fs),
        Command::Uninstall => uninstall(&cfg, fs),
        Command::Status => {
            print_status(&cfg, fs);
            Ok(())
        }
        Command::Cleanup { context } => cleanup(&cfg, fs, context),
    }
}

/// Build the scheduler for `context` with its own ledger file.
pub fn build_scheduler(
    cfg: &ConfigFile,
    context: PrivilegeContext,
    fs: Arc<dyn FileSystem>,
    executor: Arc<dyn UnitExecutor>,
) -> errors::Result<Scheduler> {
    let registry = DirectoryRegistry::new(&cfg.paths.root, Arc::clone(&fs))
        .with_exclude(&cfg.execution.exclude)?;
    let ledger = FileLedger::new(cfg.ledger_path(context)?, fs);
    Ok(Scheduler::new(context, registry, Box::new(ledger), executor))
}

pub fn build_dispatcher(cfg: &ConfigFile, context: PrivilegeContext) -> Dispatcher {
    Dispatcher::new(context).with_ignored_users(cfg.login.ignored_users.clone(), current_user())
}

/// Both trigger markers. Each is consumed only by its owning context but
/// may be raised by anyone.
pub fn trigger_markers(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Vec<TriggerMarker> {
    [SignalKind::OnDemand, SignalKind::LoginPrivileged]
        .into_iter()
        .map(|kind| TriggerMarker::new(kind, cfg.marker_path(kind), Arc::clone(&fs)))
        .collect()
}

/// Forward Ctrl-C / SIGTERM into the runtime as `ShutdownRequested`.
fn spawn_shutdown_listener(tx: mpsc::Sender<RuntimeEvent>) {
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
    });
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{SignalKind as UnixSignal, signal};

    match signal(UnixSignal::terminate()) {
        Ok(mut term) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = term.recv() => {}
            }
        }
        Err(e) => {
            eprintln!("failed to listen for SIGTERM: {e}");
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("failed to listen for Ctrl+C: {e}");
    }
}

fn process_executor(cfg: &ConfigFile) -> Arc<dyn UnitExecutor> {
    Arc::new(ProcessExecutor::new(cfg.execution.package_installer.clone()))
}

/// Resident service: optionally handle the activating lifecycle event, then
/// wait for this context's markers until shut down.
async fn serve(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    context: PrivilegeContext,
    lifecycle: Option<LifecycleEvent>,
) -> Result<()> {
    log_host_facts(&LocalHostFacts::new(Arc::clone(&fs)));

    let scheduler = build_scheduler(cfg, context, Arc::clone(&fs), process_executor(cfg))?;
    let markers = trigger_markers(cfg, Arc::clone(&fs));
    let owned: Vec<TriggerMarker> = markers
        .iter()
        .filter(|m| m.kind().owner() == context)
        .cloned()
        .collect();

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);

    let _watcher = spawn_marker_watcher(
        owned,
        rt_tx.clone(),
        Duration::from_secs(cfg.trigger.poll_interval_secs),
    )?;
    spawn_shutdown_listener(rt_tx.clone());

    if let Some(event) = lifecycle {
        rt_tx
            .send(RuntimeEvent::Triggered(Trigger::Lifecycle(event)))
            .await?;
    }

    let core = ServiceCore::new(build_dispatcher(cfg, context), RuntimeOptions::default());
    Runtime::new(core, rt_rx, scheduler, markers).run().await?;
    Ok(())
}

/// One-shot lifecycle activation: handle `event` and exit when idle.
async fn run_lifecycle(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    context: PrivilegeContext,
    event: LifecycleEvent,
) -> Result<()> {
    let scheduler = build_scheduler(cfg, context, Arc::clone(&fs), process_executor(cfg))?;
    let markers = trigger_markers(cfg, fs);

    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(64);
    spawn_shutdown_listener(rt_tx.clone());
    rt_tx
        .send(RuntimeEvent::Triggered(Trigger::Lifecycle(event)))
        .await?;

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let core = ServiceCore::new(build_dispatcher(cfg, context), options);
    Runtime::new(core, rt_rx, scheduler, markers).run().await?;
    Ok(())
}

async fn run_single(
    cfg: &ConfigFile,
    fs: Arc<dyn FileSystem>,
    name: &str,
    dry_run: bool,
) -> Result<()> {
    let category = Category::from_name(name)?;
    let mut scheduler = build_scheduler(cfg, category.context(), fs, process_executor(cfg))?;

    if dry_run {
        println!("outset dry-run: {} ({} context)", category, category.context());
        for (unit, eligibility) in scheduler.eligible_units(category)? {
            println!("  {:<40} {}", unit.file_name(), describe(&eligibility));
        }
        return Ok(());
    }

    let report = scheduler.run_category(category).await?;
    print!("{report}");
    if !report.all_succeeded() {
        bail!("{} unit(s) in {} failed", report.failed().count(), category);
    }
    Ok(())
}

fn describe(eligibility: &Eligibility) -> String {
    match eligibility {
        Eligibility::Eligible => "will run".to_string(),
        Eligibility::AlreadyRan => "already ran".to_string(),
        Eligibility::Unreadable(reason) => format!("unreadable: {reason}"),
    }
}

fn install(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<()> {
    let registry = DirectoryRegistry::new(&cfg.paths.root, Arc::clone(&fs));
    registry.ensure_layout()?;
    fs.create_dir_all(&cfg.paths.state_dir)?;
    info!(root = ?cfg.paths.root, "queue layout ready");

    let registrar = FileServiceRegistrar::new(&cfg.services.descriptor_dir, fs);
    let outcomes = register_all(&registrar, &default_descriptors(cfg));

    let mut failed = 0;
    for outcome in outcomes.iter() {
        match &outcome.result {
            Ok(status) => println!("{:<24} {:?}", outcome.label, status),
            Err(e) => {
                failed += 1;
                println!("{:<24} FAILED: {}", outcome.label, e);
            }
        }
    }
    if failed > 0 {
        bail!("{failed} service registration(s) failed");
    }
    Ok(())
}

fn uninstall(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<()> {
    let registrar = FileServiceRegistrar::new(&cfg.services.descriptor_dir, fs);
    let mut failed = 0;
    for (label, result) in unregister_all(&registrar, &default_descriptors(cfg)) {
        match result {
            Ok(true) => println!("{label:<24} unregistered"),
            Ok(false) => println!("{label:<24} was not registered"),
            Err(e) => {
                failed += 1;
                println!("{label:<24} FAILED: {e}");
            }
        }
    }
    if failed > 0 {
        bail!("{failed} service de-registration(s) failed");
    }
    Ok(())
}

fn cleanup(cfg: &ConfigFile, fs: Arc<dyn FileSystem>, context: PrivilegeContext) -> Result<()> {
    let mut ledger = FileLedger::new(cfg.ledger_path(context)?, Arc::clone(&fs));
    let removed = ledger.prune(&|path| fs.is_file(path))?;
    println!("removed {removed} stale record(s) from {:?}", ledger.path());
    Ok(())
}

/// Read-only overview: services, categories, units with eligibility, and
/// host facts.
fn print_status(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) {
    println!("outset status");
    println!("  root = {:?}", cfg.paths.root);

    let registrar = FileServiceRegistrar::new(&cfg.services.descriptor_dir, Arc::clone(&fs));
    println!();
    println!("services:");
    for descriptor in default_descriptors(cfg) {
        println!(
            "  - {:<24} {}",
            descriptor.label,
            registrar.status(&descriptor.label)
        );
    }

    println!();
    println!("categories:");
    for context in [PrivilegeContext::System, PrivilegeContext::User] {
        let scheduler = match build_scheduler(cfg, context, Arc::clone(&fs), process_executor(cfg)) {
            Ok(s) => s,
            Err(e) => {
                warn!(%context, error = %e, "cannot inspect context");
                continue;
            }
        };
        for category in Category::ALL.iter().copied().filter(|c| c.context() == context) {
            println!(
                "  - {} ({}, {:?}, {})",
                category,
                category.context(),
                category.policy(),
                category.trigger()
            );
            match scheduler.eligible_units(category) {
                Ok(units) => {
                    for (unit, eligibility) in units {
                        println!("      {:<40} {}", unit.file_name(), describe(&eligibility));
                    }
                }
                Err(e) => println!("      ({e})"),
            }
        }
    }

    println!();
    println!("ledgers:");
    for context in [PrivilegeContext::System, PrivilegeContext::User] {
        let path = match cfg.ledger_path(context) {
            Ok(path) => path,
            Err(e) => {
                println!("  - {context}: ({e})");
                continue;
            }
        };
        let records = FileLedger::new(&path, Arc::clone(&fs)).records();
        println!("  - {context}: {} record(s) in {:?}", records.len(), path);
        for record in records {
            println!("      {} (completed_at={})", record.path.display(), record.completed_at);
        }
    }

    let facts = LocalHostFacts::new(fs);
    let show = |v: Option<String>| v.unwrap_or_else(|| "unknown".to_string());
    println!();
    println!("host:");
    println!("  os_version      = {}", show(facts.os_version()));
    println!("  os_build        = {}", show(facts.os_build()));
    println!("  hardware_model  = {}", show(facts.hardware_model()));
    println!("  marketing_model = {}", show(facts.marketing_model()));
    println!("  serial_number   = {}", show(facts.serial_number()));
}
