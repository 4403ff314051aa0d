// src/exec/unit_runner.rs

//! Individual unit process runner.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{error, info, warn};

use crate::errors::{OutsetError, Result};
use crate::exec::UnitStatus;
use crate::registry::{Unit, UnitKind};

/// Run one unit to completion and report its status.
///
/// Launch problems (not executable, spawn failure, wait failure) become
/// `UnitStatus::LaunchFailed`; they are never propagated as errors so a
/// single bad unit cannot abort its category.
///
/// The child is spawned with `kill_on_drop`, so dropping this future (e.g.
/// on service shutdown) terminates it.
pub async fn run_unit(unit: &Unit, package_installer: &[String]) -> UnitStatus {
    match run_unit_inner(unit, package_installer).await {
        Ok(status) => status,
        Err(err) => {
            error!(
                unit = ?unit.path,
                category = %unit.category,
                error = %err,
                "unit execution error"
            );
            UnitStatus::LaunchFailed {
                reason: err.to_string(),
            }
        }
    }
}

fn build_command(unit: &Unit, package_installer: &[String]) -> Result<Command> {
    match unit.kind {
        UnitKind::Script => {
            if !unit.executable {
                return Err(OutsetError::UnitExecution {
                    unit: unit.path.clone(),
                    reason: "not executable".to_string(),
                });
            }
            Ok(Command::new(&unit.path))
        }
        UnitKind::Package => {
            let (program, args) =
                package_installer
                    .split_first()
                    .ok_or_else(|| OutsetError::UnitExecution {
                        unit: unit.path.clone(),
                        reason: "no package installer configured".to_string(),
                    })?;
            let mut cmd = Command::new(program);
            cmd.args(args).arg(&unit.path);
            Ok(cmd)
        }
    }
}

async fn run_unit_inner(unit: &Unit, package_installer: &[String]) -> Result<UnitStatus> {
    info!(
        unit = ?unit.path,
        category = %unit.category,
        kind = ?unit.kind,
        "starting unit"
    );

    let mut cmd = build_command(unit, package_installer)?;
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| OutsetError::UnitExecution {
        unit: unit.path.clone(),
        reason: format!("spawn failed: {e}"),
    })?;

    // Always consume both pipes so the child never blocks on a full buffer.
    if let Some(stdout) = child.stdout.take() {
        let name = unit.file_name();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                info!(unit = %name, "stdout: {}", line);
            }
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let name = unit.file_name();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(unit = %name, "stderr: {}", line);
            }
        });
    }

    let status = child.wait().await.map_err(|e| OutsetError::UnitExecution {
        unit: unit.path.clone(),
        reason: format!("waiting for process failed: {e}"),
    })?;

    info!(
        unit = ?unit.path,
        exit_code = ?status.code(),
        success = status.success(),
        "unit process exited"
    );

    if status.success() {
        Ok(UnitStatus::Succeeded)
    } else {
        Ok(UnitStatus::Failed {
            code: status.code(),
        })
    }
}
