// src/config/validate.rs

use globset::Glob;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{OutsetError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::OutsetError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_paths(cfg)?;
    validate_trigger(cfg)?;
    validate_execution(cfg)?;
    validate_login(cfg)?;
    Ok(())
}

fn validate_paths(cfg: &RawConfigFile) -> Result<()> {
    let paths = &cfg.paths;
    let mut checked = vec![
        ("[paths].root", &paths.root),
        ("[paths].state_dir", &paths.state_dir),
        ("[services].descriptor_dir", &cfg.services.descriptor_dir),
    ];
    if let Some(ref dir) = paths.user_state_dir {
        checked.push(("[paths].user_state_dir", dir));
    }

    for (key, path) in checked {
        if !path.is_absolute() {
            return Err(OutsetError::ConfigError(format!(
                "{key} must be an absolute path (got {:?})",
                path
            )));
        }
    }
    Ok(())
}

fn validate_trigger(cfg: &RawConfigFile) -> Result<()> {
    let trigger = &cfg.trigger;

    for (key, path) in [
        ("[trigger].on_demand_marker", &trigger.on_demand_marker),
        ("[trigger].privileged_marker", &trigger.privileged_marker),
    ] {
        if !path.is_absolute() || path.file_name().is_none() {
            return Err(OutsetError::ConfigError(format!(
                "{key} must be an absolute file path (got {:?})",
                path
            )));
        }
    }

    // Each marker is owned by a different context; sharing one file would let
    // either service consume the other's signal.
    if trigger.on_demand_marker == trigger.privileged_marker {
        return Err(OutsetError::ConfigError(
            "[trigger].on_demand_marker and [trigger].privileged_marker must differ".to_string(),
        ));
    }

    if trigger.poll_interval_secs == 0 {
        return Err(OutsetError::ConfigError(
            "[trigger].poll_interval_secs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_execution(cfg: &RawConfigFile) -> Result<()> {
    let exec = &cfg.execution;

    match exec.package_installer.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(OutsetError::ConfigError(
                "[execution].package_installer must name a program".to_string(),
            ));
        }
    }

    for pattern in exec.exclude.iter() {
        Glob::new(pattern).map_err(|e| {
            OutsetError::ConfigError(format!(
                "[execution].exclude has invalid pattern '{}': {}",
                pattern, e
            ))
        })?;
    }
    Ok(())
}

fn validate_login(cfg: &RawConfigFile) -> Result<()> {
    if cfg.login.ignored_users.iter().any(|u| u.trim().is_empty()) {
        return Err(OutsetError::ConfigError(
            "[login].ignored_users must not contain empty names".to_string(),
        ));
    }
    Ok(())
}
