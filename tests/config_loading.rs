// tests/config_loading.rs

mod common;
use crate::common::{ConfigFileBuilder, TestResult};

use std::path::{Path, PathBuf};

use outset::config::{ConfigFile, RawConfigFile, load_and_validate, load_or_default};
use outset::errors::OutsetError;
use outset::types::SignalKind;

fn assert_config_error(raw: RawConfigFile, needle: &str) {
    match ConfigFile::try_from(raw) {
        Err(OutsetError::ConfigError(msg)) => {
            assert!(msg.contains(needle), "message {msg:?} lacks {needle:?}")
        }
        other => panic!("expected ConfigError mentioning {needle:?}, got {other:?}"),
    }
}

#[test]
fn missing_file_yields_defaults() -> TestResult {
    let dir = tempfile::tempdir()?;
    let cfg = load_or_default(dir.path().join("outset.toml"))?;

    assert_eq!(cfg.paths.root, PathBuf::from("/usr/local/outset"));
    assert_eq!(cfg.trigger.poll_interval_secs, 30);
    assert_eq!(
        cfg.execution.package_installer,
        vec!["installer", "-target", "/", "-pkg"]
    );
    assert_eq!(cfg.services.label_prefix, "io.outset");
    assert!(cfg.login.ignored_users.is_empty());
    Ok(())
}

#[test]
fn full_file_is_parsed() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("outset.toml");
    std::fs::write(
        &path,
        r#"
[paths]
root = "/opt/outset"
state_dir = "/var/lib/outset"
user_state_dir = "/home/alice/.outset"

[trigger]
on_demand_marker = "/run/outset/on-demand"
privileged_marker = "/run/outset/login-privileged"
poll_interval_secs = 5

[execution]
package_installer = ["dpkg", "-i"]
exclude = ["*.md", "README*"]

[services]
descriptor_dir = "/etc/outset/services"
program = "/opt/outset/bin/outset"
label_prefix = "org.example.outset"

[login]
ignored_users = ["admin", "kiosk"]
"#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.paths.root, PathBuf::from("/opt/outset"));
    assert_eq!(
        cfg.marker_path(SignalKind::OnDemand),
        Path::new("/run/outset/on-demand")
    );
    assert_eq!(cfg.trigger.poll_interval_secs, 5);
    assert_eq!(cfg.execution.exclude, vec!["*.md", "README*"]);
    assert_eq!(cfg.services.label_prefix, "org.example.outset");
    assert_eq!(cfg.login.ignored_users, vec!["admin", "kiosk"]);
    assert_eq!(
        cfg.ledger_path(outset::types::PrivilegeContext::User)?,
        PathBuf::from("/home/alice/.outset/user.ledger.toml")
    );
    Ok(())
}

#[test]
fn partial_file_keeps_defaults_for_the_rest() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("outset.toml");
    std::fs::write(&path, "[login]\nignored_users = [\"admin\"]\n")?;

    let cfg = load_or_default(&path)?;
    assert_eq!(cfg.login.ignored_users, vec!["admin"]);
    assert_eq!(cfg.paths.state_dir, PathBuf::from("/usr/local/outset/share"));
    Ok(())
}

#[test]
fn malformed_toml_is_a_toml_error() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("outset.toml");
    std::fs::write(&path, "[paths\nroot = ")?;

    assert!(matches!(
        load_and_validate(&path),
        Err(OutsetError::TomlError(_))
    ));
    Ok(())
}

#[test]
fn relative_paths_are_rejected() {
    let raw = ConfigFileBuilder::new("/base").with_root("queue").raw();
    assert_config_error(raw, "[paths].root");
}

#[test]
fn markers_must_differ() {
    let mut raw = ConfigFileBuilder::new("/base").raw();
    raw.trigger.privileged_marker = raw.trigger.on_demand_marker.clone();
    assert_config_error(raw, "must differ");
}

#[test]
fn zero_poll_interval_is_rejected() {
    let raw = ConfigFileBuilder::new("/base").with_poll_interval_secs(0).raw();
    assert_config_error(raw, "poll_interval_secs");
}

#[test]
fn empty_package_installer_is_rejected() {
    let raw = ConfigFileBuilder::new("/base").with_package_installer(&[]).raw();
    assert_config_error(raw, "package_installer");
}

#[test]
fn invalid_exclude_glob_is_rejected() {
    let raw = ConfigFileBuilder::new("/base").with_exclude("[oops").raw();
    assert_config_error(raw, "[execution].exclude");
}

#[test]
fn blank_ignored_user_is_rejected() {
    let raw = ConfigFileBuilder::new("/base").with_ignored_user("  ").raw();
    assert_config_error(raw, "ignored_users");
}
