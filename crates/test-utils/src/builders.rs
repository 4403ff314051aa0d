#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use outset::config::{ConfigFile, RawConfigFile};
use outset::registry::Category;
use tempfile::TempDir;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Every path starts out under `base`, so tests never touch the real queue
/// root, ledgers or marker files.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let mut config = RawConfigFile::default();
        config.paths.root = base.join("queue");
        config.paths.state_dir = base.join("state");
        config.paths.user_state_dir = Some(base.join("user-state"));
        config.trigger.on_demand_marker = base.join("markers/.outset.on-demand");
        config.trigger.privileged_marker = base.join("markers/.outset.login-privileged");
        config.services.descriptor_dir = base.join("services");
        Self { config }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.paths.root = root.into();
        self
    }

    pub fn with_exclude(mut self, pattern: &str) -> Self {
        self.config.execution.exclude.push(pattern.to_string());
        self
    }

    pub fn with_ignored_user(mut self, user: &str) -> Self {
        self.config.login.ignored_users.push(user.to_string());
        self
    }

    pub fn with_poll_interval_secs(mut self, secs: u64) -> Self {
        self.config.trigger.poll_interval_secs = secs;
        self
    }

    pub fn with_package_installer(mut self, argv: &[&str]) -> Self {
        self.config.execution.package_installer = argv.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

/// A queue root in a temporary directory with every category directory
/// created.
pub struct QueueDir {
    dir: TempDir,
}

impl QueueDir {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        for category in Category::ALL {
            fs::create_dir_all(category.dir(&dir.path().join("queue")))
                .expect("create category dir");
        }
        Self { dir }
    }

    /// Base directory; the queue root is `base()/queue`.
    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn root(&self) -> PathBuf {
        self.dir.path().join("queue")
    }

    /// Config builder whose paths all point into this directory.
    pub fn config(&self) -> ConfigFileBuilder {
        ConfigFileBuilder::new(self.base())
    }

    /// Write an executable `/bin/sh` script with `body` into `category`.
    pub fn script(&self, category: Category, name: &str, body: &str) -> PathBuf {
        let path = category.dir(&self.root()).join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        set_mode(&path, 0o755);
        path
    }

    /// Write a plain, non-executable file into `category`.
    pub fn file(&self, category: Category, name: &str, contents: &str) -> PathBuf {
        let path = category.dir(&self.root()).join(name);
        fs::write(&path, contents).expect("write file");
        set_mode(&path, 0o644);
        path
    }
}

impl Default for QueueDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).expect("set permissions");
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}
