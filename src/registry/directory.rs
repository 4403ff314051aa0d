// src/registry/directory.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};

use crate::errors::{OutsetError, Result};
use crate::fs::FileSystem;
use crate::registry::category::Category;

/// How a unit is handed to the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Executed directly; needs the executable bit.
    Script,
    /// Installer package (`.pkg` / `.mpkg`), passed to the package installer.
    Package,
}

impl UnitKind {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("pkg") | Some("mpkg") => UnitKind::Package,
            _ => UnitKind::Script,
        }
    }
}

/// A single file inside a category directory.
///
/// Units are owned by the filesystem; the scheduler only reads and executes
/// them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub path: PathBuf,
    pub category: Category,
    pub executable: bool,
    pub kind: UnitKind,
}

impl Unit {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Enumerates categories and their units under one queue root.
#[derive(Debug, Clone)]
pub struct DirectoryRegistry {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    exclude: GlobSet,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            root: root.into(),
            fs,
            exclude: GlobSet::empty(),
        }
    }

    /// Ignore files whose name matches any of `patterns`.
    pub fn with_exclude(mut self, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                OutsetError::ConfigError(format!("invalid exclude pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }
        self.exclude = builder
            .build()
            .map_err(|e| OutsetError::ConfigError(format!("building exclude set: {}", e)))?;
        Ok(self)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    fn check_root(&self) -> Result<()> {
        if !self.fs.is_dir(&self.root) {
            return Err(OutsetError::InvalidRoot(self.root.clone()));
        }
        Ok(())
    }

    /// Categories whose directory exists under the root, in table order.
    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.check_root()?;
        Ok(Category::ALL
            .iter()
            .copied()
            .filter(|c| self.fs.is_dir(&c.dir(&self.root)))
            .collect())
    }

    /// Units of `category`, sorted by file name.
    ///
    /// Hidden files, directories and excluded names are skipped. Ordering is
    /// byte order of the file name so runs are reproducible; modification
    /// times are never consulted.
    pub fn units_in(&self, category: Category) -> Result<Vec<Unit>> {
        self.check_root()?;

        let dir = category.dir(&self.root);
        if !self.fs.is_dir(&dir) {
            return Err(OutsetError::CategoryNotFound(category.name().to_string()));
        }

        let mut units = Vec::new();
        for path in self.fs.read_dir(&dir)? {
            let Some(name) = path.file_name() else {
                continue;
            };
            if name.to_string_lossy().starts_with('.') {
                continue;
            }
            if !self.fs.is_file(&path) {
                debug!(?path, "skipping non-file entry in queue directory");
                continue;
            }
            if self.exclude.is_match(Path::new(name)) {
                debug!(?path, "skipping excluded file");
                continue;
            }

            let executable = self.fs.is_executable(&path);
            let kind = UnitKind::from_path(&path);
            if kind == UnitKind::Script && !executable {
                warn!(?path, category = %category, "queued script is not executable");
            }

            units.push(Unit {
                path,
                category,
                executable,
                kind,
            });
        }

        units.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
        debug!(category = %category, count = units.len(), "resolved units");
        Ok(units)
    }

    /// Create the root and every category directory.
    pub fn ensure_layout(&self) -> Result<()> {
        for category in Category::ALL {
            self.fs.create_dir_all(&category.dir(&self.root))?;
        }
        Ok(())
    }
}
