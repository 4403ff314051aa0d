// src/ledger/store.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::{OutsetError, Result};
use crate::fs::FileSystem;
use crate::ledger::fingerprint::UnitIdentity;
use crate::types::PrivilegeContext;

/// One completed run of a `once` unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub context: PrivilegeContext,
    pub path: PathBuf,
    pub fingerprint: String,
    /// Seconds since the Unix epoch.
    pub completed_at: u64,
}

impl RunRecord {
    fn matches(&self, identity: &UnitIdentity, context: PrivilegeContext) -> bool {
        self.context == context
            && self.path == identity.path
            && self.fingerprint == identity.fingerprint
    }
}

/// On-disk layout: an array of `[[record]]` tables.
#[derive(Debug, Default, Serialize, Deserialize)]
struct LedgerFile {
    #[serde(default, rename = "record")]
    records: Vec<RunRecord>,
}

/// Persistent record of which `once` units already completed.
pub trait Ledger: Send + Sync {
    /// Never fails: an unreadable ledger answers `false`.
    fn has_run(&self, identity: &UnitIdentity, context: PrivilegeContext) -> bool;

    /// Idempotent.
    fn mark_run(&mut self, identity: &UnitIdentity, context: PrivilegeContext) -> Result<()>;

    /// Drop records whose path `keep` rejects. Returns how many were removed.
    fn prune(&mut self, keep: &dyn Fn(&Path) -> bool) -> Result<usize>;

    fn records(&self) -> Vec<RunRecord>;
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Times `mark_run` re-reads a ledger that another process keeps rewriting
/// before writing anyway.
const MARK_ATTEMPTS: usize = 3;

/// Ledger stored in a TOML file, rewritten atomically on every change.
///
/// Each privilege context writes its own file; the other context may read it
/// at any time and sees either the previous or the next complete version.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
    fs: Arc<dyn FileSystem>,
}

impl FileLedger {
    pub fn new(path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            fs,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger, failing open: missing, unreadable or corrupt files
    /// are all treated as empty.
    fn load(&self) -> LedgerFile {
        self.parse(self.read_raw().as_deref())
    }

    fn read_raw(&self) -> Option<String> {
        if !self.fs.exists(&self.path) {
            return None;
        }

        match self.fs.read_to_string(&self.path) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!(
                    path = ?self.path,
                    error = %e,
                    "ledger unreadable; treating as empty"
                );
                None
            }
        }
    }

    fn parse(&self, contents: Option<&str>) -> LedgerFile {
        let Some(contents) = contents else {
            return LedgerFile::default();
        };

        match toml::from_str::<LedgerFile>(contents) {
            Ok(file) => file,
            Err(e) => {
                warn!(
                    path = ?self.path,
                    error = %e,
                    "ledger corrupt; treating as empty"
                );
                LedgerFile::default()
            }
        }
    }

    /// Digest of the file as it is on disk now. `None` if missing or
    /// unreadable.
    fn snapshot(&self) -> Option<blake3::Hash> {
        self.fs
            .read_to_string(&self.path)
            .ok()
            .map(|c| blake3::hash(c.as_bytes()))
    }

    fn save(&self, file: &LedgerFile) -> Result<()> {
        let text = toml::to_string(file)?;
        self.fs
            .write_atomic(&self.path, text.as_bytes())
            .map_err(|e| OutsetError::Ledger(format!("writing {:?}: {:#}", self.path, e)))
    }
}

impl Ledger for FileLedger {
    fn has_run(&self, identity: &UnitIdentity, context: PrivilegeContext) -> bool {
        self.load()
            .records
            .iter()
            .any(|r| r.matches(identity, context))
    }

    fn mark_run(&mut self, identity: &UnitIdentity, context: PrivilegeContext) -> Result<()> {
        // Re-read right before writing so records added by another process
        // since our last read are kept. If the file changes between that read
        // and the write, start over from the new contents.
        let mut attempt = 1;
        loop {
            let raw = self.read_raw();
            let seen = raw.as_deref().map(|c| blake3::hash(c.as_bytes()));
            let mut file = self.parse(raw.as_deref());
            if file.records.iter().any(|r| r.matches(identity, context)) {
                debug!(unit = %identity, %context, "already marked as run");
                return Ok(());
            }

            file.records.push(RunRecord {
                context,
                path: identity.path.clone(),
                fingerprint: identity.fingerprint.clone(),
                completed_at: now_secs(),
            });

            if attempt < MARK_ATTEMPTS && self.snapshot() != seen {
                debug!(unit = %identity, attempt, "ledger changed while marking; re-reading");
                attempt += 1;
                continue;
            }

            self.save(&file)?;
            info!(unit = %identity, %context, "marked unit as run (file)");
            return Ok(());
        }
    }

    fn prune(&mut self, keep: &dyn Fn(&Path) -> bool) -> Result<usize> {
        let mut file = self.load();
        let initial_len = file.records.len();
        file.records.retain(|r| keep(&r.path));

        let removed = initial_len - file.records.len();
        if removed > 0 {
            self.save(&file)?;
            info!(removed, path = ?self.path, "pruned stale run records (file)");
        }
        Ok(removed)
    }

    fn records(&self) -> Vec<RunRecord> {
        self.load().records
    }
}

/// Ledger kept in memory only (lost on restart).
#[derive(Debug, Default, Clone)]
pub struct MemoryLedger {
    records: Vec<RunRecord>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Ledger for MemoryLedger {
    fn has_run(&self, identity: &UnitIdentity, context: PrivilegeContext) -> bool {
        self.records.iter().any(|r| r.matches(identity, context))
    }

    fn mark_run(&mut self, identity: &UnitIdentity, context: PrivilegeContext) -> Result<()> {
        if !self.has_run(identity, context) {
            self.records.push(RunRecord {
                context,
                path: identity.path.clone(),
                fingerprint: identity.fingerprint.clone(),
                completed_at: now_secs(),
            });
            info!(unit = %identity, %context, "marked unit as run (memory)");
        }
        Ok(())
    }

    fn prune(&mut self, keep: &dyn Fn(&Path) -> bool) -> Result<usize> {
        let initial_len = self.records.len();
        self.records.retain(|r| keep(&r.path));
        let removed = initial_len - self.records.len();
        if removed > 0 {
            info!(removed, "pruned stale run records (memory)");
        }
        Ok(removed)
    }

    fn records(&self) -> Vec<RunRecord> {
        self.records.clone()
    }
}
