// src/trigger/marker.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::types::SignalKind;

/// A marker file whose presence means "a run of this signal is pending".
///
/// External actors call [`TriggerMarker::raise`]; the owning resident
/// service calls [`TriggerMarker::consume`] before acting on it.
#[derive(Debug, Clone)]
pub struct TriggerMarker {
    path: PathBuf,
    kind: SignalKind,
    fs: Arc<dyn FileSystem>,
}

impl TriggerMarker {
    pub fn new(kind: SignalKind, path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            path: path.into(),
            kind,
            fs,
        }
    }

    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_pending(&self) -> bool {
        self.fs.exists(&self.path)
    }

    /// Create the directory the marker lives in.
    pub fn ensure_parent(&self) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            self.fs.create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Create the marker. Raising an already pending marker is a no-op in
    /// effect: both requests are served by one run.
    pub fn raise(&self) -> Result<()> {
        self.fs.write_atomic(&self.path, b"")?;
        info!(signal = %self.kind, path = ?self.path, "raised trigger marker");
        Ok(())
    }

    /// Remove the marker. Returns `true` only for the caller whose removal
    /// actually deleted it, so one creation is handled at most once.
    pub fn consume(&self) -> bool {
        match self.fs.remove_file(&self.path) {
            Ok(true) => {
                info!(signal = %self.kind, path = ?self.path, "consumed trigger marker");
                true
            }
            Ok(false) => {
                debug!(signal = %self.kind, "trigger marker already consumed");
                false
            }
            Err(e) => {
                warn!(
                    signal = %self.kind,
                    path = ?self.path,
                    error = %e,
                    "failed to consume trigger marker"
                );
                false
            }
        }
    }
}
