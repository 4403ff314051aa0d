// src/ledger/fingerprint.rs

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Identity of a unit for run-once purposes: where it is and what it
/// contains. Replacing a file's content under the same name produces a new
/// identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitIdentity {
    pub path: PathBuf,
    pub fingerprint: String,
}

impl UnitIdentity {
    pub fn of(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let fingerprint = compute_fingerprint(fs, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            fingerprint,
        })
    }
}

impl fmt::Display for UnitIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.fingerprint.get(..12).unwrap_or(&self.fingerprint);
        write!(f, "{}@{}", self.path.display(), short)
    }
}

/// blake3 hex digest of a file's content.
pub fn compute_fingerprint(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let hash = hasher.finalize().to_hex().to_string();
    debug!(?path, hash = %hash, "computed unit fingerprint");
    Ok(hash)
}
