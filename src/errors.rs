// src/errors.rs

//! Crate-wide error type and result alias.
//!
//! Configuration errors (bad root, unknown category, wrong context) are fatal
//! to the single requested operation only. Ledger and unit execution errors
//! are logged or folded into run reports and never stop a resident service.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::PrivilegeContext;

#[derive(Error, Debug)]
pub enum OutsetError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid queue root: {0:?} does not exist or is not a directory")]
    InvalidRoot(PathBuf),

    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    #[error("Category '{category}' belongs to the {expected} context, not {actual}")]
    ContextMismatch {
        category: String,
        expected: PrivilegeContext,
        actual: PrivilegeContext,
    },

    #[error("Failed to register service '{service}': {reason}")]
    Registration { service: String, reason: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Unit {unit:?} could not be executed: {reason}")]
    UnitExecution { unit: PathBuf, reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl OutsetError {
    /// True for the configuration class of errors: they reject the requested
    /// operation but leave any resident service running.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            OutsetError::ConfigError(_)
                | OutsetError::InvalidRoot(_)
                | OutsetError::CategoryNotFound(_)
                | OutsetError::ContextMismatch { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, OutsetError>;
