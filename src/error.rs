// src/error.rs

//! Error types for reference reconciliation

use std::path::PathBuf;
use thiserror::Error;

/// Failure while applying a build-setting mutation to one project
///
/// Returned by [`crate::host::BuildSettings`] implementations. The engine
/// records it against the project and moves on to the next one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to update build settings of '{project}': {reason}")]
pub struct BuildSettingsMutationError {
    pub project: String,
    pub reason: String,
}

impl BuildSettingsMutationError {
    pub fn new(project: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            reason: reason.into(),
        }
    }
}

/// Errors produced by the reconciliation core
#[derive(Error, Debug)]
pub enum Error {
    /// Manifest exists but is not a well-formed reference document
    #[error("Reference manifest '{}' is corrupt: {reason}", path.display())]
    ManifestCorrupt { path: PathBuf, reason: String },

    /// A package was forced onto a project that cannot reference it
    #[error("Package '{package}' is not compatible with project '{project}'")]
    IncompatibleProject { project: String, package: String },

    #[error(transparent)]
    BuildSettings(#[from] BuildSettingsMutationError),

    /// Commit was handed a tree from a session that has since been replaced
    #[error("Selection tree belongs to a discarded session")]
    StaleSession,

    /// Commit or cancel without a built tree
    #[error("No reconciliation session in progress")]
    NoSession,

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;
