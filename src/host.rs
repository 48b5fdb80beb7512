// src/host.rs

//! Collaborators the reconciliation core consumes
//!
//! The IDE host, the package manager client, and the project-file editor
//! are implemented elsewhere; the engine only sees these traits.

use crate::compat::BuildTarget;
use crate::error::{BuildSettingsMutationError, Error, Result};
use crate::package::{PackageId, PackageInfo};
use crate::reconcile::BuildMutation;
use glob::{MatchOptions, Pattern};
use std::path::Path;
use tracing::debug;

/// One project of a solution
///
/// Implementations are probed from rayon worker threads.
pub trait ProjectHandle: Send + Sync {
    /// Unique project name within the solution
    fn name(&self) -> &str;

    /// Directory holding the project file (and its reference manifest)
    fn directory(&self) -> &Path;

    /// Whether the host knows how to edit this project type at all
    fn is_supported(&self) -> bool;

    /// Read the project's build target; may parse project files
    fn build_target(&self) -> Result<BuildTarget>;
}

/// Solution enumerator
pub trait Solution: Sync {
    /// Projects in solution order
    fn projects(&self) -> Vec<&dyn ProjectHandle>;

    fn find_project(&self, name: &str) -> Option<&dyn ProjectHandle> {
        self.projects().into_iter().find(|p| p.name() == name)
    }
}

/// Package metadata provider
pub trait PackageSource: Send + Sync {
    /// Resolve a package identity to its descriptor and artifact locations
    fn resolve(&self, id: &PackageId) -> Result<PackageInfo>;
}

/// Lists files in a package directory
pub trait FileLister: Send + Sync {
    /// File names (not paths) in `dir` matching `pattern`, sorted
    ///
    /// A missing directory yields an empty list.
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<String>>;
}

/// Applies build-setting mutations to projects
pub trait BuildSettings {
    fn apply(&mut self, mutation: &BuildMutation) -> std::result::Result<(), BuildSettingsMutationError>;
}

/// [`FileLister`] over the local filesystem using glob patterns
///
/// Matching is case-insensitive, as package file names come from
/// case-insensitive filesystems.
#[derive(Debug, Clone, Copy, Default)]
pub struct GlobLister;

impl FileLister for GlobLister {
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<String>> {
        let full = format!(
            "{}/{}",
            Pattern::escape(&dir.to_string_lossy()),
            pattern
        );
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };

        let paths = glob::glob_with(&full, options)
            .map_err(|e| Error::ParseError(format!("Invalid file pattern '{}': {}", pattern, e)))?;

        let mut names = Vec::new();
        for entry in paths {
            let path = entry.map_err(|e| Error::IoError(e.to_string()))?;
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name() {
                names.push(name.to_string_lossy().into_owned());
            }
        }
        names.sort();

        debug!("{} files matching {} in {}", names.len(), pattern, dir.display());
        Ok(names)
    }
}
