// src/local/mod.rs

//! Filesystem-backed collaborators
//!
//! Stand-ins for the IDE host and package manager used by the command line
//! tool: a solution described in TOML, a package index over installed
//! package directories, and build settings that only record mutations.

mod settings;
mod solution;
mod source;

pub use settings::DryRunSettings;
pub use solution::{LocalProject, LocalSolution, ProjectFile, ProjectKind, SolutionFile};
pub use source::{ASSEMBLY_DIR, INCLUDE_DIR, IndexEntry, LIBRARY_DIR, LocalPackageSource};
