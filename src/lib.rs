// src/lib.rs

//! pkgwire: package reference reconciliation for IDE solutions
//!
//! Keeps each project's reference manifest and build settings in step with a
//! user's choice of which libraries of a package the project should use.
//!
//! # Architecture
//!
//! - Manifest: per-project XML record of referenced packages and libraries
//! - Compatibility: which projects and configurations can use a package
//! - Selection tree: tri-state checkboxes over solution, projects,
//!   configurations and libraries
//! - Reconciliation: builds the tree from manifests, diffs the edited tree,
//!   and applies manifest and build-setting changes per project

pub mod cache;
pub mod compat;
pub mod config;
mod error;
pub mod flavor;
pub mod host;
pub mod local;
pub mod manifest;
pub mod package;
pub mod progress;
pub mod reconcile;
pub mod tree;
pub mod version;

pub use cache::{CachedPackageSource, TimedCache};
pub use compat::{BuildConfiguration, BuildTarget, FrameworkTarget, compatible_configurations, is_compatible};
pub use config::EngineConfig;
pub use error::{BuildSettingsMutationError, Error, Result};
pub use flavor::{Flavor, FlavorTag, FrameworkFamily, FrameworkRequirement};
pub use host::{BuildSettings, FileLister, GlobLister, PackageSource, ProjectHandle, Solution};
pub use manifest::{EntryQuery, ReferenceEntry, ReferenceManifest};
pub use package::{
    Architecture, DeveloperLibraryKind, LibraryArtifact, PackageDescriptor, PackageId, PackageInfo,
    versioned_library_name,
};
pub use progress::{BarProgress, CallbackProgress, LogProgress, ProgressEvent, ProgressTracker, SilentProgress};
pub use reconcile::{
    BuildMutation, BuildOutcome, CommitReport, ProjectCommit, ProjectFailure, ReconciliationEngine,
    SessionEnd, SessionState,
};
pub use tree::{CheckState, CheckedChanged, NodeId, NodeKind, SelectionTree, ShapeNode};
pub use version::PackageVersion;
