// src/reconcile/probe.rs

//! Per-project probing for tree construction
//!
//! Probing a project reads its build target, filters it for compatibility,
//! loads its manifest, and lists the package's libraries. It is independent
//! per project and runs on the rayon pool.

use super::ProjectFailure;
use crate::compat::{BuildTarget, compatible_configurations, is_compatible};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::host::{FileLister, ProjectHandle};
use crate::manifest::{ReferenceEntry, ReferenceManifest};
use crate::package::{DeveloperLibraryKind, PackageInfo};
use crate::progress::ProgressTracker;
use crate::tree::{NodeKind, ShapeNode};
use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// What the engine keeps about a probed project until commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub name: String,
    pub directory: PathBuf,
    pub manifest_path: PathBuf,
    /// Compatible configurations in declared order
    pub configurations: Vec<String>,
}

/// A compatible project, ready to become a subtree
#[derive(Debug, Clone)]
pub(crate) struct ProjectProbe {
    pub context: ProjectContext,
    pub shape: ShapeNode,
    pub existing: Option<ReferenceEntry>,
}

#[derive(Debug)]
pub(crate) enum ProbeOutcome {
    Compatible(ProjectProbe),
    Skipped,
    Cancelled,
    Failed(ProjectFailure),
}

/// How strictly to filter a project
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Filter {
    /// Drop unsupported and incompatible projects
    Compatible,
    /// Keep every project; used when removing a reference
    Any,
}

/// Probe every project, in solution order
///
/// Projects not yet started when `cancel` is raised report `Cancelled`.
pub(crate) fn probe_all(
    projects: &[&dyn ProjectHandle],
    package: &PackageInfo,
    lister: &dyn FileLister,
    config: &EngineConfig,
    progress: &dyn ProgressTracker,
    cancel: &AtomicBool,
) -> Vec<ProbeOutcome> {
    progress.set_length(projects.len() as u64);
    progress.set_message(&format!("Probing {} projects", projects.len()));

    let visit = |project: &&dyn ProjectHandle| -> ProbeOutcome {
        if cancel.load(Ordering::Relaxed) {
            return ProbeOutcome::Cancelled;
        }
        let outcome = match probe_project(*project, package, lister, config, Filter::Compatible) {
            Ok(Some(probe)) => ProbeOutcome::Compatible(probe),
            Ok(None) => ProbeOutcome::Skipped,
            Err(error) => {
                warn!("Skipping project {}: {}", project.name(), error);
                ProbeOutcome::Failed(ProjectFailure {
                    project: project.name().to_string(),
                    error,
                })
            }
        };
        progress.increment(1);
        outcome
    };

    if config.parallel_probe {
        projects.par_iter().map(visit).collect()
    } else {
        projects.iter().map(visit).collect()
    }
}

/// Probe one project
///
/// `Ok(None)` means the project is filtered out. Errors come from reading
/// the build target, a corrupt manifest, or listing the package directory.
pub(crate) fn probe_project(
    project: &dyn ProjectHandle,
    package: &PackageInfo,
    lister: &dyn FileLister,
    config: &EngineConfig,
    filter: Filter,
) -> Result<Option<ProjectProbe>> {
    let name = project.name();

    let target = if project.is_supported() {
        Some(project.build_target()?)
    } else {
        None
    };
    let compatible = target
        .as_ref()
        .is_some_and(|t| is_compatible(t, &package.descriptor));

    if filter == Filter::Compatible && !compatible {
        debug!("Project {} cannot reference {}", name, package.id());
        return Ok(None);
    }

    let manifest_path = config.manifest_path(project.directory());
    let manifest = ReferenceManifest::load(&manifest_path)?;
    let existing = manifest.find_entry_for(package.id(), false).cloned();

    let configurations = target
        .as_ref()
        .map(|t| compatible_configurations(t, package.descriptor.architecture()))
        .unwrap_or_default();

    let children = match (compatible, target.as_ref()) {
        (true, Some(target)) => children_for(target, &configurations, package, lister, config)?,
        _ => Vec::new(),
    };

    let shape = ShapeNode::branch(
        name,
        NodeKind::Project {
            directory: project.directory().to_path_buf(),
        },
        children,
    );

    Ok(Some(ProjectProbe {
        context: ProjectContext {
            name: name.to_string(),
            directory: project.directory().to_path_buf(),
            manifest_path,
            configurations,
        },
        shape,
        existing,
    }))
}

/// Configuration/library or assembly nodes below a project
///
/// An empty result leaves the project node as the only checkbox.
fn children_for(
    target: &BuildTarget,
    configurations: &[String],
    package: &PackageInfo,
    lister: &dyn FileLister,
    config: &EngineConfig,
) -> Result<Vec<ShapeNode>> {
    match package.kind() {
        DeveloperLibraryKind::NativeLibrary if target.is_native() => {
            let Some(dir) = &package.native_library_dir else {
                return Ok(Vec::new());
            };
            let libraries = lister.list(dir, &config.native_library_pattern)?;
            if libraries.is_empty() {
                return Ok(Vec::new());
            }

            Ok(configurations
                .iter()
                .map(|configuration| {
                    ShapeNode::branch(
                        configuration.as_str(),
                        NodeKind::Configuration,
                        libraries
                            .iter()
                            .map(|lib| {
                                ShapeNode::leaf(
                                    lib.as_str(),
                                    NodeKind::Library {
                                        configuration: configuration.clone(),
                                    },
                                )
                            })
                            .collect(),
                    )
                })
                .collect())
        }
        DeveloperLibraryKind::ManagedAssembly => {
            let Some(dir) = &package.managed_assembly_dir else {
                return Ok(Vec::new());
            };
            Ok(lister
                .list(dir, &config.managed_assembly_pattern)?
                .into_iter()
                .map(|assembly| ShapeNode::leaf(assembly, NodeKind::Assembly))
                .collect())
        }
        _ => Ok(Vec::new()),
    }
}
