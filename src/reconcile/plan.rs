// src/reconcile/plan.rs

//! Diff between a project's edited selection and its manifest entry
//!
//! For one project the plan splits libraries into newly selected, newly
//! deselected and unchanged, decides what happens to the manifest entry, and
//! lists the build-setting mutations in application order: search
//! directories first, then linker dependencies / assembly references.

use crate::manifest::ReferenceEntry;
use crate::package::{DeveloperLibraryKind, LibraryArtifact, PackageInfo, versioned_library_name};
use crate::version::same_version;
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// A single change to a project's build settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildMutation {
    /// `configuration: None` applies to every configuration
    AddIncludeDirectory {
        project: String,
        configuration: Option<String>,
        path: PathBuf,
    },
    RemoveIncludeDirectory {
        project: String,
        configuration: Option<String>,
        path: PathBuf,
    },
    AddLibraryDirectory {
        project: String,
        configuration: Option<String>,
        path: PathBuf,
    },
    RemoveLibraryDirectory {
        project: String,
        configuration: Option<String>,
        path: PathBuf,
    },
    AddLinkerDependency {
        project: String,
        configuration: String,
        library: String,
    },
    RemoveLinkerDependency {
        project: String,
        configuration: String,
        library: String,
    },
    AddAssemblyReference {
        project: String,
        assembly: String,
        hint_path: PathBuf,
    },
    RemoveAssemblyReference {
        project: String,
        assembly: String,
    },
}

impl BuildMutation {
    /// Project this mutation targets
    pub fn project(&self) -> &str {
        match self {
            Self::AddIncludeDirectory { project, .. }
            | Self::RemoveIncludeDirectory { project, .. }
            | Self::AddLibraryDirectory { project, .. }
            | Self::RemoveLibraryDirectory { project, .. }
            | Self::AddLinkerDependency { project, .. }
            | Self::RemoveLinkerDependency { project, .. }
            | Self::AddAssemblyReference { project, .. }
            | Self::RemoveAssemblyReference { project, .. } => project,
        }
    }

    pub fn is_addition(&self) -> bool {
        matches!(
            self,
            Self::AddIncludeDirectory { .. }
                | Self::AddLibraryDirectory { .. }
                | Self::AddLinkerDependency { .. }
                | Self::AddAssemblyReference { .. }
        )
    }

    /// Search-path mutations, applied before reference mutations
    pub fn is_directory(&self) -> bool {
        matches!(
            self,
            Self::AddIncludeDirectory { .. }
                | Self::RemoveIncludeDirectory { .. }
                | Self::AddLibraryDirectory { .. }
                | Self::RemoveLibraryDirectory { .. }
        )
    }
}

fn scope(configuration: &Option<String>) -> &str {
    configuration.as_deref().unwrap_or("all configurations")
}

impl fmt::Display for BuildMutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddIncludeDirectory { project, configuration, path } => write!(
                f,
                "{}: add include directory {} ({})",
                project,
                path.display(),
                scope(configuration)
            ),
            Self::RemoveIncludeDirectory { project, configuration, path } => write!(
                f,
                "{}: remove include directory {} ({})",
                project,
                path.display(),
                scope(configuration)
            ),
            Self::AddLibraryDirectory { project, configuration, path } => write!(
                f,
                "{}: add library directory {} ({})",
                project,
                path.display(),
                scope(configuration)
            ),
            Self::RemoveLibraryDirectory { project, configuration, path } => write!(
                f,
                "{}: remove library directory {} ({})",
                project,
                path.display(),
                scope(configuration)
            ),
            Self::AddLinkerDependency { project, configuration, library } => {
                write!(f, "{}: link {} ({})", project, library, configuration)
            }
            Self::RemoveLinkerDependency { project, configuration, library } => {
                write!(f, "{}: unlink {} ({})", project, library, configuration)
            }
            Self::AddAssemblyReference { project, assembly, hint_path } => write!(
                f,
                "{}: reference {} ({})",
                project,
                assembly,
                hint_path.display()
            ),
            Self::RemoveAssemblyReference { project, assembly } => {
                write!(f, "{}: drop reference {}", project, assembly)
            }
        }
    }
}

/// What happens to the project's manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestAction {
    Unchanged,
    Write(ReferenceEntry),
    Delete,
}

/// A project's edited state as read off the selection tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSelection {
    pub project: String,
    /// Configurations search directories are scoped to; empty means all
    pub configurations: Vec<String>,
    /// Every enumerable library of the project with its selected flag
    pub libraries: Vec<LibraryArtifact>,
    /// Package-level checkbox of a project without enumerable libraries
    pub unconditional: bool,
}

impl ProjectSelection {
    fn selected(&self) -> Vec<LibraryArtifact> {
        let set: BTreeSet<LibraryArtifact> = self
            .libraries
            .iter()
            .filter(|l| l.selected)
            .cloned()
            .collect();
        set.into_iter().collect()
    }

    /// Whether the project should reference the package after commit
    pub fn references_package(&self) -> bool {
        self.unconditional || self.libraries.iter().any(|l| l.selected)
    }
}

/// Planned changes for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPlan {
    pub project: String,
    pub manifest: ManifestAction,
    pub added: Vec<LibraryArtifact>,
    pub removed: Vec<LibraryArtifact>,
    pub unchanged: Vec<LibraryArtifact>,
    /// Directory mutations, then reference mutations
    pub mutations: Vec<BuildMutation>,
}

impl ProjectPlan {
    /// Check if nothing needs to change
    pub fn is_empty(&self) -> bool {
        self.manifest == ManifestAction::Unchanged
            && self.added.is_empty()
            && self.removed.is_empty()
    }
}

/// Compute the plan for one project
///
/// `existing` is the manifest entry for the same package variant, any
/// version. A version change replaces every physical reference: old ones are
/// removed under the old version name, selected ones added under the new.
pub fn plan_project(
    selection: &ProjectSelection,
    existing: Option<&ReferenceEntry>,
    package: &PackageInfo,
) -> ProjectPlan {
    let id = package.id();
    let desired = selection.selected();
    let referencing = selection.references_package();
    let previous: &[LibraryArtifact] = existing.map(|e| e.libraries.as_slice()).unwrap_or(&[]);
    let version_changed = existing.is_some_and(|e| !same_version(&e.package.version, &id.version));

    let (added, removed, unchanged) = if version_changed {
        (desired.clone(), previous.to_vec(), Vec::new())
    } else {
        let before: BTreeSet<(Option<&str>, &str)> = previous.iter().map(|l| l.key()).collect();
        let after: BTreeSet<(Option<&str>, &str)> = desired.iter().map(|l| l.key()).collect();
        (
            desired
                .iter()
                .filter(|l| !before.contains(&l.key()))
                .cloned()
                .collect(),
            previous
                .iter()
                .filter(|l| !after.contains(&l.key()))
                .cloned()
                .collect(),
            desired
                .iter()
                .filter(|l| before.contains(&l.key()))
                .cloned()
                .collect(),
        )
    };

    let manifest = if referencing {
        let entry = ReferenceEntry::new(id.clone(), desired);
        if existing == Some(&entry) {
            ManifestAction::Unchanged
        } else {
            ManifestAction::Write(entry)
        }
    } else if existing.is_some() {
        ManifestAction::Delete
    } else {
        ManifestAction::Unchanged
    };

    // Nothing to change means nothing to apply, search directories included
    if manifest == ManifestAction::Unchanged && added.is_empty() && removed.is_empty() {
        return ProjectPlan {
            project: selection.project.clone(),
            manifest,
            added,
            removed,
            unchanged,
            mutations: Vec::new(),
        };
    }

    let mut mutations = directory_mutations(selection, package, referencing, existing.is_some());

    let old_version = existing.map(|e| e.package.version.as_str()).unwrap_or(&id.version);
    for lib in &removed {
        mutations.push(match &lib.configuration {
            Some(configuration) => BuildMutation::RemoveLinkerDependency {
                project: selection.project.clone(),
                configuration: configuration.clone(),
                library: versioned_library_name(&lib.name, old_version),
            },
            None => BuildMutation::RemoveAssemblyReference {
                project: selection.project.clone(),
                assembly: lib.name.clone(),
            },
        });
    }
    for lib in &added {
        mutations.push(match &lib.configuration {
            Some(configuration) => BuildMutation::AddLinkerDependency {
                project: selection.project.clone(),
                configuration: configuration.clone(),
                library: versioned_library_name(&lib.name, &id.version),
            },
            None => BuildMutation::AddAssemblyReference {
                project: selection.project.clone(),
                assembly: lib.name.clone(),
                hint_path: package
                    .managed_assembly_dir
                    .as_ref()
                    .map(|dir| dir.join(&lib.name))
                    .unwrap_or_else(|| PathBuf::from(&lib.name)),
            },
        });
    }

    ProjectPlan {
        project: selection.project.clone(),
        manifest,
        added,
        removed,
        unchanged,
        mutations,
    }
}

/// Include/library search paths for native packages
///
/// A referencing project gets them (re)asserted; a project that stops
/// referencing the package has them removed.
fn directory_mutations(
    selection: &ProjectSelection,
    package: &PackageInfo,
    referencing: bool,
    was_referencing: bool,
) -> Vec<BuildMutation> {
    let mut mutations = Vec::new();
    if !package.kind().is_native() || (!referencing && !was_referencing) {
        return mutations;
    }

    let scopes: Vec<Option<String>> = if selection.configurations.is_empty() {
        vec![None]
    } else {
        selection.configurations.iter().cloned().map(Some).collect()
    };
    let project = &selection.project;

    for configuration in scopes {
        if let Some(path) = &package.include_dir {
            mutations.push(if referencing {
                BuildMutation::AddIncludeDirectory {
                    project: project.clone(),
                    configuration: configuration.clone(),
                    path: path.clone(),
                }
            } else {
                BuildMutation::RemoveIncludeDirectory {
                    project: project.clone(),
                    configuration: configuration.clone(),
                    path: path.clone(),
                }
            });
        }

        if package.kind() == DeveloperLibraryKind::NativeLibrary {
            if let Some(path) = &package.native_library_dir {
                mutations.push(if referencing {
                    BuildMutation::AddLibraryDirectory {
                        project: project.clone(),
                        configuration: configuration.clone(),
                        path: path.clone(),
                    }
                } else {
                    BuildMutation::RemoveLibraryDirectory {
                        project: project.clone(),
                        configuration: configuration.clone(),
                        path: path.clone(),
                    }
                });
            }
        }
    }

    mutations
}

/// Removals for search paths of a replaced version the new one does not share
pub fn stale_directory_mutations(
    selection: &ProjectSelection,
    old: &PackageInfo,
    new: &PackageInfo,
) -> Vec<BuildMutation> {
    let current = [new.include_dir.as_deref(), new.native_library_dir.as_deref()];
    directory_mutations(selection, old, false, true)
        .into_iter()
        .filter(|m| match m {
            BuildMutation::RemoveIncludeDirectory { path, .. }
            | BuildMutation::RemoveLibraryDirectory { path, .. } => {
                !current.contains(&Some(path.as_path()))
            }
            _ => true,
        })
        .collect()
}
