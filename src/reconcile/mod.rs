// src/reconcile/mod.rs

//! Reconciliation of package references
//!
//! A session has two phases. [`ReconciliationEngine::build_tree`] probes
//! every project of a solution and returns a [`SelectionTree`] seeded from
//! the projects' manifests. The caller edits the tree, then
//! [`ReconciliationEngine::commit`] diffs it against the manifests and
//! applies the differences: manifest first, then search directories, then
//! linker dependencies and assembly references.
//!
//! ```text
//! Idle --build_tree--> TreeBuilt --commit--> Idle (Committed)
//!                          |
//!                          +------cancel---> Idle (Cancelled)
//! ```
//!
//! Building a new tree while one is outstanding discards the old session;
//! committing the discarded tree fails with [`Error::StaleSession`].

mod plan;
mod probe;

pub use plan::{
    BuildMutation, ManifestAction, ProjectPlan, ProjectSelection, plan_project,
    stale_directory_mutations,
};
pub use probe::ProjectContext;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::host::{BuildSettings, FileLister, GlobLister, PackageSource, ProjectHandle, Solution};
use crate::manifest::ReferenceManifest;
use crate::package::{LibraryArtifact, PackageId, PackageInfo};
use crate::progress::{ProgressTracker, SilentProgress};
use crate::tree::{NodeId, NodeKind, SelectionTree, ShapeNode};
use crate::version::same_version;
use probe::{Filter, ProbeOutcome, ProjectProbe};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info, warn};

/// Name of the tree's root node
pub const SOLUTION_NODE_NAME: &str = "solution";

/// A project that could not be probed or updated
#[derive(Debug)]
pub struct ProjectFailure {
    pub project: String,
    pub error: Error,
}

impl fmt::Display for ProjectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.project, self.error)
    }
}

/// Where the engine is in its session lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    TreeBuilt { session: u64, package: PackageId },
}

/// How the most recent session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    Committed,
    Cancelled,
    /// Replaced by a newer `build_tree` before commit
    Discarded,
}

/// Result of probing a solution
#[derive(Debug)]
pub struct BuildOutcome {
    /// `None` when no project can reference the package; this is how
    /// "no compatible project" is reported, never as an error
    pub tree: Option<SelectionTree>,
    /// Projects skipped because probing them failed
    pub failures: Vec<ProjectFailure>,
    /// False if cancellation stopped probing early
    pub complete: bool,
}

/// What commit did to one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectCommit {
    pub project: String,
    pub manifest: ManifestAction,
    pub added: Vec<LibraryArtifact>,
    pub removed: Vec<LibraryArtifact>,
    /// Mutations applied, in order
    pub mutations: Vec<BuildMutation>,
}

/// Result of a commit
#[derive(Debug, Default)]
pub struct CommitReport {
    pub updated: Vec<ProjectCommit>,
    pub failures: Vec<ProjectFailure>,
}

impl CommitReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Every mutation applied across projects
    pub fn mutations(&self) -> impl Iterator<Item = &BuildMutation> {
        self.updated.iter().flat_map(|p| p.mutations.iter())
    }

    /// One-line report of failed projects, if any
    pub fn failure_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.failures.iter().map(|f| f.project.as_str()).collect();
        Some(format!(
            "the following projects could not be updated: {}",
            names.join(", ")
        ))
    }
}

struct Session {
    id: u64,
    package: PackageInfo,
    projects: HashMap<String, ProjectContext>,
}

/// Builds selection trees and commits them back to projects
pub struct ReconciliationEngine {
    packages: Box<dyn PackageSource>,
    lister: Box<dyn FileLister>,
    progress: Box<dyn ProgressTracker>,
    config: EngineConfig,
    next_session: u64,
    session: Option<Session>,
    last_end: Option<SessionEnd>,
}

impl ReconciliationEngine {
    /// Engine over a package source, listing files with [`GlobLister`]
    pub fn new(packages: impl PackageSource + 'static) -> Self {
        Self {
            packages: Box::new(packages),
            lister: Box::new(GlobLister),
            progress: Box::new(SilentProgress::new()),
            config: EngineConfig::default(),
            next_session: 1,
            session: None,
            last_end: None,
        }
    }

    pub fn with_lister(mut self, lister: impl FileLister + 'static) -> Self {
        self.lister = Box::new(lister);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_progress(mut self, progress: impl ProgressTracker + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        match &self.session {
            Some(session) => SessionState::TreeBuilt {
                session: session.id,
                package: session.package.id().clone(),
            },
            None => SessionState::Idle,
        }
    }

    pub fn last_outcome(&self) -> Option<SessionEnd> {
        self.last_end
    }

    /// Probe `solution` and build the selection tree for `package`
    ///
    /// Raising `cancel` stops probing before the next project; the tree then
    /// covers only the projects already probed and is marked incomplete.
    pub fn build_tree(
        &mut self,
        solution: &dyn Solution,
        package: &PackageId,
        cancel: &AtomicBool,
    ) -> Result<BuildOutcome> {
        self.discard_session();
        let info = self.packages.resolve(package)?;
        let projects = solution.projects();
        info!(
            "Building selection tree for {} across {} projects",
            package,
            projects.len()
        );

        let outcomes = probe::probe_all(
            &projects,
            &info,
            self.lister.as_ref(),
            &self.config,
            self.progress.as_ref(),
            cancel,
        );

        let mut probes = Vec::new();
        let mut failures = Vec::new();
        let mut complete = true;
        for outcome in outcomes {
            match outcome {
                ProbeOutcome::Compatible(probe) => probes.push(probe),
                ProbeOutcome::Skipped => {}
                ProbeOutcome::Cancelled => complete = false,
                ProbeOutcome::Failed(failure) => failures.push(failure),
            }
        }

        self.progress.finish_with_message(&format!(
            "{} compatible projects, {} failed",
            probes.len(),
            failures.len()
        ));

        if probes.is_empty() {
            info!("No project can reference {}", package);
            return Ok(BuildOutcome {
                tree: None,
                failures,
                complete,
            });
        }

        let mut tree = self.open_session(info, probes, |_, _| None);
        if !complete {
            warn!("Probing cancelled; tree covers only probed projects");
            tree.mark_incomplete();
        }

        Ok(BuildOutcome {
            tree: Some(tree),
            failures,
            complete,
        })
    }

    /// Build the tree for a new session and make it current
    ///
    /// `seed` overrides the manifest-derived state of a leaf when it returns
    /// `Some`.
    fn open_session<F>(&mut self, package: PackageInfo, probes: Vec<ProjectProbe>, mut seed: F) -> SelectionTree
    where
        F: FnMut(&[String], &NodeKind) -> Option<bool>,
    {
        self.discard_session();

        let id = self.next_session;
        self.next_session += 1;

        let mut existing = HashMap::new();
        let mut projects = HashMap::new();
        let mut shapes = Vec::with_capacity(probes.len());
        for probe in probes {
            existing.insert(probe.context.name.clone(), probe.existing);
            projects.insert(probe.context.name.clone(), probe.context);
            shapes.push(probe.shape);
        }

        let shape = ShapeNode::branch(SOLUTION_NODE_NAME, NodeKind::Solution, shapes);
        let tree = SelectionTree::build_from_seed(shape, |path, kind| {
            if let Some(state) = seed(path, kind) {
                return state;
            }
            let Some(Some(entry)) = path.first().and_then(|p| existing.get(p)) else {
                return false;
            };
            match kind {
                NodeKind::Library { configuration } => path
                    .last()
                    .is_some_and(|name| entry.has_library(Some(configuration.as_str()), name)),
                NodeKind::Assembly => path.last().is_some_and(|name| entry.has_library(None, name)),
                NodeKind::Project { .. } => true,
                NodeKind::Solution | NodeKind::Configuration => false,
            }
        })
        .with_session(id);

        debug!("Opened session {} with {} tree nodes", id, tree.len());
        self.session = Some(Session {
            id,
            package,
            projects,
        });
        tree
    }

    /// End an uncommitted session, if any, as discarded
    fn discard_session(&mut self) {
        if let Some(old) = self.session.take() {
            debug!("Discarding uncommitted session {}", old.id);
            self.last_end = Some(SessionEnd::Discarded);
        }
    }

    /// Abandon the current session without touching any project
    pub fn cancel(&mut self) -> Result<()> {
        let session = self.session.take().ok_or(Error::NoSession)?;
        info!("Cancelled session {}", session.id);
        self.last_end = Some(SessionEnd::Cancelled);
        Ok(())
    }

    /// Apply the edited tree to every project in it
    ///
    /// Projects are processed independently; one project's failure is
    /// recorded in the report and the rest still run.
    pub fn commit(&mut self, tree: &SelectionTree, settings: &mut dyn BuildSettings) -> Result<CommitReport> {
        let session = match self.session.take() {
            None => return Err(Error::NoSession),
            Some(session) if session.id != tree.session() => {
                self.session = Some(session);
                return Err(Error::StaleSession);
            }
            Some(session) => session,
        };

        let id = session.package.id();
        info!("Committing session {} for {}", session.id, id);

        let mut report = CommitReport::default();
        for &project in tree.projects() {
            let name = tree.node(project).name();
            let Some(context) = session.projects.get(name) else {
                warn!("Tree project {} was not probed in this session", name);
                continue;
            };

            let selection = selection_of(tree, project, context);
            match self.apply_project(context, &selection, &session.package, settings) {
                Ok(Some(commit)) => report.updated.push(commit),
                Ok(None) => {}
                Err(error) => {
                    warn!("Failed to update {}: {}", name, error);
                    report.failures.push(ProjectFailure {
                        project: name.to_string(),
                        error,
                    });
                }
            }
        }

        if let Some(message) = report.failure_message() {
            warn!("{}", message);
        }
        info!(
            "Session {} committed: {} projects updated, {} failed",
            session.id,
            report.updated.len(),
            report.failures.len()
        );

        self.last_end = Some(SessionEnd::Committed);
        Ok(report)
    }

    /// Run one project's plan; `Ok(None)` if nothing changed
    ///
    /// An empty plan applies nothing, not even search directories.
    fn apply_project(
        &self,
        context: &ProjectContext,
        selection: &ProjectSelection,
        package: &PackageInfo,
        settings: &mut dyn BuildSettings,
    ) -> Result<Option<ProjectCommit>> {
        let mut manifest = ReferenceManifest::load(&context.manifest_path)?;
        let existing = manifest.find_entry_for(package.id(), false).cloned();
        let mut plan = plan_project(selection, existing.as_ref(), package);
        if plan.is_empty() {
            return Ok(None);
        }

        if let Some(previous) = existing
            .as_ref()
            .filter(|e| !same_version(&e.package.version, &package.id().version))
        {
            match self.packages.resolve(&previous.package) {
                Ok(old) => {
                    let stale = stale_directory_mutations(selection, &old, package);
                    plan.mutations.splice(0..0, stale);
                }
                Err(e) => debug!(
                    "Cannot resolve replaced {}, keeping its search paths: {}",
                    previous.package, e
                ),
            }
        }

        match &plan.manifest {
            ManifestAction::Unchanged => {}
            ManifestAction::Write(entry) => manifest.add_or_replace_entry(entry.clone())?,
            ManifestAction::Delete => {
                if let Some(entry) = &existing {
                    manifest.delete_entry(&entry.package)?;
                }
            }
        }

        for mutation in &plan.mutations {
            debug!("{}", mutation);
            settings.apply(mutation)?;
        }

        debug!(
            "{}: {} added, {} removed, {} unchanged",
            context.name,
            plan.added.len(),
            plan.removed.len(),
            plan.unchanged.len()
        );
        Ok(Some(ProjectCommit {
            project: plan.project,
            manifest: plan.manifest,
            added: plan.added,
            removed: plan.removed,
            mutations: plan.mutations,
        }))
    }

    /// Reference every library of `package` from one project
    ///
    /// Fails with [`Error::IncompatibleProject`] before touching anything if
    /// the project cannot reference the package. Replaces any uncommitted
    /// session.
    pub fn add_to_project(
        &mut self,
        project: &dyn ProjectHandle,
        package: &PackageId,
        settings: &mut dyn BuildSettings,
    ) -> Result<CommitReport> {
        let info = self.packages.resolve(package)?;
        let probe = probe::probe_project(project, &info, self.lister.as_ref(), &self.config, Filter::Compatible)?
            .ok_or_else(|| Error::IncompatibleProject {
                project: project.name().to_string(),
                package: package.to_string(),
            })?;

        info!("Adding {} to {}", package, project.name());
        let tree = self.open_session(info, vec![probe], |_, _| Some(true));
        self.commit(&tree, settings)
    }

    /// Drop every reference to `package` from one project
    ///
    /// Works whether or not the project is still compatible with the package.
    pub fn remove_from_project(
        &mut self,
        project: &dyn ProjectHandle,
        package: &PackageId,
        settings: &mut dyn BuildSettings,
    ) -> Result<CommitReport> {
        let info = self.packages.resolve(package)?;
        let probe = probe::probe_project(project, &info, self.lister.as_ref(), &self.config, Filter::Any)?
            .ok_or_else(|| Error::NotFound(project.name().to_string()))?;

        info!("Removing {} from {}", package, project.name());
        let tree = self.open_session(info, vec![probe], |_, _| Some(false));
        self.commit(&tree, settings)
    }
}

/// Read one project's edited state off the tree
fn selection_of(tree: &SelectionTree, project: NodeId, context: &ProjectContext) -> ProjectSelection {
    let node = tree.node(project);
    let mut selection = ProjectSelection {
        project: context.name.clone(),
        configurations: context.configurations.clone(),
        libraries: Vec::new(),
        unconditional: false,
    };

    if node.is_leaf() {
        selection.unconditional = node.state().is_checked();
        return selection;
    }

    for leaf in tree.leaves(project) {
        let leaf_node = tree.node(leaf);
        let configuration = match leaf_node.kind() {
            NodeKind::Library { configuration } => Some(configuration.clone()),
            NodeKind::Assembly => None,
            _ => continue,
        };
        selection.libraries.push(LibraryArtifact {
            configuration,
            name: leaf_node.name().to_string(),
            selected: leaf_node.state().is_checked(),
        });
    }
    selection
}
