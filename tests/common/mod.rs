// tests/common/mod.rs

//! Shared test doubles for integration tests.
//!
//! Projects live in a temp directory so their manifests are real files;
//! packages and their library listings are in memory.

#![allow(dead_code)]

use pkgwire::{
    Architecture, BuildConfiguration, BuildMutation, BuildSettings, BuildSettingsMutationError,
    BuildTarget, DeveloperLibraryKind, FileLister, FrameworkTarget, LibraryArtifact,
    PackageDescriptor, PackageId, PackageInfo, PackageSource, ProjectHandle, ReferenceEntry,
    ReferenceManifest, Result, Solution,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const MANIFEST: &str = "coapp.packages.config";

/// A project with a fixed build target
pub struct MemoryProject {
    pub name: String,
    pub directory: PathBuf,
    pub supported: bool,
    pub target: Option<BuildTarget>,
}

impl MemoryProject {
    pub fn manifest_path(&self) -> PathBuf {
        self.directory.join(MANIFEST)
    }

    pub fn manifest(&self) -> ReferenceManifest {
        ReferenceManifest::load(self.manifest_path()).unwrap()
    }

    /// Seed the project's manifest with one entry
    pub fn seed(&self, entry: ReferenceEntry) {
        let mut manifest = self.manifest();
        manifest.add_or_replace_entry(entry).unwrap();
    }
}

impl ProjectHandle for MemoryProject {
    fn name(&self) -> &str {
        &self.name
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn is_supported(&self) -> bool {
        self.supported
    }

    fn build_target(&self) -> Result<BuildTarget> {
        self.target
            .clone()
            .ok_or_else(|| pkgwire::Error::ParseError(format!("{} has no build target", self.name)))
    }
}

/// A solution whose projects share one temp directory
pub struct MemorySolution {
    pub dir: TempDir,
    pub projects: Vec<MemoryProject>,
}

impl MemorySolution {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            projects: Vec::new(),
        }
    }

    fn add(&mut self, name: &str, supported: bool, target: Option<BuildTarget>) -> &MemoryProject {
        let directory = self.dir.path().join(name);
        std::fs::create_dir_all(&directory).unwrap();
        self.projects.push(MemoryProject {
            name: name.to_string(),
            directory,
            supported,
            target,
        });
        self.projects.last().unwrap()
    }

    pub fn native(&mut self, name: &str, configurations: &[&str]) -> &MemoryProject {
        let target = BuildTarget::native(configurations.iter().map(|c| BuildConfiguration::new(*c)));
        self.add(name, true, Some(target))
    }

    pub fn managed(&mut self, name: &str, framework: FrameworkTarget) -> &MemoryProject {
        self.add(name, true, Some(BuildTarget::managed(framework)))
    }

    pub fn unsupported(&mut self, name: &str) -> &MemoryProject {
        self.add(name, false, None)
    }

    pub fn project(&self, name: &str) -> &MemoryProject {
        self.projects.iter().find(|p| p.name == name).unwrap()
    }
}

impl Solution for MemorySolution {
    fn projects(&self) -> Vec<&dyn ProjectHandle> {
        self.projects.iter().map(|p| p as &dyn ProjectHandle).collect()
    }
}

/// Package source over a fixed set of packages
#[derive(Default)]
pub struct MemoryPackages {
    packages: Vec<PackageInfo>,
}

impl MemoryPackages {
    pub fn with(mut self, package: PackageInfo) -> Self {
        self.packages.push(package);
        self
    }
}

impl PackageSource for MemoryPackages {
    fn resolve(&self, id: &PackageId) -> Result<PackageInfo> {
        self.packages
            .iter()
            .find(|p| p.id() == id)
            .cloned()
            .ok_or_else(|| pkgwire::Error::NotFound(id.to_string()))
    }
}

/// File lister over an in-memory directory map
#[derive(Default)]
pub struct MemoryLister {
    files: HashMap<PathBuf, Vec<String>>,
}

impl MemoryLister {
    pub fn with(mut self, dir: &str, files: &[&str]) -> Self {
        self.files.insert(
            PathBuf::from(dir),
            files.iter().map(|f| f.to_string()).collect(),
        );
        self
    }
}

impl FileLister for MemoryLister {
    fn list(&self, dir: &Path, pattern: &str) -> Result<Vec<String>> {
        let pattern = glob::Pattern::new(pattern).unwrap();
        let mut names: Vec<String> = self
            .files
            .get(dir)
            .map(|files| files.iter().filter(|f| pattern.matches(f)).cloned().collect())
            .unwrap_or_default();
        names.sort();
        Ok(names)
    }
}

/// Build settings that record mutations and can fail for chosen projects
#[derive(Default)]
pub struct RecordingSettings {
    pub applied: Vec<BuildMutation>,
    failing: HashSet<String>,
}

impl RecordingSettings {
    pub fn failing_for(project: &str) -> Self {
        Self {
            applied: Vec::new(),
            failing: HashSet::from([project.to_string()]),
        }
    }

    pub fn for_project(&self, project: &str) -> Vec<&BuildMutation> {
        self.applied.iter().filter(|m| m.project() == project).collect()
    }
}

impl BuildSettings for RecordingSettings {
    fn apply(&mut self, mutation: &BuildMutation) -> std::result::Result<(), BuildSettingsMutationError> {
        if self.failing.contains(mutation.project()) {
            return Err(BuildSettingsMutationError::new(
                mutation.project(),
                "simulated I/O error",
            ));
        }
        self.applied.push(mutation.clone());
        Ok(())
    }
}

pub fn zlib_id(version: &str) -> PackageId {
    PackageId::new("zlib", "", version, Architecture::X64)
}

/// Native x64 library package with `foo.lib` under `/pkgs/zlib-<version>/lib`
pub fn zlib(version: &str) -> PackageInfo {
    PackageInfo::new(PackageDescriptor::new(
        zlib_id(version),
        DeveloperLibraryKind::NativeLibrary,
    ))
    .with_include_dir(format!("/pkgs/zlib-{}/include", version))
    .with_native_library_dir(format!("/pkgs/zlib-{}/lib", version))
}

pub fn zlib_lister(version: &str) -> MemoryLister {
    MemoryLister::default().with(&format!("/pkgs/zlib-{}/lib", version), &["foo.lib", "foo.pdb"])
}

pub fn json_id() -> PackageId {
    PackageId::new("json", "[net40]", "4.5", Architecture::Any)
}

/// Managed package requiring .NET 4.0
pub fn json() -> PackageInfo {
    PackageInfo::new(PackageDescriptor::new(
        json_id(),
        DeveloperLibraryKind::ManagedAssembly,
    ))
    .with_managed_assembly_dir("/pkgs/json/ReferenceAssemblies")
}

pub fn boost_id() -> PackageId {
    PackageId::new("boost", "", "1.50", Architecture::Any)
}

/// Header-only package
pub fn boost() -> PackageInfo {
    PackageInfo::new(PackageDescriptor::new(
        boost_id(),
        DeveloperLibraryKind::NativeInclude,
    ))
    .with_include_dir("/pkgs/boost/include")
}

pub fn release_lib(name: &str) -> LibraryArtifact {
    LibraryArtifact::native(name, "Release|x64")
}
