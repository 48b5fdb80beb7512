// src/local/solution.rs

//! Solution described by a TOML file
//!
//! ```toml
//! name = "demo"
//!
//! [[project]]
//! name = "app"
//! directory = "app"
//! kind = "native"
//! configurations = ["Debug|Win32", "Release|x64"]
//!
//! [project.target_machines]
//! "Release|x64" = "MachineX64"
//!
//! [[project]]
//! name = "web"
//! directory = "web"
//! kind = "managed"
//! framework = ".NETFramework,Version=v4.0"
//! ```
//!
//! Project directories are relative to the solution file.

use crate::compat::{BuildConfiguration, BuildTarget, FrameworkTarget};
use crate::error::{Error, Result};
use crate::host::{ProjectHandle, Solution};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    Native,
    Managed,
    /// A project type the host cannot edit
    Unsupported,
}

/// On-disk form of one project
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectFile {
    pub name: String,
    pub directory: PathBuf,
    pub kind: ProjectKind,

    /// Native configurations as `Name|Platform`, in declared order
    #[serde(default)]
    pub configurations: Vec<String>,

    /// Linker target machine per configuration, when set explicitly
    #[serde(default)]
    pub target_machines: BTreeMap<String, String>,

    /// Framework moniker of a managed project
    #[serde(default)]
    pub framework: Option<String>,
}

/// On-disk form of a solution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SolutionFile {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, rename = "project")]
    pub projects: Vec<ProjectFile>,
}

/// A project from a [`LocalSolution`]
#[derive(Debug, Clone)]
pub struct LocalProject {
    file: ProjectFile,
    directory: PathBuf,
}

impl LocalProject {
    pub fn kind(&self) -> ProjectKind {
        self.file.kind
    }
}

impl ProjectHandle for LocalProject {
    fn name(&self) -> &str {
        &self.file.name
    }

    fn directory(&self) -> &Path {
        &self.directory
    }

    fn is_supported(&self) -> bool {
        self.file.kind != ProjectKind::Unsupported
    }

    fn build_target(&self) -> Result<BuildTarget> {
        match self.file.kind {
            ProjectKind::Native => Ok(BuildTarget::native(self.file.configurations.iter().map(
                |name| {
                    let configuration = BuildConfiguration::new(name.as_str());
                    match self.file.target_machines.get(name) {
                        Some(machine) => configuration.with_target_machine(machine.as_str()),
                        None => configuration,
                    }
                },
            ))),
            ProjectKind::Managed => {
                let moniker = self.file.framework.as_deref().ok_or_else(|| {
                    Error::ParseError(format!(
                        "Managed project '{}' has no framework",
                        self.file.name
                    ))
                })?;
                Ok(BuildTarget::managed(moniker.parse::<FrameworkTarget>()?))
            }
            ProjectKind::Unsupported => Err(Error::ParseError(format!(
                "Project '{}' has no readable build target",
                self.file.name
            ))),
        }
    }
}

/// A solution loaded from TOML
#[derive(Debug, Clone)]
pub struct LocalSolution {
    name: String,
    projects: Vec<LocalProject>,
}

impl LocalSolution {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::IoError(format!("Failed to read solution {}: {}", path.display(), e))
        })?;
        let root = path.parent().unwrap_or(Path::new("."));
        let solution = Self::parse(&text, root)?;
        debug!(
            "Loaded solution {} with {} projects",
            solution.name,
            solution.projects.len()
        );
        Ok(solution)
    }

    /// Parse solution text; relative project directories resolve against `root`
    pub fn parse(text: &str, root: &Path) -> Result<Self> {
        let file: SolutionFile = toml::from_str(text).map_err(|e| Error::ParseError(e.to_string()))?;

        let mut seen = HashSet::new();
        for project in &file.projects {
            if !seen.insert(project.name.as_str()) {
                return Err(Error::ParseError(format!(
                    "Duplicate project name '{}'",
                    project.name
                )));
            }
        }

        let projects = file
            .projects
            .into_iter()
            .map(|project| LocalProject {
                directory: root.join(&project.directory),
                file: project,
            })
            .collect();

        Ok(Self {
            name: file.name.unwrap_or_else(|| "solution".to_string()),
            projects,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project(&self, name: &str) -> Option<&LocalProject> {
        self.projects.iter().find(|p| p.file.name == name)
    }
}

impl Solution for LocalSolution {
    fn projects(&self) -> Vec<&dyn ProjectHandle> {
        self.projects.iter().map(|p| p as &dyn ProjectHandle).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flavor::FrameworkFamily;

    const SAMPLE: &str = r#"
name = "demo"

[[project]]
name = "app"
directory = "app"
kind = "native"
configurations = ["Debug|Win32", "Release|x64"]

[project.target_machines]
"Release|x64" = "MachineX64"

[[project]]
name = "web"
directory = "web"
kind = "managed"
framework = ".NETFramework,Version=v4.0"

[[project]]
name = "setup"
directory = "setup"
kind = "unsupported"
"#;

    #[test]
    fn test_parse_solution() {
        let solution = LocalSolution::parse(SAMPLE, Path::new("/src")).unwrap();
        assert_eq!(solution.name(), "demo");
        assert_eq!(solution.projects().len(), 3);

        let app = solution.project("app").unwrap();
        assert_eq!(app.directory(), Path::new("/src/app"));
        let target = app.build_target().unwrap();
        assert_eq!(target.configurations().len(), 2);
        assert_eq!(
            target.configurations()[1].target_machine.as_deref(),
            Some("MachineX64")
        );
    }

    #[test]
    fn test_managed_target() {
        let solution = LocalSolution::parse(SAMPLE, Path::new("/src")).unwrap();
        match solution.project("web").unwrap().build_target().unwrap() {
            BuildTarget::Managed { framework } => {
                assert_eq!(framework.family, FrameworkFamily::NetFramework);
                assert_eq!(framework.version, semver::Version::new(4, 0, 0));
            }
            other => panic!("expected managed target, got {:?}", other),
        }
    }

    #[test]
    fn test_unsupported_project() {
        let solution = LocalSolution::parse(SAMPLE, Path::new("/src")).unwrap();
        let setup = solution.project("setup").unwrap();
        assert!(!setup.is_supported());
        assert!(setup.build_target().is_err());
    }

    #[test]
    fn test_duplicate_project_names_rejected() {
        let text = r#"
[[project]]
name = "app"
directory = "a"
kind = "native"

[[project]]
name = "app"
directory = "b"
kind = "native"
"#;
        assert!(LocalSolution::parse(text, Path::new(".")).is_err());
    }

    #[test]
    fn test_managed_without_framework() {
        let text = r#"
[[project]]
name = "lib"
directory = "lib"
kind = "managed"
"#;
        let solution = LocalSolution::parse(text, Path::new(".")).unwrap();
        assert!(solution.project("lib").unwrap().build_target().is_err());
    }
}
