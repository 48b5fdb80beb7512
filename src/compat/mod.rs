// src/compat/mod.rs

//! Project/package compatibility rules
//!
//! A package is compatible with a project if either branch holds:
//!
//! - **Native**: the project is a VC-style native project, the package
//!   contributes native includes or libraries, and (for libraries) at least
//!   one of the project's build configurations targets the package's
//!   architecture.
//! - **Managed**: the project is a managed project, the package contributes
//!   reference assemblies, and the project's target framework satisfies the
//!   minimum implied by the package flavor.

use crate::error::{Error, Result};
use crate::flavor::FrameworkFamily;
use crate::package::{Architecture, DeveloperLibraryKind, PackageDescriptor};
use crate::version::parse_framework_version;
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// One declared build configuration of a native project, e.g. `Release|x64`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfiguration {
    pub name: String,
    /// Explicit linker target machine (`MachineX64`, `17`, ...), if set
    pub target_machine: Option<String>,
}

impl BuildConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target_machine: None,
        }
    }

    pub fn with_target_machine(mut self, machine: impl Into<String>) -> Self {
        self.target_machine = Some(machine.into());
        self
    }

    /// Platform token after the `|`, e.g. `x64` in `Release|x64`
    pub fn platform(&self) -> &str {
        self.name
            .split_once('|')
            .map(|(_, platform)| platform)
            .unwrap_or("")
    }

    /// Architecture implied by the platform token
    pub fn platform_architecture(&self) -> Option<Architecture> {
        match self.platform().trim().to_ascii_lowercase().as_str() {
            "win32" | "x86" => Some(Architecture::X86),
            "win64" | "x64" => Some(Architecture::X64),
            _ => None,
        }
    }

    /// Architecture implied by the explicit target machine setting
    pub fn machine_architecture(&self) -> Option<Architecture> {
        let machine = self.target_machine.as_deref()?.trim().to_ascii_lowercase();
        match machine.as_str() {
            "machinex86" | "x86" | "1" => Some(Architecture::X86),
            "machinex64" | "x64" | "17" => Some(Architecture::X64),
            _ => None,
        }
    }

    /// Whether this configuration builds for `architecture`
    pub fn targets(&self, architecture: Architecture) -> bool {
        architecture == Architecture::Any
            || self.platform_architecture() == Some(architecture)
            || self.machine_architecture() == Some(architecture)
    }
}

/// A managed project's target framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkTarget {
    pub family: FrameworkFamily,
    pub version: Version,
}

impl FrameworkTarget {
    pub fn new(family: FrameworkFamily, version: Version) -> Self {
        Self { family, version }
    }

    pub fn net(major: u64, minor: u64) -> Self {
        Self::new(FrameworkFamily::NetFramework, Version::new(major, minor, 0))
    }

    pub fn silverlight(major: u64) -> Self {
        Self::new(FrameworkFamily::Silverlight, Version::new(major, 0, 0))
    }
}

impl FromStr for FrameworkTarget {
    type Err = Error;

    /// Accepts a target framework moniker (`.NETFramework,Version=v4.0`,
    /// `Silverlight,Version=v5.0,Profile=WindowsPhone`) or a bare version
    /// (`v4.0`), which reads as .NET Framework.
    fn from_str(s: &str) -> Result<Self> {
        let mut family = FrameworkFamily::NetFramework;
        let mut version = None;

        for (index, part) in s.split(',').map(str::trim).enumerate() {
            if let Some(v) = part.strip_prefix("Version=") {
                version = Some(parse_framework_version(v)?);
            } else if index == 0 {
                if part.starts_with(['v', 'V']) || part.starts_with(|c: char| c.is_ascii_digit()) {
                    version = Some(parse_framework_version(part)?);
                } else if part.eq_ignore_ascii_case("silverlight") {
                    family = FrameworkFamily::Silverlight;
                } else if !part.eq_ignore_ascii_case(".netframework") {
                    return Err(Error::ParseError(format!(
                        "Unknown framework family '{}'",
                        part
                    )));
                }
            }
        }

        let version = version
            .ok_or_else(|| Error::ParseError(format!("No framework version in '{}'", s)))?;
        Ok(Self { family, version })
    }
}

impl fmt::Display for FrameworkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},Version=v{}.{}",
            self.family, self.version.major, self.version.minor
        )
    }
}

/// What a project builds, as far as compatibility cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    /// VC-style project; configurations in declared order
    Native {
        configurations: Vec<BuildConfiguration>,
    },
    /// Managed project targeting a framework
    Managed { framework: FrameworkTarget },
}

impl BuildTarget {
    pub fn native(configurations: impl IntoIterator<Item = BuildConfiguration>) -> Self {
        Self::Native {
            configurations: configurations.into_iter().collect(),
        }
    }

    pub fn managed(framework: FrameworkTarget) -> Self {
        Self::Managed { framework }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native { .. })
    }

    pub fn configurations(&self) -> &[BuildConfiguration] {
        match self {
            Self::Native { configurations } => configurations,
            Self::Managed { .. } => &[],
        }
    }
}

/// Decide whether `package` can be referenced by a project building `target`
pub fn is_compatible(target: &BuildTarget, package: &PackageDescriptor) -> bool {
    match target {
        BuildTarget::Native { configurations } => match package.kind {
            DeveloperLibraryKind::NativeInclude => true,
            DeveloperLibraryKind::NativeLibrary => configurations
                .iter()
                .any(|c| c.targets(package.architecture())),
            _ => false,
        },
        BuildTarget::Managed { framework } => {
            package.kind == DeveloperLibraryKind::ManagedAssembly
                && package
                    .id
                    .parsed_flavor()
                    .framework_requirement()
                    .satisfied_by(framework.family, &framework.version)
        }
    }
}

/// Configuration names of a native target that build for `architecture`
///
/// Order follows the target's declared configuration order. Managed targets
/// and targets without a matching configuration yield an empty list.
pub fn compatible_configurations(target: &BuildTarget, architecture: Architecture) -> Vec<String> {
    target
        .configurations()
        .iter()
        .filter(|c| c.targets(architecture))
        .map(|c| c.name.clone())
        .collect()
}
