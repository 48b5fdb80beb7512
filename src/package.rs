// src/package.rs

//! Package identity and library artifacts

use crate::error::{Error, Result};
use crate::flavor::Flavor;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Architecture a package was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Architecture {
    X86,
    X64,
    Any,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::X86 => "x86",
            Self::X64 => "x64",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Architecture {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "x86" => Ok(Self::X86),
            "x64" => Ok(Self::X64),
            "any" => Ok(Self::Any),
            other => Err(Error::ParseError(format!("Unknown architecture '{}'", other))),
        }
    }
}

/// What kind of developer library a package contributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeveloperLibraryKind {
    #[default]
    None,
    /// Header-only native package
    NativeInclude,
    /// Native package with import/static libraries
    NativeLibrary,
    /// .NET reference assemblies
    ManagedAssembly,
}

impl DeveloperLibraryKind {
    pub fn is_native(&self) -> bool {
        matches!(self, Self::NativeInclude | Self::NativeLibrary)
    }
}

impl fmt::Display for DeveloperLibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::NativeInclude => write!(f, "native-include"),
            Self::NativeLibrary => write!(f, "native-library"),
            Self::ManagedAssembly => write!(f, "managed-assembly"),
        }
    }
}

impl FromStr for DeveloperLibraryKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(Self::None),
            "native-include" | "include" => Ok(Self::NativeInclude),
            "native-library" | "lib" => Ok(Self::NativeLibrary),
            "managed-assembly" | "assembly" => Ok(Self::ManagedAssembly),
            other => Err(Error::ParseError(format!(
                "Unknown developer library kind '{}'",
                other
            ))),
        }
    }
}

/// Canonical name of a package variant: name, flavor, version, architecture
///
/// The flavor is stored in its canonical spelling (see [`Flavor::normalize`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageId {
    pub name: String,
    pub flavor: String,
    pub version: String,
    pub architecture: Architecture,
}

impl PackageId {
    pub fn new(
        name: impl Into<String>,
        flavor: &str,
        version: impl Into<String>,
        architecture: Architecture,
    ) -> Self {
        Self {
            name: name.into(),
            flavor: Flavor::normalize(flavor),
            version: version.into(),
            architecture,
        }
    }

    /// Same package variant ignoring version
    pub fn same_variant(&self, other: &PackageId) -> bool {
        self.name == other.name
            && self.flavor == other.flavor
            && self.architecture == other.architecture
    }

    /// Parsed flavor; unparsable flavors read as empty
    pub fn parsed_flavor(&self) -> Flavor {
        Flavor::parse(&self.flavor).unwrap_or_default()
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}-{}-{}",
            self.name, self.flavor, self.version, self.architecture
        )
    }
}

/// Immutable description of a fetched package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDescriptor {
    pub id: PackageId,
    pub kind: DeveloperLibraryKind,
}

impl PackageDescriptor {
    pub fn new(id: PackageId, kind: DeveloperLibraryKind) -> Self {
        Self { id, kind }
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn architecture(&self) -> Architecture {
        self.id.architecture
    }
}

/// A descriptor plus the on-disk locations of its developer artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageInfo {
    pub descriptor: PackageDescriptor,
    pub include_dir: Option<PathBuf>,
    pub native_library_dir: Option<PathBuf>,
    pub managed_assembly_dir: Option<PathBuf>,
}

impl PackageInfo {
    pub fn new(descriptor: PackageDescriptor) -> Self {
        Self {
            descriptor,
            include_dir: None,
            native_library_dir: None,
            managed_assembly_dir: None,
        }
    }

    pub fn with_include_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_dir = Some(dir.into());
        self
    }

    pub fn with_native_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.native_library_dir = Some(dir.into());
        self
    }

    pub fn with_managed_assembly_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.managed_assembly_dir = Some(dir.into());
        self
    }

    pub fn id(&self) -> &PackageId {
        &self.descriptor.id
    }

    pub fn kind(&self) -> DeveloperLibraryKind {
        self.descriptor.kind
    }
}

/// One physical file contributed by a package
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LibraryArtifact {
    /// Configuration the artifact applies to; `None` for managed assemblies
    pub configuration: Option<String>,
    /// File name, e.g. `foo.lib` or `Foo.dll`
    pub name: String,
    pub selected: bool,
}

impl LibraryArtifact {
    pub fn native(name: impl Into<String>, configuration: impl Into<String>) -> Self {
        Self {
            configuration: Some(configuration.into()),
            name: name.into(),
            selected: true,
        }
    }

    pub fn managed(name: impl Into<String>) -> Self {
        Self {
            configuration: None,
            name: name.into(),
            selected: true,
        }
    }

    /// Identity ignoring selection
    pub fn key(&self) -> (Option<&str>, &str) {
        (self.configuration.as_deref(), self.name.as_str())
    }
}

/// Physical linker dependency name for a library at a package version
///
/// `foo.lib` at version `1.2` links as `foo-1.2.lib`.
pub fn versioned_library_name(file_name: &str, version: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, version, ext),
        _ => format!("{}-{}", file_name, version),
    }
}
