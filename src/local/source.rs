// src/local/source.rs

//! Package source over installed package directories
//!
//! An index file lists the installed packages:
//!
//! ```toml
//! [[package]]
//! name = "zlib"
//! flavor = "[vc10]"
//! version = "1.2.5"
//! architecture = "x64"
//! kind = "native-library"
//! path = "zlib-1.2.5-x64"
//! ```
//!
//! `path` is relative to the index file. Inside it, headers live in
//! `include/`, native libraries in `lib/` and reference assemblies in
//! `ReferenceAssemblies/`.

use crate::error::{Error, Result};
use crate::host::PackageSource;
use crate::package::{Architecture, DeveloperLibraryKind, PackageDescriptor, PackageId, PackageInfo};
use crate::version::PackageVersion;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INCLUDE_DIR: &str = "include";
pub const LIBRARY_DIR: &str = "lib";
pub const ASSEMBLY_DIR: &str = "ReferenceAssemblies";

/// One installed package in the index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexEntry {
    pub name: String,
    #[serde(default)]
    pub flavor: String,
    pub version: String,
    pub architecture: String,
    pub kind: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct IndexFile {
    #[serde(default, rename = "package")]
    packages: Vec<IndexEntry>,
}

#[derive(Debug, Clone)]
struct Installed {
    descriptor: PackageDescriptor,
    version: PackageVersion,
    root: PathBuf,
}

/// [`PackageSource`] backed by a TOML package index
#[derive(Debug, Clone, Default)]
pub struct LocalPackageSource {
    packages: Vec<Installed>,
}

impl LocalPackageSource {
    pub fn load(index: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(index).map_err(|e| {
            Error::IoError(format!("Failed to read package index {}: {}", index.display(), e))
        })?;
        Self::parse(&text, index.parent().unwrap_or(Path::new(".")))
    }

    pub fn parse(text: &str, root: &Path) -> Result<Self> {
        let file: IndexFile = toml::from_str(text).map_err(|e| Error::ParseError(e.to_string()))?;

        let packages = file
            .packages
            .into_iter()
            .map(|entry| -> Result<Installed> {
                let architecture: Architecture = entry.architecture.parse()?;
                let kind: DeveloperLibraryKind = entry.kind.parse()?;
                Ok(Installed {
                    version: PackageVersion::parse(&entry.version)?,
                    descriptor: PackageDescriptor::new(
                        PackageId::new(entry.name, &entry.flavor, entry.version, architecture),
                        kind,
                    ),
                    root: root.join(entry.path),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Package index lists {} packages", packages.len());
        Ok(Self { packages })
    }

    /// Identities of every indexed package
    pub fn package_ids(&self) -> impl Iterator<Item = &PackageId> {
        self.packages.iter().map(|p| &p.descriptor.id)
    }
}

impl PackageSource for LocalPackageSource {
    fn resolve(&self, id: &PackageId) -> Result<PackageInfo> {
        let wanted = PackageVersion::parse(&id.version)?;
        let installed = self
            .packages
            .iter()
            .find(|p| p.descriptor.id.same_variant(id) && p.version == wanted)
            .ok_or_else(|| Error::NotFound(format!("package {}", id)))?;

        let mut info = PackageInfo::new(installed.descriptor.clone());
        match installed.descriptor.kind {
            DeveloperLibraryKind::NativeInclude => {
                info = info.with_include_dir(installed.root.join(INCLUDE_DIR));
            }
            DeveloperLibraryKind::NativeLibrary => {
                info = info
                    .with_include_dir(installed.root.join(INCLUDE_DIR))
                    .with_native_library_dir(installed.root.join(LIBRARY_DIR));
            }
            DeveloperLibraryKind::ManagedAssembly => {
                info = info.with_managed_assembly_dir(installed.root.join(ASSEMBLY_DIR));
            }
            DeveloperLibraryKind::None => {}
        }
        Ok(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = r#"
[[package]]
name = "zlib"
flavor = "vc10"
version = "1.2.5"
architecture = "x64"
kind = "native-library"
path = "zlib-1.2.5-x64"

[[package]]
name = "json"
flavor = "[net40]"
version = "4.5"
architecture = "any"
kind = "managed-assembly"
path = "json"
"#;

    #[test]
    fn test_resolve_native_library() {
        let source = LocalPackageSource::parse(INDEX, Path::new("/pkgs")).unwrap();
        let id = PackageId::new("zlib", "[vc10]", "1.2.5.0", Architecture::X64);
        let info = source.resolve(&id).unwrap();

        assert_eq!(info.kind(), DeveloperLibraryKind::NativeLibrary);
        assert_eq!(
            info.native_library_dir.as_deref(),
            Some(Path::new("/pkgs/zlib-1.2.5-x64/lib"))
        );
        assert_eq!(
            info.include_dir.as_deref(),
            Some(Path::new("/pkgs/zlib-1.2.5-x64/include"))
        );
        assert!(info.managed_assembly_dir.is_none());
    }

    #[test]
    fn test_resolve_managed() {
        let source = LocalPackageSource::parse(INDEX, Path::new("/pkgs")).unwrap();
        let id = PackageId::new("json", "net40", "4.5", Architecture::Any);
        let info = source.resolve(&id).unwrap();
        assert_eq!(
            info.managed_assembly_dir.as_deref(),
            Some(Path::new("/pkgs/json/ReferenceAssemblies"))
        );
    }

    #[test]
    fn test_resolve_unknown_variant() {
        let source = LocalPackageSource::parse(INDEX, Path::new("/pkgs")).unwrap();
        let id = PackageId::new("zlib", "vc10", "1.2.5", Architecture::X86);
        assert!(matches!(source.resolve(&id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_bad_index_entry() {
        let text = r#"
[[package]]
name = "zlib"
version = "1.2"
architecture = "arm"
kind = "lib"
path = "zlib"
"#;
        assert!(LocalPackageSource::parse(text, Path::new(".")).is_err());
    }
}
