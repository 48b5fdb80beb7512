// src/manifest/mod.rs

//! Per-project reference manifest
//!
//! The manifest is the source of truth for which package libraries are wired
//! into a project. It lives at a fixed file name next to the project file
//! (see [`crate::config::DEFAULT_MANIFEST_FILE_NAME`]) and holds at most one
//! entry per package variant (name, flavor, architecture).
//!
//! Every mutation rewrites the whole document, sorted by package name. When
//! the last entry goes away the file is deleted rather than left empty.

mod xml;

use crate::error::{Error, Result};
use crate::package::{Architecture, LibraryArtifact, PackageId};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A persisted package reference for one project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceEntry {
    pub package: PackageId,
    /// Selected libraries, canonical order
    pub libraries: Vec<LibraryArtifact>,
}

impl ReferenceEntry {
    /// Create an entry, keeping only selected libraries in canonical order
    pub fn new(package: PackageId, libraries: Vec<LibraryArtifact>) -> Self {
        let mut entry = Self { package, libraries };
        entry.canonicalize();
        entry
    }

    fn canonicalize(&mut self) {
        self.libraries.retain(|l| l.selected);
        self.libraries.sort();
        self.libraries.dedup();
    }

    /// Whether a library (by configuration and file name) is selected
    pub fn has_library(&self, configuration: Option<&str>, name: &str) -> bool {
        self.libraries.iter().any(|l| l.key() == (configuration, name))
    }
}

/// Lookup criteria for [`ReferenceManifest::find_entry`]
///
/// The name always has to match; every other field is compared only when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    pub name: String,
    pub flavor: Option<String>,
    pub version: Option<String>,
    pub architecture: Option<Architecture>,
}

impl EntryQuery {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_flavor(mut self, flavor: &str) -> Self {
        self.flavor = Some(crate::flavor::Flavor::normalize(flavor));
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_architecture(mut self, architecture: Architecture) -> Self {
        self.architecture = Some(architecture);
        self
    }

    /// Query for a package variant, with or without its exact version
    pub fn for_package(id: &PackageId, exact_version_match: bool) -> Self {
        Self {
            name: id.name.clone(),
            flavor: Some(id.flavor.clone()),
            version: exact_version_match.then(|| id.version.clone()),
            architecture: Some(id.architecture),
        }
    }

    pub fn matches(&self, id: &PackageId) -> bool {
        id.name == self.name
            && self.flavor.as_ref().is_none_or(|f| *f == id.flavor)
            && self.version.as_ref().is_none_or(|v| *v == id.version)
            && self.architecture.is_none_or(|a| a == id.architecture)
    }
}

/// Reference manifest bound to its backing file
#[derive(Debug, Clone)]
pub struct ReferenceManifest {
    path: PathBuf,
    entries: Vec<ReferenceEntry>,
}

impl ReferenceManifest {
    /// An empty manifest that will be written to `path`
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: Vec::new(),
        }
    }

    /// Load a manifest
    ///
    /// A missing file is an empty manifest. A file that is not a well-formed
    /// document is [`Error::ManifestCorrupt`]; individual malformed entries
    /// are skipped.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No manifest at {}, starting empty", path.display());
                return Ok(Self::empty(path));
            }
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read manifest {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        let mut manifest = Self::parse(&text, path)?;
        manifest.sort();
        debug!(
            "Loaded {} manifest entries from {}",
            manifest.entries.len(),
            path.display()
        );
        Ok(manifest)
    }

    /// Parse manifest text as if it were read from `path`
    pub fn parse(text: &str, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            path: path.to_path_buf(),
            entries: xml::parse(text, path)?,
        })
    }

    /// Render the manifest document
    pub fn to_xml(&self) -> Result<String> {
        xml::render(&self.entries)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry matching a query
    pub fn find_entry(&self, query: &EntryQuery) -> Option<&ReferenceEntry> {
        self.entries.iter().find(|e| query.matches(&e.package))
    }

    /// Find the entry for a package variant
    pub fn find_entry_for(&self, id: &PackageId, exact_version_match: bool) -> Option<&ReferenceEntry> {
        self.find_entry(&EntryQuery::for_package(id, exact_version_match))
    }

    /// Insert an entry, replacing any entry for the same variant regardless
    /// of version, and rewrite the file
    pub fn add_or_replace_entry(&mut self, entry: ReferenceEntry) -> Result<()> {
        self.entries.retain(|e| !e.package.same_variant(&entry.package));
        debug!("Recording {} in {}", entry.package, self.path.display());
        self.entries.push(entry);
        self.save()
    }

    /// Remove the entry for a package variant
    ///
    /// Returns `false` (and touches nothing) if no entry matched.
    pub fn delete_entry(&mut self, id: &PackageId) -> Result<bool> {
        let before = self.entries.len();
        self.entries.retain(|e| !e.package.same_variant(id));
        if self.entries.len() == before {
            return Ok(false);
        }

        debug!("Removed {} from {}", id, self.path.display());
        self.save()?;
        Ok(true)
    }

    fn sort(&mut self) {
        self.entries.sort_by(|a, b| {
            (&a.package.name, &a.package.flavor, a.package.architecture, &a.package.version).cmp(&(
                &b.package.name,
                &b.package.flavor,
                b.package.architecture,
                &b.package.version,
            ))
        });
    }

    /// Write the manifest, or delete the file if no entries remain
    pub fn save(&mut self) -> Result<()> {
        self.sort();

        if self.entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => {
                    debug!("Deleted empty manifest {}", self.path.display());
                    Ok(())
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(Error::IoError(format!(
                    "Failed to delete manifest {}: {}",
                    self.path.display(),
                    e
                ))),
            };
        }

        let text = self.to_xml()?;
        write_atomic(&self.path, text.as_bytes())
    }
}

/// Write via a temp file in the same directory, then rename over the target
fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let io_err = |p: &Path, e: io::Error| Error::IoError(format!("{}: {}", p.display(), e));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }

    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut file = fs::File::create(&temp_path).map_err(|e| io_err(&temp_path, e))?;
    file.write_all(content).map_err(|e| io_err(&temp_path, e))?;
    file.sync_all().map_err(|e| io_err(&temp_path, e))?;
    drop(file);

    fs::rename(&temp_path, path).map_err(|e| io_err(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zlib(version: &str) -> PackageId {
        PackageId::new("zlib", "", version, Architecture::X64)
    }

    #[test]
    fn test_entry_drops_unselected_libraries() {
        let mut unselected = LibraryArtifact::native("b.lib", "Release|x64");
        unselected.selected = false;
        let entry = ReferenceEntry::new(
            zlib("1.2"),
            vec![LibraryArtifact::native("a.lib", "Release|x64"), unselected],
        );
        assert_eq!(entry.libraries.len(), 1);
        assert!(entry.has_library(Some("Release|x64"), "a.lib"));
        assert!(!entry.has_library(None, "a.lib"));
    }

    #[test]
    fn test_query_optional_fields() {
        let id = PackageId::new("zlib", "vc11", "1.2", Architecture::X64);

        assert!(EntryQuery::name("zlib").matches(&id));
        assert!(EntryQuery::name("zlib").with_flavor("[vc11]").matches(&id));
        assert!(!EntryQuery::name("zlib").with_flavor("vc10").matches(&id));
        assert!(!EntryQuery::name("zlib").with_version("1.3").matches(&id));
        assert!(!EntryQuery::name("zlib").with_architecture(Architecture::X86).matches(&id));
        assert!(!EntryQuery::name("libpng").matches(&id));
    }

    #[test]
    fn test_query_for_package_exact_version() {
        let stored = zlib("1.2");
        assert!(EntryQuery::for_package(&zlib("1.3"), false).matches(&stored));
        assert!(!EntryQuery::for_package(&zlib("1.3"), true).matches(&stored));
    }

    #[test]
    fn test_add_or_replace_ignores_version() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = ReferenceManifest::empty(dir.path().join("refs.config"));

        manifest
            .add_or_replace_entry(ReferenceEntry::new(zlib("1.2"), Vec::new()))
            .unwrap();
        manifest
            .add_or_replace_entry(ReferenceEntry::new(zlib("1.3"), Vec::new()))
            .unwrap();

        assert_eq!(manifest.entries().len(), 1);
        assert_eq!(manifest.entries()[0].package.version, "1.3");
    }

    #[test]
    fn test_entries_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut manifest = ReferenceManifest::empty(dir.path().join("refs.config"));
        for name in ["zlib", "boost", "libpng"] {
            manifest
                .add_or_replace_entry(ReferenceEntry::new(
                    PackageId::new(name, "", "1.0", Architecture::X86),
                    Vec::new(),
                ))
                .unwrap();
        }

        let names: Vec<&str> = manifest
            .entries()
            .iter()
            .map(|e| e.package.name.as_str())
            .collect();
        assert_eq!(names, vec!["boost", "libpng", "zlib"]);
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = ReferenceManifest::load(dir.path().join("absent.config")).unwrap();
        assert!(manifest.is_empty());
    }

    #[test]
    fn test_delete_last_entry_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refs.config");
        let mut manifest = ReferenceManifest::empty(&path);
        manifest
            .add_or_replace_entry(ReferenceEntry::new(zlib("1.2"), Vec::new()))
            .unwrap();
        assert!(path.exists());

        assert!(manifest.delete_entry(&zlib("1.2")).unwrap());
        assert!(!path.exists());
        assert!(!manifest.delete_entry(&zlib("1.2")).unwrap());
    }
}
