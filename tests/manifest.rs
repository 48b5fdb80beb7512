// tests/manifest.rs

//! Integration tests for reference manifest files.
//!
//! These tests verify that:
//! 1. Entries survive a write and reload
//! 2. Deleting is idempotent and the last delete removes the file
//! 3. A corrupt file is fatal while a malformed entry is only skipped

use pkgwire::{
    Architecture, EntryQuery, Error, LibraryArtifact, PackageId, ReferenceEntry, ReferenceManifest,
};
use std::fs;
use tempfile::TempDir;

fn manifest_in(dir: &TempDir) -> ReferenceManifest {
    ReferenceManifest::load(dir.path().join("coapp.packages.config")).unwrap()
}

fn zlib() -> PackageId {
    PackageId::new("zlib", "[vc10]", "1.2.5", Architecture::X64)
}

fn json() -> PackageId {
    PackageId::new("json", "net40", "4.5", Architecture::Any)
}

#[test]
fn test_entries_survive_reload() {
    let dir = tempfile::tempdir().unwrap();
    let mut manifest = manifest_in(&dir);
    assert!(manifest.is_empty());

    manifest
        .add_or_replace_entry(ReferenceEntry::new(
            zlib(),
            vec![
                LibraryArtifact::native("zlib.lib", "Release|x64"),
                LibraryArtifact::native("zlib.lib", "Debug|x64"),
                LibraryArtifact::native("minizip.lib", "Release|x64"),
            ],
        ))
        .unwrap();
    manifest
        .add_or_replace_entry(ReferenceEntry::new(
            json(),
            vec![LibraryArtifact::managed("Json.dll")],
        ))
        .unwrap();

    let reloaded = manifest_in(&dir);
    assert_eq!(reloaded.entries(), manifest.entries());

    let entry = reloaded.find_entry_for(&zlib(), true).unwrap();
    assert_eq!(entry.libraries.len(), 3);
    assert!(entry.has_library(Some("Debug|x64"), "zlib.lib"));
    assert!(reloaded
        .find_entry(&EntryQuery::name("json").with_flavor("[net40]"))
        .is_some());
}

#[test]
fn test_delete_is_idempotent_and_removes_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coapp.packages.config");
    let mut manifest = manifest_in(&dir);
    manifest
        .add_or_replace_entry(ReferenceEntry::new(zlib(), Vec::new()))
        .unwrap();
    manifest
        .add_or_replace_entry(ReferenceEntry::new(json(), Vec::new()))
        .unwrap();

    assert!(manifest.delete_entry(&json()).unwrap());
    assert!(!manifest.delete_entry(&json()).unwrap());
    assert!(path.exists());

    assert!(manifest.delete_entry(&zlib()).unwrap());
    assert!(!path.exists());
    assert!(manifest_in(&dir).is_empty());
}

#[test]
fn test_replace_keeps_single_entry_per_variant() {
    let dir = tempfile::tempdir().unwrap();
    let mut manifest = manifest_in(&dir);
    manifest
        .add_or_replace_entry(ReferenceEntry::new(zlib(), Vec::new()))
        .unwrap();

    let newer = PackageId::new("zlib", "vc10", "1.2.7", Architecture::X64);
    manifest
        .add_or_replace_entry(ReferenceEntry::new(newer.clone(), Vec::new()))
        .unwrap();

    let reloaded = manifest_in(&dir);
    assert_eq!(reloaded.entries().len(), 1);
    assert_eq!(reloaded.entries()[0].package, newer);
    assert!(reloaded.find_entry_for(&zlib(), true).is_none());
    assert!(reloaded.find_entry_for(&zlib(), false).is_some());
}

#[test]
fn test_corrupt_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coapp.packages.config");

    for text in ["not xml at all", "<packages><package name=\"zlib\"", "<other/>"] {
        fs::write(&path, text).unwrap();
        assert!(
            matches!(
                ReferenceManifest::load(&path),
                Err(Error::ManifestCorrupt { .. })
            ),
            "expected corrupt manifest for {:?}",
            text
        );
    }
}

#[test]
fn test_malformed_entry_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("coapp.packages.config");
    fs::write(
        &path,
        r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package name="broken" version="1.0" architecture="sparc">
    <lib name="broken.dll" />
  </package>
  <package name="json" flavor="[net40]" version="4.5" architecture="any">
    <lib name="Json.dll" />
  </package>
</packages>
"#,
    )
    .unwrap();

    let manifest = ReferenceManifest::load(&path).unwrap();
    assert_eq!(manifest.entries().len(), 1);
    assert_eq!(manifest.entries()[0].package, json());
}
