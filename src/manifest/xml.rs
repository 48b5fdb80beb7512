// src/manifest/xml.rs

//! XML codec for reference manifests
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <packages>
//!   <package name="zlib" version="1.2" architecture="x64">
//!     <configuration name="Release|x64">
//!       <lib name="zlib.lib" />
//!     </configuration>
//!   </package>
//!   <package name="Newtonsoft" flavor="[net40]" version="4.5" architecture="any">
//!     <lib name="Newtonsoft.Json.dll" />
//!   </package>
//! </packages>
//! ```

use super::ReferenceEntry;
use crate::error::{Error, Result};
use crate::package::{Architecture, LibraryArtifact, PackageId};
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::collections::HashMap;
use std::path::Path;
use tracing::warn;

const ROOT: &str = "packages";
const PACKAGE: &str = "package";
const CONFIGURATION: &str = "configuration";
const LIB: &str = "lib";

/// A `<package>` element whose identity attributes were valid
struct PendingEntry {
    package: PackageId,
    libraries: Vec<LibraryArtifact>,
}

/// Parser state between events
#[derive(Default)]
struct ParseState {
    /// Names of currently open elements
    stack: Vec<String>,
    saw_root: bool,
    /// While set, everything deeper than this depth is ignored
    skip_depth: Option<usize>,
    current: Option<PendingEntry>,
    configuration: Option<String>,
    entries: Vec<ReferenceEntry>,
}

impl ParseState {
    fn open(&mut self, name: &str, attrs: HashMap<String, String>) -> std::result::Result<(), String> {
        let depth = self.stack.len();

        if let Some(skip) = self.skip_depth {
            if depth > skip {
                return Ok(());
            }
        }

        match depth {
            0 => {
                if self.saw_root {
                    return Err("multiple root elements".to_string());
                }
                if name != ROOT {
                    return Err(format!("expected <{}> root element, found <{}>", ROOT, name));
                }
                self.saw_root = true;
            }
            1 if name == PACKAGE => match pending_entry(&attrs) {
                Some(entry) => self.current = Some(entry),
                None => {
                    warn!("Skipping malformed package entry: {:?}", attrs);
                    self.skip_depth = Some(depth);
                }
            },
            2 if name == CONFIGURATION => match attrs.get("name") {
                Some(config) if !config.is_empty() => self.configuration = Some(config.clone()),
                _ => {
                    warn!("Skipping configuration group without a name");
                    self.skip_depth = Some(depth);
                }
            },
            2 | 3 if name == LIB => {
                let in_configuration = depth == 3;
                match (attrs.get("name"), self.current.as_mut()) {
                    (Some(lib), Some(entry)) if !lib.is_empty() => {
                        entry.libraries.push(LibraryArtifact {
                            configuration: if in_configuration {
                                self.configuration.clone()
                            } else {
                                None
                            },
                            name: lib.clone(),
                            selected: true,
                        });
                    }
                    _ => warn!("Skipping lib element without a name"),
                }
            }
            _ => {
                // Unknown element: ignore it and its children
                self.skip_depth = Some(depth);
            }
        }

        Ok(())
    }

    fn close(&mut self) {
        let depth = self.stack.len();

        if let Some(skip) = self.skip_depth {
            if depth > skip {
                return;
            }
            if depth == skip {
                self.skip_depth = None;
                return;
            }
        }

        match depth {
            1 => {
                if let Some(entry) = self.current.take() {
                    self.entries
                        .push(ReferenceEntry::new(entry.package, entry.libraries));
                }
            }
            2 => self.configuration = None,
            _ => {}
        }
    }
}

/// Build an entry from `<package>` attributes; `None` if identity is incomplete
fn pending_entry(attrs: &HashMap<String, String>) -> Option<PendingEntry> {
    let name = attrs.get("name").filter(|v| !v.is_empty())?;
    let version = attrs.get("version").filter(|v| !v.is_empty())?;
    let architecture: Architecture = attrs.get("architecture")?.parse().ok()?;
    let flavor = attrs.get("flavor").map(String::as_str).unwrap_or("");

    Some(PendingEntry {
        package: PackageId::new(name.clone(), flavor, version.clone(), architecture),
        libraries: Vec::new(),
    })
}

fn read_attributes(element: &BytesStart<'_>) -> std::result::Result<HashMap<String, String>, String> {
    let mut attrs = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(|e| e.to_string())?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

/// Parse a manifest document
///
/// Entries with missing or invalid identity attributes are skipped. Any
/// well-formedness problem fails the whole document.
pub(crate) fn parse(text: &str, path: &Path) -> Result<Vec<ReferenceEntry>> {
    let corrupt = |reason: String| Error::ManifestCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut state = ParseState::default();

    loop {
        let event = reader
            .read_event()
            .map_err(|e| corrupt(format!("at byte {}: {}", reader.buffer_position(), e)))?;

        match event {
            Event::Start(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                let attrs = read_attributes(&element).map_err(corrupt)?;
                state.open(&name, attrs).map_err(corrupt)?;
                state.stack.push(name);
            }
            Event::Empty(element) => {
                let name = String::from_utf8_lossy(element.name().as_ref()).into_owned();
                let attrs = read_attributes(&element).map_err(corrupt)?;
                state.open(&name, attrs).map_err(corrupt)?;
                state.close();
            }
            Event::End(_) => {
                if state.stack.pop().is_none() {
                    return Err(corrupt("unbalanced closing tag".to_string()));
                }
                state.close();
            }
            Event::Text(text) => {
                if state.stack.is_empty() && !text.is_empty() {
                    return Err(corrupt("text outside the root element".to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = state.stack.last() {
        return Err(corrupt(format!("document ends inside <{}>", open)));
    }
    if !state.saw_root {
        return Err(corrupt(format!("missing <{}> root element", ROOT)));
    }

    Ok(state.entries)
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::IoError(format!("Failed to encode manifest: {}", e)))
}

fn write_lib(writer: &mut Writer<Vec<u8>>, lib: &LibraryArtifact) -> Result<()> {
    let mut element = BytesStart::new(LIB);
    element.push_attribute(("name", lib.name.as_str()));
    emit(writer, Event::Empty(element))
}

/// Render entries as a manifest document
///
/// Entries are expected in their canonical order; configuration-independent
/// libraries are written directly under `<package>`, the rest grouped per
/// configuration.
pub(crate) fn render(entries: &[ReferenceEntry]) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    emit(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)),
    )?;
    emit(&mut writer, Event::Start(BytesStart::new(ROOT)))?;

    for entry in entries {
        let id = &entry.package;
        let mut package = BytesStart::new(PACKAGE);
        package.push_attribute(("name", id.name.as_str()));
        if !id.flavor.is_empty() {
            package.push_attribute(("flavor", id.flavor.as_str()));
        }
        package.push_attribute(("version", id.version.as_str()));
        package.push_attribute(("architecture", id.architecture.as_str()));

        if entry.libraries.is_empty() {
            emit(&mut writer, Event::Empty(package))?;
            continue;
        }

        emit(&mut writer, Event::Start(package))?;

        for lib in entry.libraries.iter().filter(|l| l.configuration.is_none()) {
            write_lib(&mut writer, lib)?;
        }

        let mut open_configuration: Option<&str> = None;
        for lib in &entry.libraries {
            let Some(config) = lib.configuration.as_deref() else {
                continue;
            };
            if open_configuration != Some(config) {
                if open_configuration.is_some() {
                    emit(&mut writer, Event::End(BytesEnd::new(CONFIGURATION)))?;
                }
                let mut group = BytesStart::new(CONFIGURATION);
                group.push_attribute(("name", config));
                emit(&mut writer, Event::Start(group))?;
                open_configuration = Some(config);
            }
            write_lib(&mut writer, lib)?;
        }
        if open_configuration.is_some() {
            emit(&mut writer, Event::End(BytesEnd::new(CONFIGURATION)))?;
        }

        emit(&mut writer, Event::End(BytesEnd::new(PACKAGE)))?;
    }

    emit(&mut writer, Event::End(BytesEnd::new(ROOT)))?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    String::from_utf8(bytes).map_err(|e| Error::IoError(format!("Manifest is not UTF-8: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_str(text: &str) -> Result<Vec<ReferenceEntry>> {
        parse(text, Path::new("coapp.packages.config"))
    }

    #[test]
    fn test_parse_configuration_groups() {
        let entries = parse_str(
            r#"<?xml version="1.0" encoding="utf-8"?>
<packages>
  <package name="zlib" version="1.2" architecture="x64">
    <configuration name="Release|x64">
      <lib name="foo.lib" />
    </configuration>
  </package>
</packages>"#,
        )
        .unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].package.name, "zlib");
        assert_eq!(entries[0].package.flavor, "");
        assert_eq!(
            entries[0].libraries,
            vec![LibraryArtifact::native("foo.lib", "Release|x64")]
        );
    }

    #[test]
    fn test_parse_direct_libs() {
        let entries = parse_str(
            r#"<packages><package name="json" flavor="net40" version="4.5" architecture="any"><lib name="Json.dll"/></package></packages>"#,
        )
        .unwrap();
        assert_eq!(entries[0].package.flavor, "[net40]");
        assert_eq!(entries[0].libraries, vec![LibraryArtifact::managed("Json.dll")]);
    }

    #[test]
    fn test_parse_skips_malformed_entries() {
        let entries = parse_str(
            r#"<packages>
  <package name="noversion" architecture="x86"><lib name="a.lib"/></package>
  <package name="badarch" version="1.0" architecture="sparc"/>
  <package version="1.0" architecture="x86"/>
  <package name="good" version="1.0" architecture="x86"/>
</packages>"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].package.name, "good");
        assert!(entries[0].libraries.is_empty());
    }

    #[test]
    fn test_parse_ignores_unknown_elements() {
        let entries = parse_str(
            r#"<packages><comment><package name="hidden" version="1" architecture="x86"/></comment><package name="real" version="1" architecture="x86"/></packages>"#,
        )
        .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].package.name, "real");
    }

    #[test]
    fn test_parse_rejects_wrong_root() {
        let err = parse_str("<references/>").unwrap_err();
        assert!(matches!(err, Error::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_parse_rejects_truncated_document() {
        let err = parse_str(r#"<packages><package name="zlib" version="1.2" architecture="x64">"#)
            .unwrap_err();
        assert!(matches!(err, Error::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_parse_rejects_mismatched_tags() {
        let err = parse_str("<packages><package></packages>").unwrap_err();
        assert!(matches!(err, Error::ManifestCorrupt { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(matches!(parse_str(""), Err(Error::ManifestCorrupt { .. })));
    }

    #[test]
    fn test_render_groups_by_configuration() {
        let entry = ReferenceEntry::new(
            PackageId::new("zlib", "", "1.2", Architecture::X64),
            vec![
                LibraryArtifact::native("b.lib", "Release|x64"),
                LibraryArtifact::native("a.lib", "Debug|x64"),
                LibraryArtifact::native("a.lib", "Release|x64"),
            ],
        );
        let text = render(&[entry]).unwrap();

        assert_eq!(text.matches("<configuration").count(), 2);
        let debug = text.find("Debug|x64").unwrap();
        let release = text.find("Release|x64").unwrap();
        assert!(debug < release);
    }

    #[test]
    fn test_render_escapes_attributes() {
        let entry = ReferenceEntry::new(
            PackageId::new("a&b", "", "1.0", Architecture::X86),
            Vec::new(),
        );
        let text = render(std::slice::from_ref(&entry)).unwrap();
        assert!(text.contains("a&amp;b"));

        let parsed = parse_str(&text).unwrap();
        assert_eq!(parsed, vec![entry]);
    }
}
