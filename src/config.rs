// src/config.rs

//! Engine configuration
//!
//! ```toml
//! manifest_file_name = "coapp.packages.config"
//! native_library_pattern = "*.lib"
//! managed_assembly_pattern = "*.dll"
//! parallel_probe = true
//! package_cache_ttl_secs = 300
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use std::time::Duration;

/// Manifest file name relative to the project directory
pub const DEFAULT_MANIFEST_FILE_NAME: &str = "coapp.packages.config";

/// Knobs for the reconciliation engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_manifest_file_name")]
    pub manifest_file_name: String,

    /// Glob for native libraries in a package's library directory
    #[serde(default = "default_native_library_pattern")]
    pub native_library_pattern: String,

    /// Glob for reference assemblies in a package's assembly directory
    #[serde(default = "default_managed_assembly_pattern")]
    pub managed_assembly_pattern: String,

    /// Probe projects on the rayon pool instead of sequentially
    #[serde(default = "default_parallel_probe")]
    pub parallel_probe: bool,

    #[serde(default = "default_package_cache_ttl_secs")]
    pub package_cache_ttl_secs: u64,
}

fn default_manifest_file_name() -> String {
    DEFAULT_MANIFEST_FILE_NAME.to_string()
}

fn default_native_library_pattern() -> String {
    "*.lib".to_string()
}

fn default_managed_assembly_pattern() -> String {
    "*.dll".to_string()
}

fn default_parallel_probe() -> bool {
    true
}

fn default_package_cache_ttl_secs() -> u64 {
    300
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            manifest_file_name: default_manifest_file_name(),
            native_library_pattern: default_native_library_pattern(),
            managed_assembly_pattern: default_managed_assembly_pattern(),
            parallel_probe: default_parallel_probe(),
            package_cache_ttl_secs: default_package_cache_ttl_secs(),
        }
    }
}

impl EngineConfig {
    /// Load from a TOML file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(Error::IoError(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))),
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.manifest_file_name.trim().is_empty()
            || self.manifest_file_name.contains(['/', '\\'])
        {
            return Err(Error::ConfigError(format!(
                "manifest_file_name must be a plain file name, got '{}'",
                self.manifest_file_name
            )));
        }
        for (key, pattern) in [
            ("native_library_pattern", &self.native_library_pattern),
            ("managed_assembly_pattern", &self.managed_assembly_pattern),
        ] {
            glob::Pattern::new(pattern)
                .map_err(|e| Error::ConfigError(format!("{}: {}", key, e)))?;
        }
        Ok(())
    }

    pub fn package_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.package_cache_ttl_secs)
    }

    /// Manifest path for a project directory
    pub fn manifest_path(&self, project_dir: &Path) -> std::path::PathBuf {
        project_dir.join(&self.manifest_file_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = EngineConfig::parse("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.manifest_file_name, DEFAULT_MANIFEST_FILE_NAME);
        assert!(config.parallel_probe);
    }

    #[test]
    fn test_partial_override() {
        let config = EngineConfig::parse("parallel_probe = false\npackage_cache_ttl_secs = 5").unwrap();
        assert!(!config.parallel_probe);
        assert_eq!(config.package_cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.native_library_pattern, "*.lib");
    }

    #[test]
    fn test_rejects_unknown_key() {
        assert!(matches!(
            EngineConfig::parse("colour = \"blue\""),
            Err(Error::ConfigError(_))
        ));
    }

    #[test]
    fn test_rejects_path_manifest_name() {
        assert!(EngineConfig::parse("manifest_file_name = \"sub/refs.config\"").is_err());
    }

    #[test]
    fn test_rejects_bad_pattern() {
        assert!(EngineConfig::parse("native_library_pattern = \"[\"").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load(&dir.path().join("pkgwire.toml")).unwrap();
        assert_eq!(config, EngineConfig::default());
    }
}
