// src/version/mod.rs

//! Package and framework version handling
//!
//! Package versions are dotted numeric strings with up to four components
//! (`1.2`, `1.2.11.0`). Framework versions are compared as `semver::Version`
//! built from their first three components.

use crate::error::{Error, Result};
use semver::Version;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Maximum number of dotted components in a package version
const MAX_COMPONENTS: usize = 4;

/// A parsed package version
///
/// Equality and ordering treat missing trailing components as zero, so
/// `1.2` and `1.2.0.0` compare equal. Display prints the parsed components,
/// so `v1.2` displays as `1.2`.
#[derive(Debug, Clone)]
pub struct PackageVersion {
    parts: Vec<u64>,
}

impl PackageVersion {
    /// Parse a dotted version string
    ///
    /// Examples:
    /// - "1.2" → [1, 2]
    /// - "1.2.11.0" → [1, 2, 11, 0]
    /// - "v1.2" → [1, 2] (leading `v` is accepted)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix(['v', 'V']).unwrap_or(s);

        if s.is_empty() {
            return Err(Error::ParseError("Empty version string".to_string()));
        }

        let parts = s
            .split('.')
            .map(|part| {
                part.parse::<u64>().map_err(|e| {
                    Error::ParseError(format!("Invalid version component '{}' in '{}': {}", part, s, e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if parts.len() > MAX_COMPONENTS {
            return Err(Error::ParseError(format!(
                "Version '{}' has more than {} components",
                s, MAX_COMPONENTS
            )));
        }

        Ok(Self { parts })
    }

    /// Build from explicit components
    pub fn from_parts(parts: &[u64]) -> Self {
        Self {
            parts: parts.to_vec(),
        }
    }

    /// The numeric components as written
    pub fn parts(&self) -> &[u64] {
        &self.parts
    }

    fn component(&self, index: usize) -> u64 {
        self.parts.get(index).copied().unwrap_or(0)
    }

    /// Convert to a semver::Version using the first three components
    pub fn to_semver(&self) -> Version {
        Version::new(self.component(0), self.component(1), self.component(2))
    }
}

impl fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for PackageVersion {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for PackageVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (0..MAX_COMPONENTS)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for PackageVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for PackageVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for PackageVersion {}

/// Whether two version strings name the same package version
///
/// Compared as [`PackageVersion`] when both parse, as text otherwise.
pub fn same_version(a: &str, b: &str) -> bool {
    match (PackageVersion::parse(a), PackageVersion::parse(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Parse a framework version token such as `v4.0`, `4.5.1` or `40`
///
/// A bare digit run without dots (as found in flavor tags like `net451`)
/// is read as major digit followed by minor and patch digits.
pub fn parse_framework_version(s: &str) -> Result<Version> {
    let s = s.trim();
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);

    if s.is_empty() {
        return Err(Error::ParseError("Empty framework version".to_string()));
    }

    if !s.contains('.') {
        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(Error::ParseError(format!(
                "Invalid framework version '{}'",
                s
            )));
        }
        let digit = |i: usize| {
            s.chars()
                .nth(i)
                .and_then(|c| c.to_digit(10))
                .map(u64::from)
                .unwrap_or(0)
        };
        return Ok(Version::new(digit(0), digit(1), digit(2)));
    }

    Ok(PackageVersion::parse(s)?.to_semver())
}
