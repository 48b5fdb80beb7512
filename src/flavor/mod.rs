// src/flavor/mod.rs
//! Flavor tag parsing and framework requirements
//!
//! A flavor distinguishes build variants of the same package version, e.g.
//! `[vc11]` for a toolset-specific native build or `[net40]` for an assembly
//! targeting .NET Framework 4.0. Syntax: bracketed, comma separated tags,
//! brackets optional: `[vc11, net40]`, `net40`, `[]`.

use crate::error::{Error, Result};
use crate::version::parse_framework_version;
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Managed framework families a project can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameworkFamily {
    NetFramework,
    Silverlight,
}

impl fmt::Display for FrameworkFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetFramework => write!(f, ".NETFramework"),
            Self::Silverlight => write!(f, "Silverlight"),
        }
    }
}

/// A single flavor tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlavorTag {
    /// `netNN`: minimum .NET Framework version
    Framework(Version),
    /// `silverlight` or `slN`
    Silverlight(String),
    /// `vcNN`: native toolset
    Toolset(String),
    /// Anything else, kept verbatim (lowercased)
    Other(String),
}

impl FlavorTag {
    /// Parse one tag such as "net40", "vc11", "sl5"
    pub fn parse(s: &str) -> Result<Self> {
        let tag = s.trim().to_ascii_lowercase();
        if tag.is_empty() {
            return Err(Error::ParseError("Empty flavor tag".to_string()));
        }

        if let Some(digits) = tag.strip_prefix("net") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Self::Framework(parse_framework_version(digits)?));
            }
        }

        if tag == "silverlight" {
            return Ok(Self::Silverlight(tag));
        }
        if let Some(digits) = tag.strip_prefix("sl") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Self::Silverlight(tag));
            }
        }

        if let Some(digits) = tag.strip_prefix("vc") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Ok(Self::Toolset(tag));
            }
        }

        Ok(Self::Other(tag))
    }
}

impl fmt::Display for FlavorTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framework(v) => {
                write!(f, "net{}{}", v.major, v.minor)?;
                if v.patch > 0 {
                    write!(f, "{}", v.patch)?;
                }
                Ok(())
            }
            Self::Silverlight(tag) | Self::Toolset(tag) | Self::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// What a flavor demands of a managed project's target framework
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkRequirement {
    /// No framework tag: any managed framework
    Any,
    /// .NET Framework at or above this version
    NetFramework(Version),
    /// Any Silverlight framework
    Silverlight,
}

impl FrameworkRequirement {
    /// Check whether a target framework satisfies this requirement
    pub fn satisfied_by(&self, family: FrameworkFamily, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::NetFramework(min) => family == FrameworkFamily::NetFramework && version >= min,
            Self::Silverlight => family == FrameworkFamily::Silverlight,
        }
    }
}

/// Complete flavor like `[vc11, net40]`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Flavor {
    pub tags: Vec<FlavorTag>,
}

impl Flavor {
    /// Create an empty flavor
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Canonicalize for consistent storage and comparison
    pub fn canonicalize(&mut self) {
        self.tags.sort_by_key(|t| t.to_string());
        self.tags.dedup();
    }

    /// Parse a flavor string
    ///
    /// Examples:
    /// - `[vc11]`
    /// - `vc11, net40` (without brackets)
    /// - `[vc11][x64-debug]` (adjacent groups are merged)
    /// - `` or `[]` (empty)
    pub fn parse(s: &str) -> Result<Self> {
        let tags = s
            .split(|c: char| c == '[' || c == ']' || c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(FlavorTag::parse)
            .collect::<Result<Vec<_>>>()?;

        let mut flavor = Self { tags };
        flavor.canonicalize();
        Ok(flavor)
    }

    /// Normalize a flavor string to its canonical spelling
    ///
    /// Unparsable input is kept trimmed and lowercased so identity
    /// comparisons still behave.
    pub fn normalize(s: &str) -> String {
        match Self::parse(s) {
            Ok(flavor) => flavor.to_string(),
            Err(_) => s.trim().to_ascii_lowercase(),
        }
    }

    /// The framework requirement implied by this flavor's tags
    ///
    /// Any Silverlight tag wins; otherwise the lowest `netNN` tag sets the
    /// minimum framework version.
    pub fn framework_requirement(&self) -> FrameworkRequirement {
        if self
            .tags
            .iter()
            .any(|t| matches!(t, FlavorTag::Silverlight(_)))
        {
            return FrameworkRequirement::Silverlight;
        }

        self.tags
            .iter()
            .filter_map(|t| match t {
                FlavorTag::Framework(v) => Some(v.clone()),
                _ => None,
            })
            .min()
            .map(FrameworkRequirement::NetFramework)
            .unwrap_or(FrameworkRequirement::Any)
    }
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return Ok(());
        }

        let parts: Vec<String> = self.tags.iter().map(|t| t.to_string()).collect();
        write!(f, "[{}]", parts.join(","))
    }
}

impl FromStr for Flavor {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Flavor::parse(s)
    }
}
