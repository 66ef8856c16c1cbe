//! Version specification types for different package ecosystems
//!
//! Handles version constraints like:
//! - Bundler: `~> 1.2`, `>= 1.0`, `= 1.2.3`, `>= 1.0, < 2.0`
//! - Composer: `^1.2`, `~1.2.3`, `>=1.0 <2.0`, `1.2.*`
//! - npm: `^1.2.3`, `~1.2.3`, `>=1.0.0`, `1.2.3`

use super::requirement::VersionRequirement;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of version specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSpecKind {
    /// Exact/pinned version (e.g., `1.2.3`, `= 1.2.3`)
    Exact,
    /// Caret range (e.g., `^1.2.3`) - compatible with major version
    Caret,
    /// Tilde or pessimistic range (e.g., `~1.2.3`, `~> 1.2`)
    Tilde,
    /// Greater than or equal (e.g., `>=1.2.3`)
    GreaterOrEqual,
    /// Greater than (e.g., `>1.2.3`)
    Greater,
    /// Less than or equal (e.g., `<=1.2.3`)
    LessOrEqual,
    /// Less than (e.g., `<1.2.3`)
    Less,
    /// Wildcard (e.g., `1.2.*`, `*`)
    Wildcard,
    /// Complex range (e.g., `>=1.0.0 <2.0.0`)
    Range,
    /// No constraint specified (e.g., `gem 'rails'` without version)
    Any,
}

impl VersionSpecKind {
    /// Returns true if this version spec kind represents a pinned/exact version
    pub fn is_pinned(&self) -> bool {
        matches!(self, VersionSpecKind::Exact)
    }

    /// Returns true if moving the version keeps the requirement meaningful
    ///
    /// Upper-bound-only and compound requirements cannot be bumped by
    /// swapping their version number.
    pub fn is_bumpable(&self) -> bool {
        matches!(
            self,
            VersionSpecKind::Exact
                | VersionSpecKind::Caret
                | VersionSpecKind::Tilde
                | VersionSpecKind::GreaterOrEqual
        )
    }
}

/// A version specification with its original string representation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSpec {
    /// The kind of version specification
    pub kind: VersionSpecKind,
    /// The raw version string as it appears in the manifest
    pub raw: String,
    /// The extracted version number (without prefix/suffix)
    pub version: String,
    /// Optional prefix to preserve during updates (e.g., `^`, `~> `, `>=`)
    pub prefix: Option<String>,
    /// Optional suffix to preserve
    pub suffix: Option<String>,
}

impl VersionSpec {
    /// Creates a new VersionSpec
    pub fn new(kind: VersionSpecKind, raw: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind,
            raw: raw.into(),
            version: version.into(),
            prefix: None,
            suffix: None,
        }
    }

    /// Creates a VersionSpec for a dependency declared without a requirement
    pub fn any() -> Self {
        Self::new(VersionSpecKind::Any, "", "")
    }

    /// Creates a new VersionSpec with prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Creates a new VersionSpec with suffix
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Returns true if this version is pinned
    pub fn is_pinned(&self) -> bool {
        self.kind.is_pinned()
    }

    /// Returns true if no requirement was declared
    pub fn is_any(&self) -> bool {
        self.kind == VersionSpecKind::Any
    }

    /// Formats a new version while preserving the original format
    pub fn format_updated(&self, new_version: &str) -> String {
        let mut result = String::new();

        if let Some(ref prefix) = self.prefix {
            result.push_str(prefix);
        }

        result.push_str(new_version);

        if let Some(ref suffix) = self.suffix {
            result.push_str(suffix);
        }

        result
    }

    /// Returns a copy of this spec moved to `new_version`, keeping its operator
    pub fn bumped(&self, new_version: &str) -> Self {
        Self {
            kind: self.kind,
            raw: self.format_updated(new_version),
            version: new_version.to_string(),
            prefix: self.prefix.clone(),
            suffix: self.suffix.clone(),
        }
    }

    /// Returns true if `version` satisfies this specification
    ///
    /// Unparseable specifications match nothing.
    pub fn matches(&self, version: &str) -> bool {
        if self.is_any() {
            return true;
        }
        VersionRequirement::parse(&self.raw)
            .map(|req| req.matches(version))
            .unwrap_or(false)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
