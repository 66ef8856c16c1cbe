//! Dependency information structures

use super::{PackageManager, VersionSpec};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a package dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Package name
    pub name: String,
    /// Requirement declared in the manifest (`Any` when none is given)
    pub requirement: VersionSpec,
    /// Resolved version from the lockfile, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Whether the dependency is declared directly in the manifest
    pub top_level: bool,
    /// Whether this is a development dependency
    pub is_dev: bool,
    /// The package manager this dependency belongs to
    pub package_manager: PackageManager,
}

impl Dependency {
    /// Creates a new top-level production dependency
    pub fn new(
        name: impl Into<String>,
        requirement: VersionSpec,
        package_manager: PackageManager,
    ) -> Self {
        Self {
            name: name.into(),
            requirement,
            version: None,
            top_level: true,
            is_dev: false,
            package_manager,
        }
    }

    /// Creates a dependency that only appears in the lockfile
    pub fn transitive(
        name: impl Into<String>,
        version: impl Into<String>,
        package_manager: PackageManager,
    ) -> Self {
        Self {
            name: name.into(),
            requirement: VersionSpec::any(),
            version: Some(version.into()),
            top_level: false,
            is_dev: false,
            package_manager,
        }
    }

    /// Sets the locked version (builder pattern)
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Marks this dependency as a development dependency (builder pattern)
    pub fn development(mut self) -> Self {
        self.is_dev = true;
        self
    }

    /// Returns true if this dependency is pinned
    pub fn is_pinned(&self) -> bool {
        self.requirement.is_pinned()
    }

    /// The version the project currently runs: the locked version, else the
    /// version written in the requirement
    pub fn current_version(&self) -> Option<&str> {
        self.version.as_deref().or_else(|| {
            let v = self.requirement.version.as_str();
            (!v.is_empty()).then_some(v)
        })
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dev_marker = if self.is_dev { " (dev)" } else { "" };
        match self.current_version() {
            Some(v) => write!(f, "{}@{}{} [{}]", self.name, v, dev_marker, self.package_manager),
            None => write!(f, "{}{} [{}]", self.name, dev_marker, self.package_manager),
        }
    }
}

/// A dependency together with the version it should move to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatedDependency {
    /// The dependency as it was parsed
    pub dependency: Dependency,
    /// Version the dependency moves to
    pub version: String,
    /// Requirement after the update (unchanged for lockfile-only moves)
    pub requirement: VersionSpec,
}

impl UpdatedDependency {
    /// Creates a new UpdatedDependency
    pub fn new(dependency: Dependency, version: impl Into<String>, requirement: VersionSpec) -> Self {
        Self {
            dependency,
            version: version.into(),
            requirement,
        }
    }

    /// Name of the dependency
    pub fn name(&self) -> &str {
        &self.dependency.name
    }

    /// Version before the update, if known
    pub fn previous_version(&self) -> Option<&str> {
        self.dependency.current_version()
    }

    /// Returns true if the manifest requirement changes
    pub fn requirement_changed(&self) -> bool {
        self.requirement.raw != self.dependency.requirement.raw
    }
}
