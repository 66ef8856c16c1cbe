//! Package manager identifiers for supported ecosystems

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported package managers, named the way `PACKAGE_MANAGER` spells them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    /// Ruby ecosystem (Gemfile, Gemfile.lock)
    Bundler,
    /// PHP ecosystem (composer.json)
    Composer,
    /// Node.js ecosystem (package.json)
    NpmAndYarn,
}

impl PackageManager {
    /// Returns the identifier used in configuration and branch names
    pub fn identifier(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "bundler",
            PackageManager::Composer => "composer",
            PackageManager::NpmAndYarn => "npm_and_yarn",
        }
    }

    /// Returns the manifest filename for this package manager
    pub fn manifest_filename(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "Gemfile",
            PackageManager::Composer => "composer.json",
            PackageManager::NpmAndYarn => "package.json",
        }
    }

    /// Returns the lock filenames the built-in ecosystem knows how to read
    pub fn lock_filenames(&self) -> &'static [&'static str] {
        match self {
            PackageManager::Bundler => &["Gemfile.lock"],
            PackageManager::Composer => &[],
            PackageManager::NpmAndYarn => &[],
        }
    }

    /// Returns the label attached to merge requests for this ecosystem
    pub fn language_label(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "ruby",
            PackageManager::Composer => "php",
            PackageManager::NpmAndYarn => "javascript",
        }
    }

    /// Returns the display name for this package manager
    pub fn display_name(&self) -> &'static str {
        match self {
            PackageManager::Bundler => "Bundler",
            PackageManager::Composer => "Composer",
            PackageManager::NpmAndYarn => "npm/yarn",
        }
    }

    /// Returns all supported package managers
    pub fn all() -> &'static [PackageManager] {
        &[
            PackageManager::Bundler,
            PackageManager::Composer,
            PackageManager::NpmAndYarn,
        ]
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Error returned for an unknown package manager identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPackageManager(pub String);

impl fmt::Display for UnknownPackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown package manager '{}'", self.0)
    }
}

impl std::error::Error for UnknownPackageManager {}

impl FromStr for PackageManager {
    type Err = UnknownPackageManager;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        PackageManager::all()
            .iter()
            .copied()
            .find(|pm| pm.identifier() == trimmed)
            .ok_or_else(|| UnknownPackageManager(trimmed.to_string()))
    }
}
