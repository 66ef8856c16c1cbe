//! Update selection logic for dependencies
//!
//! This module provides:
//! - Dependency filter built from the DEPENDENCIES allow-list
//! - Version info from registry with release date
//! - Candidate version selection for a dependency
//! - Unlock level ordering and the accumulated update batch

mod batch;
mod filter;
mod version_info;

pub use batch::UpdateBatch;
pub use filter::DependencyFilter;
pub(crate) use version_info::parse_version;
pub use version_info::{compare_versions, is_prerelease_version, VersionInfo};

use crate::domain::{
    Dependency, ExcludedUnlocks, RequirementsToUnlock, VersionRequirement, VersionSpec,
};
use std::cmp::Ordering;

/// Unlock levels to try, in order, for one dependency
///
/// When requirements cannot be unlocked only `none` is left.
pub fn candidate_unlocks(
    requirements_unlockable: bool,
    excluded: &ExcludedUnlocks,
) -> Vec<RequirementsToUnlock> {
    RequirementsToUnlock::PRIORITY
        .into_iter()
        .filter(|unlock| requirements_unlockable || *unlock == RequirementsToUnlock::None)
        .filter(|unlock| !excluded.contains(*unlock))
        .collect()
}

/// Picks the versions a dependency may move to
pub struct VersionSelector<'a> {
    current: Option<&'a str>,
    ignored: &'a [VersionRequirement],
}

impl<'a> VersionSelector<'a> {
    pub fn new(dependency: &'a Dependency, ignored: &'a [VersionRequirement]) -> Self {
        Self {
            current: dependency.current_version(),
            ignored,
        }
    }

    fn is_ignored(&self, version: &str) -> bool {
        self.ignored.iter().any(|req| req.matches(version))
    }

    /// Newer, non-ignored versions, oldest first
    ///
    /// Pre-releases are only considered when the current version is one.
    /// Without a known current version there is nothing to compare against,
    /// so nothing is a candidate.
    pub fn candidates(&self, available: &[VersionInfo]) -> Vec<VersionInfo> {
        let Some(current) = self.current else {
            return Vec::new();
        };
        let allow_prerelease = is_prerelease_version(current);

        let mut candidates: Vec<VersionInfo> = available
            .iter()
            .filter(|v| allow_prerelease || !v.is_prerelease())
            .filter(|v| compare_versions(&v.version, current) == Ordering::Greater)
            .filter(|v| !self.is_ignored(&v.version))
            .cloned()
            .collect();
        candidates.sort();
        candidates.dedup_by(|a, b| a.version == b.version);
        candidates
    }

    /// The newest candidate
    pub fn latest(&self, available: &[VersionInfo]) -> Option<VersionInfo> {
        self.candidates(available).pop()
    }

    /// The newest candidate the requirement already admits
    pub fn latest_matching(
        &self,
        available: &[VersionInfo],
        requirement: &VersionSpec,
    ) -> Option<VersionInfo> {
        self.candidates(available)
            .into_iter()
            .rev()
            .find(|v| requirement.matches(&v.version))
    }
}
