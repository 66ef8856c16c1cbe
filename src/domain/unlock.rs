//! Requirement unlocking and update strategies

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// How far an update may edit requirement strings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementsToUnlock {
    /// Move the locked version only, inside the existing requirement
    None,
    /// Edit the dependency's own requirement
    Own,
    /// Edit requirements across the manifest
    All,
}

impl RequirementsToUnlock {
    /// Candidates in the order they are tried
    pub const PRIORITY: [RequirementsToUnlock; 3] = [
        RequirementsToUnlock::None,
        RequirementsToUnlock::Own,
        RequirementsToUnlock::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementsToUnlock::None => "none",
            RequirementsToUnlock::Own => "own",
            RequirementsToUnlock::All => "all",
        }
    }
}

impl fmt::Display for RequirementsToUnlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementsToUnlock {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" => Ok(RequirementsToUnlock::None),
            "own" => Ok(RequirementsToUnlock::Own),
            "all" => Ok(RequirementsToUnlock::All),
            other => Err(format!(
                "unknown requirement unlock '{}': expected 'none', 'own', or 'all'",
                other
            )),
        }
    }
}

/// Unlock levels the user has ruled out
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExcludedUnlocks(BTreeSet<RequirementsToUnlock>);

impl ExcludedUnlocks {
    /// Parses a space-separated list such as `"own all"`
    pub fn parse(input: &str) -> Result<Self, String> {
        input
            .split_whitespace()
            .map(str::parse)
            .collect::<Result<BTreeSet<_>, _>>()
            .map(Self)
    }

    pub fn contains(&self, unlock: RequirementsToUnlock) -> bool {
        self.0.contains(&unlock)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<RequirementsToUnlock> for ExcludedUnlocks {
    fn from_iter<I: IntoIterator<Item = RequirementsToUnlock>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How requirement strings are rewritten when an update needs them to move
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequirementsUpdateStrategy {
    /// Always move the requirement to the new version
    #[default]
    BumpVersions,
    /// Only move the requirement when it does not admit the new version
    BumpVersionsIfNecessary,
    /// Widen the requirement to admit the new version
    WidenRanges,
    /// Never touch requirements, only lockfiles
    LockfileOnly,
}

impl RequirementsUpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementsUpdateStrategy::BumpVersions => "bump_versions",
            RequirementsUpdateStrategy::BumpVersionsIfNecessary => "bump_versions_if_necessary",
            RequirementsUpdateStrategy::WidenRanges => "widen_ranges",
            RequirementsUpdateStrategy::LockfileOnly => "lockfile_only",
        }
    }

    /// Returns true if requirements may be edited at all
    pub fn allows_requirement_changes(&self) -> bool {
        !matches!(self, RequirementsUpdateStrategy::LockfileOnly)
    }

    /// Returns true if a requirement that already admits the target is kept
    pub fn keeps_satisfied_requirements(&self) -> bool {
        matches!(
            self,
            RequirementsUpdateStrategy::BumpVersionsIfNecessary
                | RequirementsUpdateStrategy::WidenRanges
        )
    }
}

impl fmt::Display for RequirementsUpdateStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequirementsUpdateStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bump_versions" => Ok(RequirementsUpdateStrategy::BumpVersions),
            "bump_versions_if_necessary" => Ok(RequirementsUpdateStrategy::BumpVersionsIfNecessary),
            "widen_ranges" => Ok(RequirementsUpdateStrategy::WidenRanges),
            "lockfile_only" => Ok(RequirementsUpdateStrategy::LockfileOnly),
            other => Err(format!(
                "unknown update strategy '{}': expected 'bump_versions', \
                 'bump_versions_if_necessary', 'widen_ranges', or 'lockfile_only'",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_order() {
        assert_eq!(
            RequirementsToUnlock::PRIORITY,
            [
                RequirementsToUnlock::None,
                RequirementsToUnlock::Own,
                RequirementsToUnlock::All
            ]
        );
    }

    #[test]
    fn test_unlock_from_str() {
        assert_eq!("own".parse(), Ok(RequirementsToUnlock::Own));
        assert!("everything".parse::<RequirementsToUnlock>().is_err());
    }

    #[test]
    fn test_excluded_unlocks_parse() {
        let excluded = ExcludedUnlocks::parse("own  all").unwrap();
        assert!(excluded.contains(RequirementsToUnlock::Own));
        assert!(excluded.contains(RequirementsToUnlock::All));
        assert!(!excluded.contains(RequirementsToUnlock::None));
    }

    #[test]
    fn test_excluded_unlocks_empty() {
        assert!(ExcludedUnlocks::parse("   ").unwrap().is_empty());
    }

    #[test]
    fn test_excluded_unlocks_unknown_symbol() {
        let err = ExcludedUnlocks::parse("none bogus").unwrap_err();
        assert!(err.contains("bogus"));
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!(
            "widen_ranges".parse(),
            Ok(RequirementsUpdateStrategy::WidenRanges)
        );
        assert!("bump".parse::<RequirementsUpdateStrategy>().is_err());
        assert_eq!(
            RequirementsUpdateStrategy::default(),
            RequirementsUpdateStrategy::BumpVersions
        );
    }

    #[test]
    fn test_strategy_flags() {
        assert!(!RequirementsUpdateStrategy::LockfileOnly.allows_requirement_changes());
        assert!(RequirementsUpdateStrategy::BumpVersions.allows_requirement_changes());
        assert!(RequirementsUpdateStrategy::WidenRanges.keeps_satisfied_requirements());
        assert!(!RequirementsUpdateStrategy::BumpVersions.keeps_satisfied_requirements());
    }
}
