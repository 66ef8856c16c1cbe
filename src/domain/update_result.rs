//! Per-dependency check results

use super::{Dependency, RequirementsToUnlock, UpdatedDependency};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason why a dependency produced no update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No newer acceptable version exists
    UpToDate,
    /// A newer version exists but no permitted unlock level supports it
    NotUpdatable,
    /// The check failed and the error was swallowed
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::UpToDate => write!(f, "up to date"),
            SkipReason::NotUpdatable => write!(f, "update not possible"),
            SkipReason::Failed(msg) => write!(f, "error: {}", msg),
        }
    }
}

/// Result of checking a single dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateResult {
    /// The dependency contributed updates to the batch
    Update {
        /// The dependency that was checked
        dependency: Dependency,
        /// Unlock level the update was computed with
        unlock: RequirementsToUnlock,
        /// Dependencies the checker moved (may include more than the checked one)
        updates: Vec<UpdatedDependency>,
    },
    /// The dependency contributed nothing
    Skip {
        /// The dependency that was checked
        dependency: Dependency,
        /// The reason for skipping
        reason: SkipReason,
    },
}

impl UpdateResult {
    /// Creates an Update result
    pub fn update(
        dependency: Dependency,
        unlock: RequirementsToUnlock,
        updates: Vec<UpdatedDependency>,
    ) -> Self {
        UpdateResult::Update {
            dependency,
            unlock,
            updates,
        }
    }

    /// Creates a Skip result
    pub fn skip(dependency: Dependency, reason: SkipReason) -> Self {
        UpdateResult::Skip { dependency, reason }
    }

    /// Returns true if this is an update result
    pub fn is_update(&self) -> bool {
        matches!(self, UpdateResult::Update { .. })
    }

    /// Returns true if this is a skip result
    pub fn is_skip(&self) -> bool {
        matches!(self, UpdateResult::Skip { .. })
    }

    /// Returns the dependency reference
    pub fn dependency(&self) -> &Dependency {
        match self {
            UpdateResult::Update { dependency, .. } => dependency,
            UpdateResult::Skip { dependency, .. } => dependency,
        }
    }

    /// Returns the package name
    pub fn package_name(&self) -> &str {
        &self.dependency().name
    }
}

impl fmt::Display for UpdateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateResult::Update {
                dependency,
                unlock,
                updates,
            } => {
                let target = updates
                    .iter()
                    .find(|u| u.name() == dependency.name)
                    .map(|u| u.version.as_str())
                    .unwrap_or("?");
                write!(
                    f,
                    "{}: {} → {} (unlock {})",
                    dependency.name,
                    dependency.current_version().unwrap_or("?"),
                    target,
                    unlock
                )
            }
            UpdateResult::Skip { dependency, reason } => {
                write!(f, "{}: skipped ({})", dependency.name, reason)
            }
        }
    }
}
