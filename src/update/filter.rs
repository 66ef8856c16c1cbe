//! Dependency selection filter
//!
//! Decides which parsed dependencies enter the update loop: either those
//! whose name contains one of the `DEPENDENCIES` substrings, or (when that
//! list is empty) every top-level dependency.

use crate::domain::Dependency;

/// Which parsed dependencies are checked for updates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyFilter {
    /// Keep dependencies whose lowercased name contains any of these substrings
    NameContains(Vec<String>),
    /// Keep top-level dependencies only
    TopLevel,
}

impl DependencyFilter {
    /// Builds a filter from a comma-separated list
    ///
    /// Entries are trimmed and lowercased; empty entries are dropped. A list
    /// with no entries left selects top-level dependencies.
    pub fn from_list(list: &str) -> Self {
        let patterns: Vec<String> = list
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        if patterns.is_empty() {
            DependencyFilter::TopLevel
        } else {
            DependencyFilter::NameContains(patterns)
        }
    }

    /// Check if a dependency should be processed
    pub fn should_process(&self, dependency: &Dependency) -> bool {
        match self {
            DependencyFilter::NameContains(patterns) => {
                let name = dependency.name.to_lowercase();
                patterns.iter().any(|p| name.contains(p.as_str()))
            }
            DependencyFilter::TopLevel => dependency.top_level,
        }
    }

    /// Keeps the dependencies this filter selects, preserving order
    pub fn apply(&self, dependencies: Vec<Dependency>) -> Vec<Dependency> {
        dependencies
            .into_iter()
            .filter(|d| self.should_process(d))
            .collect()
    }
}

impl Default for DependencyFilter {
    fn default() -> Self {
        Self::from_list("ft,phplib,ecom")
    }
}
