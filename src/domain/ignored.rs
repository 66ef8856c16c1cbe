//! Per-dependency ignored version constraints

use super::requirement::{RequirementParseError, VersionRequirement};
use std::collections::HashMap;

/// Dependency name to the constraint sets whose versions must never be proposed
///
/// Built from JSON like `{"vendor/package": [">0.1.0", ">0.2.0"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoredVersions(HashMap<String, Vec<VersionRequirement>>);

impl IgnoredVersions {
    /// Parses every constraint, failing on the first invalid one
    pub fn from_map(raw: HashMap<String, Vec<String>>) -> Result<Self, RequirementParseError> {
        raw.into_iter()
            .map(|(name, constraints)| {
                let parsed = constraints
                    .iter()
                    .map(|c| VersionRequirement::parse(c))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((name, parsed))
            })
            .collect::<Result<HashMap<_, _>, _>>()
            .map(Self)
    }

    /// Constraints registered for `name` (empty when none)
    pub fn for_dependency(&self, name: &str) -> &[VersionRequirement] {
        self.0.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if any constraint for `name` matches `version`
    pub fn is_ignored(&self, name: &str, version: &str) -> bool {
        self.for_dependency(name).iter().any(|c| c.matches(version))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
