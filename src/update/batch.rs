//! The set of updates accumulated across one run

use crate::domain::UpdatedDependency;

/// Updates collected by the check loop, handed to the updater and the
/// merge-request creator as a whole
///
/// A dependency appears at most once; a later update for the same name
/// replaces the earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateBatch(Vec<UpdatedDependency>);

impl UpdateBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the batch with `updates` added
    pub fn extended(mut self, updates: impl IntoIterator<Item = UpdatedDependency>) -> Self {
        for update in updates {
            match self.0.iter_mut().find(|u| u.name() == update.name()) {
                Some(existing) => *existing = update,
                None => self.0.push(update),
            }
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &UpdatedDependency> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[UpdatedDependency] {
        &self.0
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|u| u.name())
    }

    pub fn into_vec(self) -> Vec<UpdatedDependency> {
        self.0
    }
}
