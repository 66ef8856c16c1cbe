//! Files fetched from the source repository

use serde::{Deserialize, Serialize};

/// A manifest or lockfile fetched from the source repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyFile {
    /// File name relative to the source directory
    pub name: String,
    /// Directory the file lives in, as configured (`/` for the root)
    pub directory: String,
    /// UTF-8 file content
    pub content: String,
}

impl DependencyFile {
    pub fn new(
        name: impl Into<String>,
        directory: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
            content: content.into(),
        }
    }

    /// Repository path of the file, without a leading slash
    pub fn path(&self) -> String {
        let dir = self.directory.trim_matches('/');
        if dir.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", dir, self.name)
        }
    }

    /// Returns a copy of this file with new content
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            name: self.name.clone(),
            directory: self.directory.clone(),
            content: content.into(),
        }
    }
}

/// Looks up a file by name
pub fn find_file<'a>(files: &'a [DependencyFile], name: &str) -> Option<&'a DependencyFile> {
    files.iter().find(|f| f.name == name)
}
