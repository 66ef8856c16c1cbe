//! Reads a package manager's dependency files from a GitLab project

use async_trait::async_trait;

use super::GitLabClient;
use crate::domain::{DependencyFile, PackageManager, Source};
use crate::error::ServiceError;
use crate::services::{FetchedFiles, FileFetcher};

/// Downloads the manifest (required) and lockfiles (optional) from the
/// source directory at the head of the source branch
pub struct GitLabFileFetcher {
    client: GitLabClient,
    source: Source,
    package_manager: PackageManager,
}

impl GitLabFileFetcher {
    pub fn new(client: GitLabClient, source: Source, package_manager: PackageManager) -> Self {
        Self {
            client,
            source,
            package_manager,
        }
    }

    fn file_path(&self, name: &str) -> String {
        DependencyFile::new(name, self.source.directory.as_str(), "").path()
    }
}

#[async_trait]
impl FileFetcher for GitLabFileFetcher {
    async fn fetch(&self) -> Result<FetchedFiles, ServiceError> {
        let branch = match &self.source.branch {
            Some(branch) => branch.clone(),
            None => self.client.default_branch().await?,
        };
        let base_commit = self.client.branch_commit(&branch).await?;
        tracing::debug!(branch = %branch, commit = %base_commit, "reading dependency files");

        let entries = self.client.tree(&self.source.directory, &base_commit).await?;
        let present = |name: &str| entries.iter().any(|e| e.is_file() && e.name == name);

        let manifest = self.package_manager.manifest_filename();
        if !present(manifest) {
            return Err(ServiceError::file_not_found(self.file_path(manifest)));
        }

        let wanted = std::iter::once(manifest).chain(
            self.package_manager
                .lock_filenames()
                .iter()
                .copied()
                .filter(|name| present(*name)),
        );

        let mut files = Vec::new();
        for name in wanted {
            let path = self.file_path(name);
            let content = self.client.raw_file(&path, &base_commit).await?;
            tracing::debug!(file = %path, bytes = content.len(), "fetched");
            files.push(DependencyFile::new(name, self.source.directory.as_str(), content));
        }

        Ok(FetchedFiles { files, base_commit })
    }
}
