//! Rewrites manifests and lockfiles for a batch of updates

use async_trait::async_trait;

use crate::domain::{find_file, DependencyFile, PackageManager, UpdatedDependency};
use crate::error::ServiceError;
use crate::manifest::{get_lockfile_parser, get_parser};
use crate::services::FileUpdater;

/// Applies `updates` to `files`, returning only the files whose content changed
///
/// Requirement changes go to the manifest (and the lockfile's own record of
/// them); locked versions move in the lockfile when one was fetched.
pub(crate) fn apply_updates(
    package_manager: PackageManager,
    files: &[DependencyFile],
    updates: &[UpdatedDependency],
) -> Result<Vec<DependencyFile>, ServiceError> {
    let manifest_name = package_manager.manifest_filename();
    let manifest = find_file(files, manifest_name)
        .ok_or_else(|| ServiceError::file_not_found(manifest_name))?;

    let parser = get_parser(package_manager);
    let mut manifest_content = manifest.content.clone();
    for update in updates
        .iter()
        .filter(|u| u.dependency.top_level && u.requirement_changed())
    {
        manifest_content =
            parser.update_requirement(&manifest_content, update.name(), &update.requirement.raw)?;
    }

    let mut changed = Vec::new();
    if manifest_content != manifest.content {
        changed.push(manifest.with_content(manifest_content));
    }

    let lock = get_lockfile_parser(package_manager)
        .and_then(|parser| find_file(files, parser.filename()).map(|file| (parser, file)));
    if let Some((lock_parser, lockfile)) = lock {
        let mut content = lockfile.content.clone();
        for update in updates {
            if update.dependency.version.is_some() {
                content = lock_parser.update_version(&content, update.name(), &update.version)?;
            }
            if update.dependency.top_level && update.requirement_changed() {
                content =
                    lock_parser.update_requirement(&content, update.name(), &update.requirement.raw)?;
            }
        }
        if content != lockfile.content {
            changed.push(lockfile.with_content(content));
        }
    }

    Ok(changed)
}

/// File updater shared by the built-in ecosystems
pub struct ManifestFileUpdater {
    package_manager: PackageManager,
    files: Vec<DependencyFile>,
    updates: Vec<UpdatedDependency>,
}

impl ManifestFileUpdater {
    pub fn new(
        package_manager: PackageManager,
        files: &[DependencyFile],
        updates: &[UpdatedDependency],
    ) -> Self {
        Self {
            package_manager,
            files: files.to_vec(),
            updates: updates.to_vec(),
        }
    }
}

#[async_trait]
impl FileUpdater for ManifestFileUpdater {
    async fn updated_dependency_files(&self) -> Result<Vec<DependencyFile>, ServiceError> {
        let changed = apply_updates(self.package_manager, &self.files, &self.updates)?;
        if changed.is_empty() {
            return Err(ServiceError::no_files_changed(
                self.updates.iter().map(|u| u.name()),
            ));
        }
        for file in &changed {
            tracing::debug!(file = %file.path(), "updated");
        }
        Ok(changed)
    }
}
