//! Registry-backed update checker shared by the built-in ecosystems

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::updater::apply_updates;
use crate::domain::{
    find_file, RequirementsToUnlock, UpdatedDependency, VersionSpec, VersionSpecKind,
};
use crate::error::ServiceError;
use crate::manifest::get_lockfile_parser;
use crate::registry::RegistryAdapter;
use crate::services::{CheckerRequest, UpdateChecker};
use crate::update::{parse_version, VersionInfo, VersionSelector};

/// Shorten `target` to the precision of `original` (`~> 1.2` moves to
/// `~> 1.9`, not `~> 1.9.0`); pre-releases are kept whole
fn with_precision_of(original: &str, target: &str) -> String {
    let precision = parse_version(original).release.len();
    let parsed = parse_version(target);
    if parsed.pre.is_some() || precision == 0 || precision >= parsed.release.len() {
        return target.to_string();
    }
    parsed.release[..precision]
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".")
}

/// `1.2.*` moved to `2.0.4` becomes `2.0.*`
fn bump_wildcard(requirement: &VersionSpec, target: &str) -> Option<VersionSpec> {
    let fixed = requirement.raw.trim().trim_end_matches('*').trim_end_matches('.');
    if fixed.is_empty() {
        return Some(requirement.clone());
    }
    let segments = fixed.split('.').count();
    let release = parse_version(target).release;
    if release.len() < segments {
        return None;
    }
    let prefix = release[..segments]
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".");
    let raw = format!("{}.*", prefix);
    Some(VersionSpec::new(VersionSpecKind::Wildcard, raw.clone(), raw))
}

/// Checks one dependency against its registry
pub struct RegistryUpdateChecker {
    request: CheckerRequest,
    registry: Arc<dyn RegistryAdapter>,
    versions: OnceCell<Vec<VersionInfo>>,
}

impl RegistryUpdateChecker {
    pub fn new(request: CheckerRequest, registry: Arc<dyn RegistryAdapter>) -> Self {
        Self {
            request,
            registry,
            versions: OnceCell::new(),
        }
    }

    /// Registry versions, fetched once per checker
    async fn available(&self) -> Result<&[VersionInfo], ServiceError> {
        let versions = self
            .versions
            .get_or_try_init(|| async {
                let versions = self
                    .registry
                    .fetch_versions(&self.request.dependency.name)
                    .await?;
                tracing::debug!(
                    package = %self.request.dependency.name,
                    registry = self.registry.registry_name(),
                    count = versions.len(),
                    "fetched versions"
                );
                Ok::<_, ServiceError>(versions)
            })
            .await?;
        Ok(versions.as_slice())
    }

    fn selector(&self) -> VersionSelector<'_> {
        VersionSelector::new(&self.request.dependency, &self.request.ignored)
    }

    fn has_lockfile(&self) -> bool {
        get_lockfile_parser(self.request.dependency.package_manager)
            .is_some_and(|parser| find_file(&self.request.files, parser.filename()).is_some())
    }

    /// The requirement after moving to `target`, or `None` when the
    /// requirement cannot be rewritten to admit it
    fn updated_requirement(&self, target: &str) -> Option<VersionSpec> {
        let requirement = &self.request.dependency.requirement;
        let keep_if_satisfied = self.request.strategy.keeps_satisfied_requirements();

        match requirement.kind {
            VersionSpecKind::Any => Some(requirement.clone()),
            kind if kind.is_bumpable() => {
                if keep_if_satisfied && requirement.matches(target) {
                    Some(requirement.clone())
                } else if kind.is_pinned() {
                    Some(requirement.bumped(target))
                } else {
                    Some(requirement.bumped(&with_precision_of(&requirement.version, target)))
                }
            }
            VersionSpecKind::Wildcard => {
                if requirement.matches(target) {
                    Some(requirement.clone())
                } else {
                    bump_wildcard(requirement, target)
                }
            }
            _ => requirement.matches(target).then(|| requirement.clone()),
        }
    }

    /// Move the locked version within the existing requirement
    fn locked_update(&self, available: &[VersionInfo]) -> Option<UpdatedDependency> {
        let dependency = &self.request.dependency;
        if dependency.version.is_none() || !self.has_lockfile() {
            return None;
        }
        let target = self
            .selector()
            .latest_matching(available, &dependency.requirement)?;
        Some(UpdatedDependency::new(
            dependency.clone(),
            target.version,
            dependency.requirement.clone(),
        ))
    }

    /// Move to the newest candidate, rewriting the requirement if needed
    fn unlocked_update(&self, available: &[VersionInfo]) -> Option<UpdatedDependency> {
        let dependency = &self.request.dependency;
        if !dependency.top_level || !self.requirements_unlocked_or_can_be() {
            return None;
        }
        let target = self.selector().latest(available)?;
        let requirement = self.updated_requirement(&target.version)?;
        Some(UpdatedDependency::new(
            dependency.clone(),
            target.version,
            requirement,
        ))
    }

    /// The update for `unlock`, if it changes at least one file
    async fn update_for(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Option<UpdatedDependency>, ServiceError> {
        let available = self.available().await?;
        let update = match unlock {
            RequirementsToUnlock::None => self.locked_update(available),
            RequirementsToUnlock::Own | RequirementsToUnlock::All => self.unlocked_update(available),
        };
        let Some(update) = update else {
            return Ok(None);
        };

        let package_manager = self.request.dependency.package_manager;
        match apply_updates(package_manager, &self.request.files, std::slice::from_ref(&update)) {
            Ok(changed) if !changed.is_empty() => Ok(Some(update)),
            Ok(_) => Ok(None),
            Err(ServiceError::Manifest(err)) => {
                tracing::debug!(package = %update.name(), %unlock, error = %err, "rewrite not possible");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl UpdateChecker for RegistryUpdateChecker {
    async fn up_to_date(&self) -> Result<bool, ServiceError> {
        let available = self.available().await?;
        Ok(self.selector().latest(available).is_none())
    }

    fn requirements_unlocked_or_can_be(&self) -> bool {
        self.request.strategy.allows_requirement_changes()
    }

    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, ServiceError> {
        Ok(self.update_for(unlock).await?.is_some())
    }

    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<UpdatedDependency>, ServiceError> {
        match self.update_for(unlock).await? {
            Some(update) => Ok(vec![update]),
            None => Err(ServiceError::update_not_possible(
                &self.request.dependency.name,
                unlock,
            )),
        }
    }
}
