//! Collaborator contract
//!
//! The orchestrator never parses manifests, talks to registries or runs git.
//! It drives these traits, obtained per package manager from an
//! [`EcosystemRegistry`], plus one [`PullRequestCreator`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{
    Credentials, Dependency, DependencyFile, PackageManager, RequirementsToUnlock,
    RequirementsUpdateStrategy, Source, UpdatedDependency, VersionRequirement,
};
use crate::error::{ConfigError, ServiceError};

/// Files read from the repository at one commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedFiles {
    pub files: Vec<DependencyFile>,
    /// Commit the files were read at; the merge request branches from it
    pub base_commit: String,
}

/// Reads manifest and lockfile contents from the source
#[async_trait]
pub trait FileFetcher: Send + Sync {
    async fn fetch(&self) -> Result<FetchedFiles, ServiceError>;
}

/// Turns fetched files into dependencies
pub trait FileParser: Send + Sync {
    fn parse(&self) -> Result<Vec<Dependency>, ServiceError>;
}

/// Everything an update checker is bound to
#[derive(Debug, Clone)]
pub struct CheckerRequest {
    pub dependency: Dependency,
    pub files: Vec<DependencyFile>,
    pub credentials: Credentials,
    pub strategy: RequirementsUpdateStrategy,
    /// Constraints whose matching versions must never be proposed
    pub ignored: Vec<VersionRequirement>,
}

/// Decides whether and how one dependency can move
#[async_trait]
pub trait UpdateChecker: Send + Sync {
    /// True when no acceptable newer version exists
    async fn up_to_date(&self) -> Result<bool, ServiceError>;

    /// False when the strategy forbids touching requirement strings
    fn requirements_unlocked_or_can_be(&self) -> bool;

    /// True when an update is possible at this unlock level
    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, ServiceError>;

    /// The dependencies that move at this unlock level
    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<UpdatedDependency>, ServiceError>;
}

/// Rewrites dependency files for a batch of updates
#[async_trait]
pub trait FileUpdater: Send + Sync {
    /// The files that changed, with their new content
    async fn updated_dependency_files(&self) -> Result<Vec<DependencyFile>, ServiceError>;
}

/// What goes into a merge request
#[derive(Debug, Clone)]
pub struct PullRequestRequest {
    pub source: Source,
    pub package_manager: PackageManager,
    pub base_commit: String,
    pub dependencies: Vec<UpdatedDependency>,
    pub files: Vec<DependencyFile>,
    pub credentials: Credentials,
    /// Label naming the ecosystem's language, e.g. `ruby`
    pub label_language: String,
    pub assignees: Vec<u64>,
}

/// A merge request that was opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub iid: u64,
    pub web_url: String,
    pub branch: String,
}

/// Opens merge requests on the source
#[async_trait]
pub trait PullRequestCreator: Send + Sync {
    async fn create(&self, request: &PullRequestRequest) -> Result<PullRequest, ServiceError>;
}

/// Factories for one package manager's collaborators
pub trait Ecosystem: Send + Sync {
    fn package_manager(&self) -> PackageManager;

    fn file_fetcher(
        &self,
        source: &Source,
        credentials: &Credentials,
    ) -> Result<Box<dyn FileFetcher>, ServiceError>;

    fn file_parser(
        &self,
        files: &[DependencyFile],
        source: &Source,
        credentials: &Credentials,
    ) -> Box<dyn FileParser>;

    fn update_checker(&self, request: CheckerRequest) -> Box<dyn UpdateChecker>;

    fn file_updater(
        &self,
        files: &[DependencyFile],
        updates: &[UpdatedDependency],
        credentials: &Credentials,
    ) -> Box<dyn FileUpdater>;
}

/// Lookup table from package manager to ecosystem
#[derive(Default, Clone)]
pub struct EcosystemRegistry {
    ecosystems: HashMap<PackageManager, Arc<dyn Ecosystem>>,
}

impl EcosystemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an ecosystem, replacing any earlier one for the same package manager
    pub fn register(mut self, ecosystem: Arc<dyn Ecosystem>) -> Self {
        self.ecosystems.insert(ecosystem.package_manager(), ecosystem);
        self
    }

    pub fn resolve(&self, package_manager: PackageManager) -> Result<Arc<dyn Ecosystem>, ConfigError> {
        self.ecosystems
            .get(&package_manager)
            .cloned()
            .ok_or(ConfigError::UnsupportedPackageManager { package_manager })
    }

    pub fn package_managers(&self) -> Vec<PackageManager> {
        let mut list: Vec<PackageManager> = self.ecosystems.keys().copied().collect();
        list.sort_by_key(|pm| pm.identifier());
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEcosystem(PackageManager);

    impl Ecosystem for NullEcosystem {
        fn package_manager(&self) -> PackageManager {
            self.0
        }

        fn file_fetcher(
            &self,
            _source: &Source,
            _credentials: &Credentials,
        ) -> Result<Box<dyn FileFetcher>, ServiceError> {
            Err(ServiceError::file_not_found("unused"))
        }

        fn file_parser(
            &self,
            _files: &[DependencyFile],
            _source: &Source,
            _credentials: &Credentials,
        ) -> Box<dyn FileParser> {
            unimplemented!()
        }

        fn update_checker(&self, _request: CheckerRequest) -> Box<dyn UpdateChecker> {
            unimplemented!()
        }

        fn file_updater(
            &self,
            _files: &[DependencyFile],
            _updates: &[UpdatedDependency],
            _credentials: &Credentials,
        ) -> Box<dyn FileUpdater> {
            unimplemented!()
        }
    }

    #[test]
    fn test_resolve_registered() {
        let registry = EcosystemRegistry::new()
            .register(Arc::new(NullEcosystem(PackageManager::Composer)));
        let ecosystem = registry.resolve(PackageManager::Composer).unwrap();
        assert_eq!(ecosystem.package_manager(), PackageManager::Composer);
    }

    #[test]
    fn test_resolve_missing_is_config_error() {
        let registry = EcosystemRegistry::new()
            .register(Arc::new(NullEcosystem(PackageManager::Composer)));
        let err = registry.resolve(PackageManager::Bundler).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::UnsupportedPackageManager {
                package_manager: PackageManager::Bundler
            }
        ));
    }

    #[test]
    fn test_package_managers_sorted() {
        let registry = EcosystemRegistry::new()
            .register(Arc::new(NullEcosystem(PackageManager::NpmAndYarn)))
            .register(Arc::new(NullEcosystem(PackageManager::Bundler)));
        assert_eq!(
            registry.package_managers(),
            vec![PackageManager::Bundler, PackageManager::NpmAndYarn]
        );
    }
}
