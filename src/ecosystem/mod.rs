//! Built-in collaborators for bundler, composer and npm_and_yarn
//!
//! This module provides:
//! - Dependency parsing over fetched manifests and lockfiles
//! - A registry-backed update checker
//! - A format-preserving file updater
//! - The ecosystem factories that wire them to GitLab and the registries

mod checker;
mod parser;
mod updater;

pub use checker::RegistryUpdateChecker;
pub use parser::ManifestFileParser;
pub use updater::ManifestFileUpdater;

use std::sync::Arc;

use crate::domain::{Credentials, DependencyFile, PackageManager, Source, UpdatedDependency};
use crate::error::ServiceError;
use crate::gitlab::{GitLabClient, GitLabFileFetcher};
use crate::registry::{create_adapter, HttpClient};
use crate::services::{
    CheckerRequest, Ecosystem, EcosystemRegistry, FileFetcher, FileParser, FileUpdater,
    UpdateChecker,
};

/// One package manager backed by GitLab for files and its registries for
/// versions
pub struct BuiltinEcosystem {
    package_manager: PackageManager,
    client: HttpClient,
}

impl BuiltinEcosystem {
    pub fn new(package_manager: PackageManager, client: HttpClient) -> Self {
        Self {
            package_manager,
            client,
        }
    }
}

impl Ecosystem for BuiltinEcosystem {
    fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    fn file_fetcher(
        &self,
        source: &Source,
        credentials: &Credentials,
    ) -> Result<Box<dyn FileFetcher>, ServiceError> {
        let client = GitLabClient::new(source, credentials)?;
        Ok(Box::new(GitLabFileFetcher::new(
            client,
            source.clone(),
            self.package_manager,
        )))
    }

    fn file_parser(
        &self,
        files: &[DependencyFile],
        _source: &Source,
        _credentials: &Credentials,
    ) -> Box<dyn FileParser> {
        Box::new(ManifestFileParser::new(self.package_manager, files))
    }

    fn update_checker(&self, request: CheckerRequest) -> Box<dyn UpdateChecker> {
        let registry = create_adapter(self.package_manager, self.client.clone(), &request.credentials);
        Box::new(RegistryUpdateChecker::new(request, registry))
    }

    fn file_updater(
        &self,
        files: &[DependencyFile],
        updates: &[UpdatedDependency],
        _credentials: &Credentials,
    ) -> Box<dyn FileUpdater> {
        Box::new(ManifestFileUpdater::new(self.package_manager, files, updates))
    }
}

/// Registry with every built-in ecosystem, sharing one HTTP client
pub fn builtin_registry(client: HttpClient) -> EcosystemRegistry {
    PackageManager::all()
        .iter()
        .fold(EcosystemRegistry::new(), |registry, pm| {
            registry.register(Arc::new(BuiltinEcosystem::new(*pm, client.clone())))
        })
}
