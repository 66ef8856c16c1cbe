//! Registry adapters for fetching package version information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - RubyGems adapter
//! - Packagist adapter
//! - npm Registry adapter
//! - Private registries from the configured credentials, consulted before
//!   the public one

mod client;
mod npm;
mod packagist;
mod rubygems;

pub use client::{HttpClient, RegistryAuth};
pub(crate) use client::{BASE_DELAY_MS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, MAX_RETRIES};
pub use npm::NpmAdapter;
pub use packagist::PackagistAdapter;
pub use rubygems::RubyGemsAdapter;

use crate::domain::{
    Credentials, PackageManager, COMPOSER_REPOSITORY, NPM_REGISTRY, RUBYGEMS_SERVER,
};
use crate::error::RegistryError;
use crate::update::VersionInfo;
use async_trait::async_trait;
use std::sync::Arc;

/// Trait for registry adapters
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Get the package manager this adapter serves
    fn package_manager(&self) -> PackageManager;

    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch available versions for a package, sorted oldest first
    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError>;
}

/// A private registry taken from one credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivateRegistry {
    pub base_url: String,
    pub auth: Option<RegistryAuth>,
}

fn credential_kind(package_manager: PackageManager) -> &'static str {
    match package_manager {
        PackageManager::Bundler => RUBYGEMS_SERVER,
        PackageManager::Composer => COMPOSER_REPOSITORY,
        PackageManager::NpmAndYarn => NPM_REGISTRY,
    }
}

/// `npm.example.com/acme` becomes `https://npm.example.com/acme`
fn base_url(endpoint: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

/// Private registries configured for `package_manager`, in credential order
pub fn private_registries(
    package_manager: PackageManager,
    credentials: &Credentials,
) -> Vec<PrivateRegistry> {
    credentials
        .of_kind(credential_kind(package_manager))
        .filter_map(|credential| {
            Some(PrivateRegistry {
                base_url: base_url(credential.endpoint()?),
                auth: RegistryAuth::from_credential(credential),
            })
        })
        .collect()
}

fn adapter_at(
    package_manager: PackageManager,
    client: HttpClient,
    base_url: Option<&str>,
) -> Arc<dyn RegistryAdapter> {
    match (package_manager, base_url) {
        (PackageManager::Bundler, Some(url)) => Arc::new(RubyGemsAdapter::with_base_url(client, url)),
        (PackageManager::Bundler, None) => Arc::new(RubyGemsAdapter::new(client)),
        (PackageManager::Composer, Some(url)) => Arc::new(PackagistAdapter::with_base_url(client, url)),
        (PackageManager::Composer, None) => Arc::new(PackagistAdapter::new(client)),
        (PackageManager::NpmAndYarn, Some(url)) => Arc::new(NpmAdapter::with_base_url(client, url)),
        (PackageManager::NpmAndYarn, None) => Arc::new(NpmAdapter::new(client)),
    }
}

/// Create a registry adapter for the given package manager
///
/// Private registries configured in `credentials` are asked first; the
/// public registry answers for packages none of them knows.
pub fn create_adapter(
    package_manager: PackageManager,
    client: HttpClient,
    credentials: &Credentials,
) -> Arc<dyn RegistryAdapter> {
    let private = private_registries(package_manager, credentials);
    let public = adapter_at(package_manager, client.clone(), None);
    if private.is_empty() {
        return public;
    }

    let mut adapters: Vec<Arc<dyn RegistryAdapter>> = private
        .into_iter()
        .map(|registry| {
            tracing::debug!(%package_manager, url = %registry.base_url, "using private registry");
            adapter_at(
                package_manager,
                client.clone().with_auth(registry.auth),
                Some(&registry.base_url),
            )
        })
        .collect();
    adapters.push(public);
    Arc::new(RegistryChain::new(package_manager, adapters))
}

/// Registries asked in order until one knows the package
pub struct RegistryChain {
    package_manager: PackageManager,
    adapters: Vec<Arc<dyn RegistryAdapter>>,
}

impl RegistryChain {
    pub fn new(package_manager: PackageManager, adapters: Vec<Arc<dyn RegistryAdapter>>) -> Self {
        Self {
            package_manager,
            adapters,
        }
    }
}

#[async_trait]
impl RegistryAdapter for RegistryChain {
    fn package_manager(&self) -> PackageManager {
        self.package_manager
    }

    fn registry_name(&self) -> &'static str {
        self.adapters
            .last()
            .map(|adapter| adapter.registry_name())
            .unwrap_or("registry")
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let mut not_found = None;
        for adapter in &self.adapters {
            match adapter.fetch_versions(package).await {
                Err(err @ RegistryError::PackageNotFound { .. }) => not_found = Some(err),
                other => return other,
            }
        }
        Err(not_found
            .unwrap_or_else(|| RegistryError::package_not_found(package, self.registry_name())))
    }
}
