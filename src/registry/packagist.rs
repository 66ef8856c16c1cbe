//! Packagist Registry adapter
//!
//! Fetches package version information from the Packagist registry.
//! API endpoint: https://repo.packagist.org/p2/{vendor}/{package}.json; private
//! Composer repositories serve the same layout under their own URL
//!
//! The p2 endpoint serves "minified" metadata: each release only lists the
//! fields that changed since the previous entry, so `time` may have to be
//! carried forward.

use crate::domain::PackageManager;
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Public Packagist repository
pub(crate) const PACKAGIST_URL: &str = "https://repo.packagist.org";

/// Packagist Registry adapter
pub struct PackagistAdapter {
    client: HttpClient,
    base_url: String,
}

/// p2 metadata response
#[derive(Debug, Deserialize)]
struct PackagistResponse {
    packages: HashMap<String, Vec<PackagistRelease>>,
}

#[derive(Debug, Deserialize)]
struct PackagistRelease {
    version: Option<String>,
    version_normalized: Option<String>,
    time: Option<String>,
}

impl PackagistAdapter {
    /// Create a new Packagist adapter
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, PACKAGIST_URL)
    }

    /// Adapter for a Composer repository at `base_url`
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a package
    /// Package names are in the format vendor/package
    fn build_url(&self, package: &str) -> String {
        format!("{}/p2/{}.json", self.base_url, package.to_lowercase())
    }
}

fn collect_versions(releases: Vec<PackagistRelease>) -> Vec<VersionInfo> {
    let mut versions = Vec::new();
    let mut time: Option<String> = None;

    for release in releases {
        if release.time.is_some() {
            time = release.time;
        }
        let Some(raw) = release.version.or(release.version_normalized) else {
            continue;
        };
        // Branch aliases are not releases
        if raw.starts_with("dev-") || raw.ends_with("-dev") {
            continue;
        }
        let Some(released_at) = time.as_deref().and_then(|t| t.parse::<DateTime<Utc>>().ok())
        else {
            continue;
        };
        let version = raw.strip_prefix('v').unwrap_or(&raw).to_string();
        versions.push(VersionInfo::new(version, released_at));
    }

    versions.sort();
    versions
}

#[async_trait]
impl RegistryAdapter for PackagistAdapter {
    fn package_manager(&self) -> PackageManager {
        PackageManager::Composer
    }

    fn registry_name(&self) -> &'static str {
        "Packagist"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let mut response: PackagistResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        let releases = response
            .packages
            .remove(&package.to_lowercase())
            .ok_or_else(|| RegistryError::package_not_found(package, self.registry_name()))?;

        Ok(collect_versions(releases))
    }
}
