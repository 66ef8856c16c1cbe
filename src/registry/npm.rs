//! npm Registry adapter
//!
//! Fetches package version information from the npm registry.
//! API endpoint: https://registry.npmjs.org/{package}, or a private registry
//! with the same layout

use crate::domain::PackageManager;
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::collections::HashMap;

/// Public npm registry
pub(crate) const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// npm Registry adapter
pub struct NpmAdapter {
    client: HttpClient,
    base_url: String,
}

/// npm package metadata response
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    /// Version time information
    #[serde(default)]
    time: HashMap<String, String>,
    /// Available versions
    #[serde(default)]
    versions: HashMap<String, serde_json::Value>,
}

impl NpmAdapter {
    /// Create a new npm adapter
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, NPM_REGISTRY_URL)
    }

    /// Adapter for a registry at `base_url`
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a package
    ///
    /// Scoped packages keep their `@` but the slash is escaped, as the
    /// registry expects.
    fn build_url(&self, package: &str) -> String {
        format!("{}/{}", self.base_url, package.replace('/', "%2F"))
    }
}

fn collect_versions(response: NpmPackageResponse) -> Vec<VersionInfo> {
    let mut versions: Vec<VersionInfo> = response
        .versions
        .into_keys()
        .filter_map(|version| {
            let released_at = response.time.get(&version)?.parse::<DateTime<Utc>>().ok()?;
            Some(VersionInfo::new(version, released_at))
        })
        .collect();

    versions.sort();
    versions
}

#[async_trait]
impl RegistryAdapter for NpmAdapter {
    fn package_manager(&self) -> PackageManager {
        PackageManager::NpmAndYarn
    }

    fn registry_name(&self) -> &'static str {
        "npm"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let response: NpmPackageResponse = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        Ok(collect_versions(response))
    }
}
