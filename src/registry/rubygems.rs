//! RubyGems Registry adapter
//!
//! Fetches package version information from the RubyGems registry.
//! API endpoint: https://rubygems.org/api/v1/versions/{gem}.json, or the same
//! path on a private gem server

use crate::domain::PackageManager;
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryAdapter};
use crate::update::VersionInfo;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Public RubyGems host
pub(crate) const RUBYGEMS_URL: &str = "https://rubygems.org";

/// RubyGems Registry adapter
pub struct RubyGemsAdapter {
    client: HttpClient,
    base_url: String,
}

/// One entry of the versions endpoint
#[derive(Debug, Deserialize)]
struct GemVersion {
    number: String,
    created_at: Option<String>,
    #[serde(default)]
    platform: Option<String>,
}

impl RubyGemsAdapter {
    /// Create a new RubyGems adapter
    pub fn new(client: HttpClient) -> Self {
        Self::with_base_url(client, RUBYGEMS_URL)
    }

    /// Adapter for a gem server speaking the RubyGems API
    pub fn with_base_url(client: HttpClient, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build the URL for a gem
    fn build_url(&self, gem: &str) -> String {
        format!("{}/api/v1/versions/{}.json", self.base_url, gem)
    }
}

/// Keeps pure-Ruby releases; native builds repeat the same number per platform
fn collect_versions(entries: Vec<GemVersion>) -> Vec<VersionInfo> {
    let mut versions: Vec<VersionInfo> = entries
        .into_iter()
        .filter(|e| e.platform.as_deref().is_none_or(|p| p == "ruby"))
        .filter_map(|e| {
            let released_at = e.created_at?.parse::<DateTime<Utc>>().ok()?;
            Some(VersionInfo::new(e.number, released_at))
        })
        .collect();

    versions.sort();
    versions.dedup_by(|a, b| a.version == b.version);
    versions
}

#[async_trait]
impl RegistryAdapter for RubyGemsAdapter {
    fn package_manager(&self) -> PackageManager {
        PackageManager::Bundler
    }

    fn registry_name(&self) -> &'static str {
        "RubyGems"
    }

    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
        let url = self.build_url(package);
        let entries: Vec<GemVersion> = self
            .client
            .get_json(&url, package, self.registry_name())
            .await?;

        Ok(collect_versions(entries))
    }
}
