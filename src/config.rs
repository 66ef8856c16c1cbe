//! Run configuration from environment variables
//!
//! Every variable is read and validated once, before any network call.
//! Blank values count as unset.

use std::collections::HashMap;

use crate::domain::{
    Credential, Credentials, ExcludedUnlocks, IgnoredVersions, PackageManager,
    RequirementsUpdateStrategy, Source,
};
use crate::error::ConfigError;
use crate::update::DependencyFilter;

pub const GITLAB_HOSTNAME: &str = "GITLAB_HOSTNAME";
pub const GITHUB_TOKEN: &str = "KIRA_GITHUB_PERSONAL_TOKEN";
pub const GITLAB_TOKEN: &str = "KIRA_GITLAB_PERSONAL_TOKEN";
pub const EXTRA_CREDENTIALS: &str = "DEPENDABOT_EXTRA_CREDENTIALS";
pub const IGNORED_VERSIONS: &str = "DEPENDABOT_IGNORED_VERSIONS";
pub const PROJECT_PATH: &str = "DEPENDABOT_PROJECT_PATH";
pub const DIRECTORY: &str = "DEPENDABOT_DIRECTORY";
pub const UPDATE_STRATEGY: &str = "DEPENDABOT_UPDATE_STRATEGY";
pub const EXCLUDE_REQUIREMENTS_TO_UNLOCK: &str = "DEPENDABOT_EXCLUDE_REQUIREMENTS_TO_UNLOCK";
pub const FAIL_ON_EXCEPTION: &str = "KIRA_FAIL_ON_EXCEPTION";
pub const ASSIGNEE_GITLAB_ID: &str = "DEPENDABOT_ASSIGNEE_GITLAB_ID";
pub const PACKAGE_MANAGER: &str = "PACKAGE_MANAGER";
pub const SOURCE_BRANCH: &str = "DEPENDABOT_SOURCE_BRANCH";
pub const DEPENDENCIES: &str = "DEPENDENCIES";

const DEFAULT_GITLAB_HOSTNAME: &str = "gitlab.com";
const DEFAULT_DIRECTORY: &str = "/";
const DEFAULT_DEPENDENCIES: &str = "ft,phplib,ecom";
const GITHUB_HOSTNAME: &str = "github.com";

/// What happens when a guarded stage fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Log the error and carry on
    #[default]
    Continue,
    /// Abort the run with the error
    FailFast,
}

impl ErrorPolicy {
    pub fn is_fail_fast(&self) -> bool {
        matches!(self, ErrorPolicy::FailFast)
    }
}

/// Everything a run needs, parsed and validated
#[derive(Debug, Clone)]
pub struct Config {
    pub source: Source,
    pub credentials: Credentials,
    pub package_manager: PackageManager,
    pub ignored_versions: IgnoredVersions,
    pub update_strategy: RequirementsUpdateStrategy,
    pub excluded_unlocks: ExcludedUnlocks,
    pub error_policy: ErrorPolicy,
    pub assignees: Vec<u64>,
    pub filter: DependencyFilter,
}

impl Config {
    /// Reads the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let repo = value(PROJECT_PATH)
            .map(|v| v.trim().trim_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ConfigError::missing(PROJECT_PATH))?;

        let hostname = value(GITLAB_HOSTNAME)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_GITLAB_HOSTNAME.to_string());

        let directory = value(DIRECTORY)
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| DEFAULT_DIRECTORY.to_string());

        let branch = value(SOURCE_BRANCH).map(|v| v.trim().to_string());

        let package_manager = value(PACKAGE_MANAGER)
            .map(|v| v.trim().parse::<PackageManager>())
            .transpose()
            .map_err(|e| ConfigError::invalid_value(PACKAGE_MANAGER, e.to_string()))?
            .unwrap_or(PackageManager::Bundler);

        let mut credentials = vec![
            Credential::git_source(GITHUB_HOSTNAME, value(GITHUB_TOKEN)),
            Credential::git_source(hostname.clone(), value(GITLAB_TOKEN)),
        ];
        if let Some(raw) = value(EXTRA_CREDENTIALS) {
            let extra: Vec<Credential> = serde_json::from_str(&raw)
                .map_err(|e| ConfigError::invalid_json(EXTRA_CREDENTIALS, e))?;
            credentials.extend(extra);
        }

        let ignored_versions = match value(IGNORED_VERSIONS) {
            Some(raw) => {
                let map: HashMap<String, Vec<String>> = serde_json::from_str(&raw)
                    .map_err(|e| ConfigError::invalid_json(IGNORED_VERSIONS, e))?;
                IgnoredVersions::from_map(map)
                    .map_err(|e| ConfigError::invalid_value(IGNORED_VERSIONS, e.to_string()))?
            }
            None => IgnoredVersions::default(),
        };

        let update_strategy = value(UPDATE_STRATEGY)
            .map(|v| v.parse::<RequirementsUpdateStrategy>())
            .transpose()
            .map_err(|e| ConfigError::invalid_value(UPDATE_STRATEGY, e))?
            .unwrap_or_default();

        let excluded_unlocks = value(EXCLUDE_REQUIREMENTS_TO_UNLOCK)
            .map(|v| ExcludedUnlocks::parse(&v))
            .transpose()
            .map_err(|e| ConfigError::invalid_value(EXCLUDE_REQUIREMENTS_TO_UNLOCK, e))?
            .unwrap_or_default();

        let error_policy = if lookup(FAIL_ON_EXCEPTION).as_deref() == Some("true") {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::Continue
        };

        let assignees = match value(ASSIGNEE_GITLAB_ID) {
            Some(raw) => parse_assignees(&raw)?,
            None => Vec::new(),
        };

        // Unset means the default list; set but blank means no name filter
        let filter = match lookup(DEPENDENCIES) {
            Some(list) => DependencyFilter::from_list(&list),
            None => DependencyFilter::from_list(DEFAULT_DEPENDENCIES),
        };

        Ok(Self {
            source: Source::gitlab(hostname, repo, directory, branch),
            credentials: Credentials::new(credentials),
            package_manager,
            ignored_versions,
            update_strategy,
            excluded_unlocks,
            error_policy,
            assignees,
            filter,
        })
    }
}

fn parse_assignees(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>().map_err(|_| {
                ConfigError::invalid_value(
                    ASSIGNEE_GITLAB_ID,
                    format!("'{}' is not a numeric GitLab user id", s),
                )
            })
        })
        .collect()
}
