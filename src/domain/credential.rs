//! Registry and git-host credentials

use serde::{Deserialize, Serialize};
use std::fmt;

/// Credential type used for git hosting providers
pub const GIT_SOURCE: &str = "git_source";

/// Private gem server
pub const RUBYGEMS_SERVER: &str = "rubygems_server";

/// Private Composer repository
pub const COMPOSER_REPOSITORY: &str = "composer_repository";

/// Private npm registry
pub const NPM_REGISTRY: &str = "npm_registry";

/// A single credential entry
///
/// Mirrors the JSON objects accepted in `DEPENDABOT_EXTRA_CREDENTIALS`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Registry host and path, as npm registry entries write it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Credential {
    /// A `git_source` credential authenticating with an access token
    pub fn git_source(host: impl Into<String>, password: Option<String>) -> Self {
        Self {
            kind: GIT_SOURCE.to_string(),
            host: Some(host.into()),
            registry: None,
            url: None,
            username: Some("x-access-token".to_string()),
            password,
            token: None,
        }
    }

    /// The secret carried by this credential, password first
    pub fn secret(&self) -> Option<&str> {
        [&self.password, &self.token]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|s| !s.is_empty())
    }

    /// Where the credential applies: `url`, then `registry`, then `host`
    pub fn endpoint(&self) -> Option<&str> {
        [&self.url, &self.registry, &self.host]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("registry", &self.registry)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .finish()
    }
}

/// The credential list handed to every collaborator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials(Vec<Credential>);

impl Credentials {
    pub fn new(credentials: Vec<Credential>) -> Self {
        Self(credentials)
    }

    /// Every credential of `kind`, in configuration order
    pub fn of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Credential> + 'a {
        self.0.iter().filter(move |c| c.kind == kind)
    }

    /// First credential of `kind` registered for `host`
    pub fn for_host(&self, kind: &str, host: &str) -> Option<&Credential> {
        self.0
            .iter()
            .find(|c| c.kind == kind && c.host.as_deref().is_some_and(|h| h.eq_ignore_ascii_case(host)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Credential>> for Credentials {
    fn from(credentials: Vec<Credential>) -> Self {
        Self(credentials)
    }
}
