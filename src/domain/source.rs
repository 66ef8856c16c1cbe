//! Repository source descriptor

use serde::{Deserialize, Serialize};

/// Where the dependency files live and where the merge request goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Hosting provider, always `gitlab`
    pub provider: String,
    /// GitLab hostname
    pub hostname: String,
    /// REST API base URL
    pub api_endpoint: String,
    /// Project path (`namespace/project`)
    pub repo: String,
    /// Directory holding the manifests
    pub directory: String,
    /// Branch to read from and target; project default when `None`
    pub branch: Option<String>,
}

impl Source {
    /// Builds a GitLab source; the API endpoint is derived from the hostname
    pub fn gitlab(
        hostname: impl Into<String>,
        repo: impl Into<String>,
        directory: impl Into<String>,
        branch: Option<String>,
    ) -> Self {
        let hostname = hostname.into();
        Self {
            provider: "gitlab".to_string(),
            api_endpoint: format!("https://{}/api/v4", hostname),
            hostname,
            repo: repo.into(),
            directory: directory.into(),
            branch,
        }
    }

    /// Web URL of the project
    pub fn url(&self) -> String {
        format!("https://{}/{}", self.hostname, self.repo)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gitlab_source() {
        let source = Source::gitlab("gitlab.example.com", "team/app", "/", None);
        assert_eq!(source.provider, "gitlab");
        assert_eq!(source.api_endpoint, "https://gitlab.example.com/api/v4");
        assert_eq!(source.url(), "https://gitlab.example.com/team/app");
        assert!(source.branch.is_none());
    }
}
