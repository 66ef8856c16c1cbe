//! GitLab REST API client
//!
//! Covers the handful of v4 endpoints the fetcher and the merge-request
//! creator need. Reads are retried with exponential backoff; writes are sent
//! once.

use crate::domain::{Credentials, Source, GIT_SOURCE};
use crate::error::SourceError;
use crate::registry::{BASE_DELAY_MS, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, MAX_RETRIES};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::form_urlencoded;

const TOKEN_HEADER: &str = "PRIVATE-TOKEN";
const NEXT_PAGE_HEADER: &str = "x-next-page";
const PER_PAGE: &str = "100";

/// Upper bound on followed tree pages
const MAX_PAGES: u32 = 50;

/// Percent-encode one path segment, `/` included
pub(crate) fn encode_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[derive(Debug, Deserialize)]
struct ProjectInfo {
    default_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BranchInfo {
    commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
struct CommitInfo {
    id: String,
}

/// One entry of a repository tree listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub path: String,
}

impl TreeEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "blob"
    }
}

/// A file change inside a commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitAction {
    pub action: &'static str,
    pub file_path: String,
    pub content: String,
}

impl CommitAction {
    pub fn update(file_path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            action: "update",
            file_path: file_path.into(),
            content: content.into(),
        }
    }
}

/// Body of `POST /projects/:id/repository/commits`
///
/// With `start_sha` set, GitLab creates `branch` from that commit in the
/// same request.
#[derive(Debug, Serialize)]
struct NewCommit<'a> {
    branch: &'a str,
    commit_message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    start_sha: Option<&'a str>,
    actions: &'a [CommitAction],
}

/// Body of `POST /projects/:id/merge_requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewMergeRequest {
    pub source_branch: String,
    pub target_branch: String,
    pub title: String,
    pub description: String,
    /// Comma-separated label names
    pub labels: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub assignee_ids: Vec<u64>,
    pub remove_source_branch: bool,
}

/// The parts of a created merge request we report
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MergeRequestInfo {
    pub iid: u64,
    pub web_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(serde_json::Value::String(message)),
            ..
        }) => message,
        Ok(ErrorBody {
            message: Some(other),
            ..
        }) => other.to_string(),
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        _ => body.chars().take(200).collect(),
    }
}

/// Authenticated client bound to one project
#[derive(Clone)]
pub struct GitLabClient {
    client: Client,
    api_endpoint: String,
    project_id: String,
    token: String,
    max_retries: u32,
}

impl GitLabClient {
    /// Client for the project `source` points at
    ///
    /// Authenticates with the `git_source` credential for the source host.
    pub fn new(source: &Source, credentials: &Credentials) -> Result<Self, SourceError> {
        let token = credentials
            .for_host(GIT_SOURCE, &source.hostname)
            .and_then(|c| c.secret())
            .ok_or_else(|| SourceError::MissingCredential {
                host: source.hostname.clone(),
            })?;
        Self::with_endpoint(&source.api_endpoint, &source.repo, token)
    }

    /// Client for an explicit API endpoint
    pub fn with_endpoint(
        api_endpoint: &str,
        project_path: &str,
        token: &str,
    ) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .user_agent(DEFAULT_USER_AGENT)
            .build()
            .map_err(|e| {
                SourceError::network("BUILD", api_endpoint, format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_endpoint: api_endpoint.trim_end_matches('/').to_string(),
            project_id: encode_segment(project_path),
            token: token.to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    /// Set the maximum number of retries for reads
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn project_path(&self, suffix: &str) -> String {
        format!("/projects/{}{}", self.project_id, suffix)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_endpoint, path)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<reqwest::Response, SourceError> {
        let mut request = self
            .client
            .request(method.clone(), self.url(path))
            .header(TOKEN_HEADER, &self.token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            let message = if e.is_timeout() {
                "request timed out".to_string()
            } else {
                e.to_string()
            };
            SourceError::network(method.as_str(), path, message)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        Err(SourceError::http_status(
            method.as_str(),
            path,
            status.as_u16(),
            error_message(&text),
        ))
    }

    /// GET with retry on network errors, rate limiting and server errors
    async fn get(&self, path: &str) -> Result<reqwest::Response, SourceError> {
        let mut delay = BASE_DELAY_MS;
        let mut attempt = 0;

        loop {
            tracing::debug!(path, attempt, "gitlab request");
            let result = self.send(Method::GET, path, None).await;
            let retryable = match &result {
                Ok(_) => false,
                Err(SourceError::Network { .. }) => true,
                Err(err) => err.status().is_some_and(|s| {
                    s == StatusCode::TOO_MANY_REQUESTS.as_u16() || s >= 500
                }),
            };

            if !retryable || attempt >= self.max_retries {
                return result;
            }
            tokio::time::sleep(Duration::from_millis(delay)).await;
            delay *= 2;
            attempt += 1;
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, SourceError> {
        self.get(path)
            .await?
            .json::<T>()
            .await
            .map_err(|e| SourceError::decode(path, e.to_string()))
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, SourceError> {
        let body = serde_json::to_value(body).map_err(|e| SourceError::decode(path, e.to_string()))?;
        tracing::debug!(path, "gitlab write");
        self.send(Method::POST, path, Some(&body))
            .await?
            .json::<T>()
            .await
            .map_err(|e| SourceError::decode(path, e.to_string()))
    }

    /// The project's default branch
    pub async fn default_branch(&self) -> Result<String, SourceError> {
        let path = self.project_path("");
        let project: ProjectInfo = self.get_json(&path).await?;
        project
            .default_branch
            .ok_or_else(|| SourceError::decode(path, "project has no default branch"))
    }

    /// Head commit of `branch`
    pub async fn branch_commit(&self, branch: &str) -> Result<String, SourceError> {
        let path = self.project_path(&format!("/repository/branches/{}", encode_segment(branch)));
        let info: BranchInfo = self.get_json(&path).await?;
        Ok(info.commit.id)
    }

    /// Whether `branch` exists
    pub async fn branch_exists(&self, branch: &str) -> Result<bool, SourceError> {
        match self.branch_commit(branch).await {
            Ok(_) => Ok(true),
            Err(err) if err.status() == Some(StatusCode::NOT_FOUND.as_u16()) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Entries directly inside `directory` at `reference`, every page
    pub async fn tree(&self, directory: &str, reference: &str) -> Result<Vec<TreeEntry>, SourceError> {
        let directory = directory.trim_matches('/');
        let mut entries = Vec::new();
        let mut page = "1".to_string();

        for _ in 0..MAX_PAGES {
            let query = {
                let mut query = form_urlencoded::Serializer::new(String::new());
                if !directory.is_empty() {
                    query.append_pair("path", directory);
                }
                query.append_pair("ref", reference);
                query.append_pair("per_page", PER_PAGE);
                query.append_pair("page", &page);
                query.finish()
            };
            let path = self.project_path(&format!("/repository/tree?{}", query));

            let response = self.get(&path).await?;
            let next_page = response
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from);
            let batch: Vec<TreeEntry> = response
                .json()
                .await
                .map_err(|e| SourceError::decode(&path, e.to_string()))?;
            entries.extend(batch);

            match next_page {
                Some(next) => page = next,
                None => return Ok(entries),
            }
        }

        tracing::warn!(directory, pages = MAX_PAGES, "tree listing truncated");
        Ok(entries)
    }

    /// Raw content of `file_path` at `reference`
    pub async fn raw_file(&self, file_path: &str, reference: &str) -> Result<String, SourceError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("ref", reference)
            .finish();
        let path = self.project_path(&format!(
            "/repository/files/{}/raw?{}",
            encode_segment(file_path),
            query
        ));
        self.get(&path)
            .await?
            .text()
            .await
            .map_err(|e| SourceError::decode(path, e.to_string()))
    }

    /// Delete `branch`
    pub async fn delete_branch(&self, branch: &str) -> Result<(), SourceError> {
        let path = self.project_path(&format!("/repository/branches/{}", encode_segment(branch)));
        tracing::debug!(path, "gitlab write");
        self.send(Method::DELETE, &path, None).await?;
        Ok(())
    }

    /// Commit `actions` on `branch`, returning the new commit id
    ///
    /// `start_sha` creates the branch from that commit; `None` commits on an
    /// existing branch.
    pub async fn create_commit(
        &self,
        branch: &str,
        start_sha: Option<&str>,
        commit_message: &str,
        actions: &[CommitAction],
    ) -> Result<String, SourceError> {
        let path = self.project_path("/repository/commits");
        let commit: CommitInfo = self
            .post_json(
                &path,
                &NewCommit {
                    branch,
                    commit_message,
                    start_sha,
                    actions,
                },
            )
            .await?;
        Ok(commit.id)
    }

    /// Open merge requests whose source is `branch`
    pub async fn open_merge_requests(
        &self,
        branch: &str,
    ) -> Result<Vec<MergeRequestInfo>, SourceError> {
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("source_branch", branch)
            .append_pair("state", "opened")
            .finish();
        let path = self.project_path(&format!("/merge_requests?{}", query));
        self.get_json(&path).await
    }

    pub async fn create_merge_request(
        &self,
        request: &NewMergeRequest,
    ) -> Result<MergeRequestInfo, SourceError> {
        let path = self.project_path("/merge_requests");
        self.post_json(&path, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Credential;
    use mockito::Matcher;

    fn client(server: &mockito::Server) -> GitLabClient {
        GitLabClient::with_endpoint(&format!("{}/api/v4", server.url()), "acme/shop", "secret")
            .unwrap()
            .with_max_retries(1)
    }

    #[test]
    fn test_encode_segment() {
        assert_eq!(encode_segment("acme/shop"), "acme%2Fshop");
        assert_eq!(encode_segment("app/Gemfile.lock"), "app%2FGemfile.lock");
        assert_eq!(encode_segment("my dir/a"), "my%20dir%2Fa");
    }

    #[test]
    fn test_new_requires_credential() {
        let source = Source::gitlab("gitlab.example.com", "acme/shop", "/", None);
        let other = Credentials::new(vec![Credential::git_source(
            "github.com",
            Some("gh".to_string()),
        )]);
        assert!(matches!(
            GitLabClient::new(&source, &other),
            Err(SourceError::MissingCredential { .. })
        ));

        let empty_token = Credentials::new(vec![Credential::git_source(
            "gitlab.example.com",
            Some(String::new()),
        )]);
        assert!(GitLabClient::new(&source, &empty_token).is_err());

        let matching = Credentials::new(vec![Credential::git_source(
            "gitlab.example.com",
            Some("glpat".to_string()),
        )]);
        assert!(GitLabClient::new(&source, &matching).is_ok());
    }

    #[test]
    fn test_error_message() {
        assert_eq!(error_message(r#"{"message":"404 Project Not Found"}"#), "404 Project Not Found");
        assert_eq!(error_message(r#"{"error":"invalid_token"}"#), "invalid_token");
        assert_eq!(
            error_message(r#"{"message":{"ref":["is missing"]}}"#),
            r#"{"ref":["is missing"]}"#
        );
        assert_eq!(error_message("Bad gateway"), "Bad gateway");
    }

    #[test]
    fn test_merge_request_body() {
        let body = NewMergeRequest {
            source_branch: "dependabot/bundler/rails-7.1.2".to_string(),
            target_branch: "main".to_string(),
            title: "Bump rails from 7.0.4 to 7.1.2".to_string(),
            description: "body".to_string(),
            labels: "dependencies,ruby".to_string(),
            assignee_ids: vec![],
            remove_source_branch: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("assignee_ids").is_none());
        assert_eq!(json["remove_source_branch"], true);
    }

    #[tokio::test]
    async fn test_default_branch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop")
            .match_header("PRIVATE-TOKEN", "secret")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 7, "default_branch": "main"}"#)
            .create_async()
            .await;

        assert_eq!(client(&server).default_branch().await.unwrap(), "main");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_branch_exists_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/repository/branches/dependabot%2Fbundler%2Frails-7.1.2")
            .with_status(404)
            .with_body(r#"{"message":"404 Branch Not Found"}"#)
            .create_async()
            .await;

        let exists = client(&server)
            .branch_exists("dependabot/bundler/rails-7.1.2")
            .await
            .unwrap();
        assert!(!exists);
    }

    #[tokio::test]
    async fn test_raw_file_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/repository/files/Gemfile/raw")
            .match_query(Matcher::UrlEncoded("ref".into(), "main".into()))
            .with_status(403)
            .with_body(r#"{"message":"403 Forbidden"}"#)
            .create_async()
            .await;

        let err = client(&server).raw_file("Gemfile", "main").await.unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("403 Forbidden"));
    }

    #[tokio::test]
    async fn test_get_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop")
            .with_status(502)
            .expect(2)
            .create_async()
            .await;

        let err = client(&server).default_branch().await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_tree_listing() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/repository/tree")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("path".into(), "app".into()),
                Matcher::UrlEncoded("ref".into(), "main".into()),
            ]))
            .with_status(200)
            .with_body(
                r#"[{"id":"a","name":"Gemfile","type":"blob","path":"app/Gemfile","mode":"100644"},
                    {"id":"b","name":"lib","type":"tree","path":"app/lib","mode":"040000"}]"#,
            )
            .create_async()
            .await;

        let entries = client(&server).tree("/app/", "main").await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].is_file());
        assert!(!entries[1].is_file());
    }

    #[tokio::test]
    async fn test_create_commit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v4/projects/acme%2Fshop/repository/commits")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "branch": "dependabot/bundler/rails-7.1.2",
                "start_sha": "c0ffee",
                "commit_message": "Bump rails"
            })))
            .with_status(201)
            .with_body(r#"{"id":"abc123","short_id":"abc"}"#)
            .create_async()
            .await;

        let id = client(&server)
            .create_commit(
                "dependabot/bundler/rails-7.1.2",
                Some("c0ffee"),
                "Bump rails",
                &[CommitAction::update("Gemfile", "gem 'rails'\n")],
            )
            .await
            .unwrap();
        assert_eq!(id, "abc123");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_tree_follows_next_page() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/repository/tree")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ref".into(), "main".into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "2")
            .with_body(r#"[{"name":"README.md","type":"blob","path":"README.md"}]"#)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/repository/tree")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("ref".into(), "main".into()),
                Matcher::UrlEncoded("page".into(), "2".into()),
            ]))
            .with_status(200)
            .with_header("x-next-page", "")
            .with_body(r#"[{"name":"Gemfile","type":"blob","path":"Gemfile"}]"#)
            .create_async()
            .await;

        let entries = client(&server).tree("/", "main").await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["README.md", "Gemfile"]);
        first.assert_async().await;
        second.assert_async().await;
    }

    #[tokio::test]
    async fn test_open_merge_requests() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v4/projects/acme%2Fshop/merge_requests")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("source_branch".into(), "dependabot/bundler/rails-7.1.2".into()),
                Matcher::UrlEncoded("state".into(), "opened".into()),
            ]))
            .with_status(200)
            .with_body(r#"[{"iid":3,"web_url":"https://gitlab.example.com/acme/shop/-/merge_requests/3"}]"#)
            .create_async()
            .await;

        let open = client(&server)
            .open_merge_requests("dependabot/bundler/rails-7.1.2")
            .await
            .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].iid, 3);
    }

    #[tokio::test]
    async fn test_delete_branch() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/api/v4/projects/acme%2Fshop/repository/branches/dependabot%2Fbundler%2Frails-7.1.2")
            .with_status(204)
            .create_async()
            .await;

        client(&server)
            .delete_branch("dependabot/bundler/rails-7.1.2")
            .await
            .unwrap();
        mock.assert_async().await;
    }
}
