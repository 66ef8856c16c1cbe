//! Opens dependency merge requests on GitLab

use async_trait::async_trait;

use super::client::{CommitAction, GitLabClient, MergeRequestInfo, NewMergeRequest};
use super::message::MergeRequestMessage;
use crate::error::ServiceError;
use crate::services::{PullRequest, PullRequestCreator, PullRequestRequest};

const DEPENDENCIES_LABEL: &str = "dependencies";

/// Commits the updated files on a new branch cut from the base commit and
/// opens a merge request into the source branch
///
/// An update branch left behind by an earlier run gets its merge request
/// opened; a branch that already has one is refused.
pub struct GitLabMergeRequestCreator {
    client: Option<GitLabClient>,
}

impl GitLabMergeRequestCreator {
    /// Creator that builds its client from each request's source and credentials
    pub fn new() -> Self {
        Self { client: None }
    }

    /// Creator bound to an existing client
    pub fn with_client(client: GitLabClient) -> Self {
        Self {
            client: Some(client),
        }
    }

    fn client_for(&self, request: &PullRequestRequest) -> Result<GitLabClient, ServiceError> {
        match &self.client {
            Some(client) => Ok(client.clone()),
            None => Ok(GitLabClient::new(&request.source, &request.credentials)?),
        }
    }
}

impl Default for GitLabMergeRequestCreator {
    fn default() -> Self {
        Self::new()
    }
}

fn labels(label_language: &str) -> String {
    if label_language.is_empty() {
        DEPENDENCIES_LABEL.to_string()
    } else {
        format!("{},{}", DEPENDENCIES_LABEL, label_language)
    }
}

#[async_trait]
impl PullRequestCreator for GitLabMergeRequestCreator {
    async fn create(&self, request: &PullRequestRequest) -> Result<PullRequest, ServiceError> {
        let client = self.client_for(request)?;
        let message = MergeRequestMessage::build(
            request.package_manager,
            &request.source.directory,
            &request.dependencies,
        );

        let target_branch = match &request.source.branch {
            Some(branch) => branch.clone(),
            None => client.default_branch().await?,
        };
        let merge_request = NewMergeRequest {
            source_branch: message.branch.clone(),
            target_branch,
            title: message.title,
            description: message.description,
            labels: labels(&request.label_language),
            assignee_ids: request.assignees.clone(),
            remove_source_branch: true,
        };

        if client.branch_exists(&message.branch).await? {
            if !client.open_merge_requests(&message.branch).await?.is_empty() {
                return Err(ServiceError::BranchAlreadyExists {
                    branch: message.branch,
                });
            }
            tracing::info!(branch = %message.branch, "reusing update branch without a merge request");
            let created = client.create_merge_request(&merge_request).await?;
            return Ok(opened(created, message.branch));
        }

        let actions: Vec<CommitAction> = request
            .files
            .iter()
            .map(|file| CommitAction::update(file.path(), file.content.as_str()))
            .collect();
        let commit = client
            .create_commit(
                &message.branch,
                Some(request.base_commit.as_str()),
                &message.commit_message,
                &actions,
            )
            .await?;
        tracing::debug!(branch = %message.branch, commit = %commit, "committed updated files");

        let created = match client.create_merge_request(&merge_request).await {
            Ok(created) => created,
            Err(err) => {
                if let Err(cleanup) = client.delete_branch(&message.branch).await {
                    tracing::warn!(branch = %message.branch, error = %cleanup, "failed to delete update branch");
                }
                return Err(err.into());
            }
        };
        Ok(opened(created, message.branch))
    }
}

fn opened(created: MergeRequestInfo, branch: String) -> PullRequest {
    tracing::info!(iid = created.iid, url = %created.web_url, "merge request opened");
    PullRequest {
        iid: created.iid,
        web_url: created.web_url,
        branch,
    }
}
