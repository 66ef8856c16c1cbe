//! GitLab integration
//!
//! This module provides:
//! - A REST client for the project endpoints we use
//! - A file fetcher reading manifests and lockfiles from a project
//! - A merge-request creator and the text it writes

mod client;
mod fetcher;
mod merge_request;
mod message;

pub use client::{CommitAction, GitLabClient, MergeRequestInfo, NewMergeRequest, TreeEntry};
pub use fetcher::GitLabFileFetcher;
pub use merge_request::GitLabMergeRequestCreator;
pub use message::MergeRequestMessage;
