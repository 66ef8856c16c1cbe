//! kira-deps - dependency update merge requests for GitLab projects
//!
//! One run fetches a project's manifests from GitLab, checks the selected
//! dependencies against their registries and opens a single merge request
//! with every update it found. Supported package managers:
//! - Bundler (Gemfile, Gemfile.lock)
//! - Composer (composer.json)
//! - npm/yarn (package.json)

pub mod cli;
pub mod config;
pub mod domain;
pub mod ecosystem;
pub mod error;
pub mod gitlab;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod parser;
pub mod progress;
pub mod registry;
pub mod services;
pub mod update;
