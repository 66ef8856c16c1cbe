//! Run orchestrator
//!
//! Drives one pass of the pipeline through the collaborator traits:
//! fetch → parse → filter → check each dependency → publish (or skip).
//!
//! Per-dependency checks and the publish stage are guarded: their errors are
//! logged and swallowed unless the error policy is fail-fast. Fetch and parse
//! errors always abort the run.

use std::ops::ControlFlow;
use std::sync::Arc;

use crate::config::Config;
use crate::domain::{
    Dependency, DependencyFile, RequirementsToUnlock, SkipReason, UpdateResult, UpdatedDependency,
};
use crate::error::{ConfigError, RunError, ServiceError};
use crate::progress::Progress;
use crate::services::{
    CheckerRequest, Ecosystem, EcosystemRegistry, FetchedFiles, PullRequest, PullRequestCreator,
    PullRequestRequest, UpdateChecker,
};
use crate::update::{candidate_unlocks, UpdateBatch};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// No dependency produced an update
    UpToDate,
    /// A merge request was opened
    Published(PullRequest),
    /// Publishing failed and the error was swallowed
    PublishFailed(String),
    /// Updates were found but publishing was skipped
    DryRun,
}

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One result per dependency that entered the check loop, in order
    pub results: Vec<UpdateResult>,
    /// The accumulated update set
    pub updates: Vec<UpdatedDependency>,
    pub outcome: RunOutcome,
}

impl RunReport {
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Dependencies whose check failed and was swallowed
    pub fn failures(&self) -> impl Iterator<Item = &UpdateResult> {
        self.results.iter().filter(|r| {
            matches!(
                r,
                UpdateResult::Skip {
                    reason: SkipReason::Failed(_),
                    ..
                }
            )
        })
    }
}

/// Coordinates one run for the configured package manager
pub struct Orchestrator {
    config: Config,
    ecosystem: Arc<dyn Ecosystem>,
    creator: Arc<dyn PullRequestCreator>,
    dry_run: bool,
    show_progress: bool,
}

impl Orchestrator {
    /// Resolves the configured package manager's ecosystem
    pub fn new(
        config: Config,
        registry: &EcosystemRegistry,
        creator: Arc<dyn PullRequestCreator>,
    ) -> Result<Self, ConfigError> {
        let ecosystem = registry.resolve(config.package_manager)?;
        Ok(Self {
            config,
            ecosystem,
            creator,
            dry_run: false,
            show_progress: false,
        })
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Run the pipeline once
    pub async fn run(&self) -> Result<RunReport, RunError> {
        let mut progress = Progress::new(self.show_progress);
        let source = &self.config.source;
        let credentials = &self.config.credentials;
        let package_manager = self.config.package_manager;

        tracing::info!(
            "Fetching {} dependency files for {}",
            package_manager,
            source.repo
        );
        progress.spinner(&format!("Fetching {} dependency files", package_manager));
        let fetched = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(e) => {
                progress.finish_and_clear();
                return Err(RunError::Fetch(e));
            }
        };
        progress.finish_and_clear();
        tracing::debug!(
            files = fetched.files.len(),
            commit = %fetched.base_commit,
            "fetched dependency files"
        );

        tracing::info!("Parsing dependencies information");
        let dependencies = self
            .ecosystem
            .file_parser(&fetched.files, source, credentials)
            .parse()
            .map_err(RunError::Parse)?;
        let total = dependencies.len();
        let selected = self.config.filter.apply(dependencies);
        tracing::debug!(
            parsed = total,
            selected = selected.len(),
            "filtered dependencies"
        );

        progress.start(selected.len() as u64, "Checking dependencies");
        let mut results = Vec::with_capacity(selected.len());
        let mut batch = UpdateBatch::new();
        for dependency in selected {
            progress.set_message(&dependency.name);
            match self
                .check_step(batch, dependency, &fetched.files, &mut results, &progress)
                .await
            {
                ControlFlow::Continue(next) => batch = next,
                ControlFlow::Break(err) => {
                    progress.finish_and_clear();
                    return Err(err);
                }
            }
            progress.inc();
        }
        progress.finish_and_clear();

        let outcome = if batch.is_empty() {
            RunOutcome::UpToDate
        } else if self.dry_run {
            tracing::info!(updates = batch.len(), "dry run, not opening a merge request");
            RunOutcome::DryRun
        } else {
            progress.spinner("Opening merge request");
            let published = self.publish(&fetched, &batch).await;
            progress.finish_and_clear();
            match published {
                Ok(pull_request) => RunOutcome::Published(pull_request),
                Err(e) if self.config.error_policy.is_fail_fast() => {
                    return Err(RunError::Publish(e));
                }
                Err(e) => {
                    let names: Vec<&str> = batch.names().collect();
                    tracing::warn!(
                        error = %e,
                        "error updating {} (continuing)",
                        names.join(", ")
                    );
                    RunOutcome::PublishFailed(e.to_string())
                }
            }
        };

        Ok(RunReport {
            results,
            updates: batch.into_vec(),
            outcome,
        })
    }

    async fn fetch(&self) -> Result<FetchedFiles, ServiceError> {
        self.ecosystem
            .file_fetcher(&self.config.source, &self.config.credentials)?
            .fetch()
            .await
    }

    /// One iteration of the check loop: the extended batch, or an abort
    async fn check_step(
        &self,
        batch: UpdateBatch,
        dependency: Dependency,
        files: &[DependencyFile],
        results: &mut Vec<UpdateResult>,
        progress: &Progress,
    ) -> ControlFlow<RunError, UpdateBatch> {
        match self.check(&dependency, files).await {
            Ok(result) => {
                let batch = match &result {
                    UpdateResult::Update { updates, .. } => batch.extended(updates.iter().cloned()),
                    UpdateResult::Skip { .. } => batch,
                };
                results.push(result);
                ControlFlow::Continue(batch)
            }
            Err(e) if self.config.error_policy.is_fail_fast() => ControlFlow::Break(RunError::Check {
                dependency: dependency.name,
                source: e,
            }),
            Err(e) => {
                progress.suspend(|| {
                    tracing::warn!(error = %e, "error updating {} (continuing)", dependency.name)
                });
                results.push(UpdateResult::skip(
                    dependency,
                    SkipReason::Failed(e.to_string()),
                ));
                ControlFlow::Continue(batch)
            }
        }
    }

    async fn check(
        &self,
        dependency: &Dependency,
        files: &[DependencyFile],
    ) -> Result<UpdateResult, ServiceError> {
        let checker = self.ecosystem.update_checker(CheckerRequest {
            dependency: dependency.clone(),
            files: files.to_vec(),
            credentials: self.config.credentials.clone(),
            strategy: self.config.update_strategy,
            ignored: self
                .config
                .ignored_versions
                .for_dependency(&dependency.name)
                .to_vec(),
        });

        if checker.up_to_date().await? {
            tracing::debug!(dependency = %dependency.name, "up to date");
            return Ok(UpdateResult::skip(dependency.clone(), SkipReason::UpToDate));
        }

        let Some(unlock) = self.select_unlock(checker.as_ref()).await? else {
            tracing::debug!(dependency = %dependency.name, "no permitted unlock level");
            return Ok(UpdateResult::skip(
                dependency.clone(),
                SkipReason::NotUpdatable,
            ));
        };

        let updates = checker.updated_dependencies(unlock).await?;
        tracing::debug!(
            dependency = %dependency.name,
            unlock = %unlock,
            moved = updates.len(),
            "update found"
        );
        Ok(UpdateResult::update(dependency.clone(), unlock, updates))
    }

    /// First candidate unlock level the checker supports
    async fn select_unlock(
        &self,
        checker: &dyn UpdateChecker,
    ) -> Result<Option<RequirementsToUnlock>, ServiceError> {
        let candidates = candidate_unlocks(
            checker.requirements_unlocked_or_can_be(),
            &self.config.excluded_unlocks,
        );
        for unlock in candidates {
            if checker.can_update(unlock).await? {
                return Ok(Some(unlock));
            }
        }
        Ok(None)
    }

    async fn publish(
        &self,
        fetched: &FetchedFiles,
        batch: &UpdateBatch,
    ) -> Result<PullRequest, ServiceError> {
        let files = self
            .ecosystem
            .file_updater(&fetched.files, batch.as_slice(), &self.config.credentials)
            .updated_dependency_files()
            .await?;

        let request = PullRequestRequest {
            source: self.config.source.clone(),
            package_manager: self.config.package_manager,
            base_commit: fetched.base_commit.clone(),
            dependencies: batch.as_slice().to_vec(),
            files,
            credentials: self.config.credentials.clone(),
            label_language: self.config.package_manager.language_label().to_string(),
            assignees: self.config.assignees.clone(),
        };
        self.creator.create(&request).await
    }
}
