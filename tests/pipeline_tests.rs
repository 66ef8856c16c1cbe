//! Pipeline tests for kira-deps
//!
//! These tests drive the orchestrator against mock collaborators and verify:
//! - Dependency selection (name allow-list vs top-level only)
//! - Unlock level ordering and exclusions
//! - Error continuation and fail-fast aborts
//! - The publish stage and its skip conditions

use async_trait::async_trait;
use kira_deps::config::{self, Config};
use kira_deps::domain::{
    Credentials, Dependency, DependencyFile, PackageManager, RequirementsToUnlock, SkipReason,
    Source, UpdateResult, UpdatedDependency, VersionSpec, VersionSpecKind,
};
use kira_deps::error::{ConfigError, RegistryError, RunError, ServiceError};
use kira_deps::orchestrator::{Orchestrator, RunOutcome, RunReport};
use kira_deps::services::{
    CheckerRequest, Ecosystem, EcosystemRegistry, FetchedFiles, FileFetcher, FileParser,
    FileUpdater, PullRequest, PullRequestCreator, PullRequestRequest, UpdateChecker,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use kira_deps::domain::RequirementsToUnlock::{All, None as Locked, Own};

/// Everything the collaborators were asked to do
#[derive(Default)]
struct Calls {
    up_to_date: Vec<String>,
    can_update: Vec<(String, RequirementsToUnlock)>,
    updated: Vec<(String, RequirementsToUnlock)>,
    ignored: Vec<(String, usize)>,
    file_updates: Vec<Vec<String>>,
    pull_requests: Vec<PullRequestRequest>,
}

type Log = Arc<Mutex<Calls>>;

#[derive(Clone)]
struct Behavior {
    up_to_date: bool,
    unlockable: bool,
    supports: Vec<RequirementsToUnlock>,
    fails: bool,
    /// Other dependencies the update drags along
    also: Vec<&'static str>,
}

impl Behavior {
    fn outdated() -> Self {
        Self {
            up_to_date: false,
            unlockable: true,
            supports: vec![Locked, Own, All],
            fails: false,
            also: Vec::new(),
        }
    }

    fn current() -> Self {
        Self {
            up_to_date: true,
            ..Self::outdated()
        }
    }

    fn failing() -> Self {
        Self {
            fails: true,
            ..Self::outdated()
        }
    }

    fn supports(mut self, supports: &[RequirementsToUnlock]) -> Self {
        self.supports = supports.to_vec();
        self
    }

    fn requirements_locked(mut self) -> Self {
        self.unlockable = false;
        self
    }

    fn also(mut self, names: &[&'static str]) -> Self {
        self.also = names.to_vec();
        self
    }
}

fn tilde(version: &str) -> VersionSpec {
    VersionSpec::new(VersionSpecKind::Tilde, format!("~> {}", version), version).with_prefix("~> ")
}

fn top_level(name: &str) -> Dependency {
    Dependency::new(name, tilde("1.0"), PackageManager::Bundler).with_version("1.0.0")
}

fn transitive(name: &str) -> Dependency {
    Dependency::transitive(name, "1.0.0", PackageManager::Bundler)
}

struct MockEcosystem {
    dependencies: Vec<Dependency>,
    behaviors: HashMap<String, Behavior>,
    fetch_fails: bool,
    parse_fails: bool,
    log: Log,
}

impl MockEcosystem {
    fn new(log: &Log) -> Self {
        Self {
            dependencies: Vec::new(),
            behaviors: HashMap::new(),
            fetch_fails: false,
            parse_fails: false,
            log: log.clone(),
        }
    }

    fn with(mut self, dependency: Dependency, behavior: Behavior) -> Self {
        self.behaviors.insert(dependency.name.clone(), behavior);
        self.dependencies.push(dependency);
        self
    }
}

impl Ecosystem for MockEcosystem {
    fn package_manager(&self) -> PackageManager {
        PackageManager::Bundler
    }

    fn file_fetcher(
        &self,
        _source: &Source,
        _credentials: &Credentials,
    ) -> Result<Box<dyn FileFetcher>, ServiceError> {
        Ok(Box::new(MockFetcher {
            fails: self.fetch_fails,
        }))
    }

    fn file_parser(
        &self,
        files: &[DependencyFile],
        _source: &Source,
        _credentials: &Credentials,
    ) -> Box<dyn FileParser> {
        assert_eq!(files.len(), 2, "parser receives the fetched files");
        Box::new(MockParser {
            dependencies: self.dependencies.clone(),
            fails: self.parse_fails,
        })
    }

    fn update_checker(&self, request: CheckerRequest) -> Box<dyn UpdateChecker> {
        self.log
            .lock()
            .unwrap()
            .ignored
            .push((request.dependency.name.clone(), request.ignored.len()));
        let behavior = self
            .behaviors
            .get(&request.dependency.name)
            .cloned()
            .unwrap_or_else(Behavior::current);
        Box::new(MockChecker {
            dependency: request.dependency,
            behavior,
            log: self.log.clone(),
        })
    }

    fn file_updater(
        &self,
        files: &[DependencyFile],
        updates: &[UpdatedDependency],
        _credentials: &Credentials,
    ) -> Box<dyn FileUpdater> {
        Box::new(MockUpdater {
            files: files.to_vec(),
            names: updates.iter().map(|u| u.name().to_string()).collect(),
            log: self.log.clone(),
        })
    }
}

struct MockFetcher {
    fails: bool,
}

#[async_trait]
impl FileFetcher for MockFetcher {
    async fn fetch(&self) -> Result<FetchedFiles, ServiceError> {
        if self.fails {
            return Err(ServiceError::file_not_found("Gemfile"));
        }
        Ok(FetchedFiles {
            files: vec![
                DependencyFile::new("Gemfile", "/", "gem 'ft-core', '~> 1.0'\n"),
                DependencyFile::new("Gemfile.lock", "/", "GEM\n  specs:\n"),
            ],
            base_commit: "abc123".to_string(),
        })
    }
}

struct MockParser {
    dependencies: Vec<Dependency>,
    fails: bool,
}

impl FileParser for MockParser {
    fn parse(&self) -> Result<Vec<Dependency>, ServiceError> {
        if self.fails {
            return Err(ServiceError::file_not_found("Gemfile.lock"));
        }
        Ok(self.dependencies.clone())
    }
}

struct MockChecker {
    dependency: Dependency,
    behavior: Behavior,
    log: Log,
}

#[async_trait]
impl UpdateChecker for MockChecker {
    async fn up_to_date(&self) -> Result<bool, ServiceError> {
        self.log
            .lock()
            .unwrap()
            .up_to_date
            .push(self.dependency.name.clone());
        if self.behavior.fails {
            return Err(
                RegistryError::network_error(&self.dependency.name, "RubyGems", "connection reset")
                    .into(),
            );
        }
        Ok(self.behavior.up_to_date)
    }

    fn requirements_unlocked_or_can_be(&self) -> bool {
        self.behavior.unlockable
    }

    async fn can_update(&self, unlock: RequirementsToUnlock) -> Result<bool, ServiceError> {
        self.log
            .lock()
            .unwrap()
            .can_update
            .push((self.dependency.name.clone(), unlock));
        Ok(self.behavior.supports.contains(&unlock))
    }

    async fn updated_dependencies(
        &self,
        unlock: RequirementsToUnlock,
    ) -> Result<Vec<UpdatedDependency>, ServiceError> {
        self.log
            .lock()
            .unwrap()
            .updated
            .push((self.dependency.name.clone(), unlock));
        if !self.behavior.supports.contains(&unlock) {
            return Err(ServiceError::update_not_possible(&self.dependency.name, unlock));
        }
        let mut updates = vec![UpdatedDependency::new(
            self.dependency.clone(),
            "2.0.0",
            tilde("2.0"),
        )];
        updates.extend(self.behavior.also.iter().map(|name| {
            UpdatedDependency::new(transitive(name), "1.1.0", VersionSpec::any())
        }));
        Ok(updates)
    }
}

struct MockUpdater {
    files: Vec<DependencyFile>,
    names: Vec<String>,
    log: Log,
}

#[async_trait]
impl FileUpdater for MockUpdater {
    async fn updated_dependency_files(&self) -> Result<Vec<DependencyFile>, ServiceError> {
        self.log.lock().unwrap().file_updates.push(self.names.clone());
        Ok(self
            .files
            .iter()
            .map(|f| f.with_content(format!("{}# updated\n", f.content)))
            .collect())
    }
}

struct MockCreator {
    fails: bool,
    log: Log,
}

#[async_trait]
impl PullRequestCreator for MockCreator {
    async fn create(&self, request: &PullRequestRequest) -> Result<PullRequest, ServiceError> {
        self.log.lock().unwrap().pull_requests.push(request.clone());
        if self.fails {
            return Err(ServiceError::BranchAlreadyExists {
                branch: "dependabot/bundler/ft-core-2.0.0".to_string(),
            });
        }
        Ok(PullRequest {
            iid: 42,
            web_url: "https://gitlab.example.com/acme/shop/-/merge_requests/42".to_string(),
            branch: "dependabot/bundler/ft-core-2.0.0".to_string(),
        })
    }
}

fn config(vars: &[(&str, &str)]) -> Config {
    let mut map: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    map.entry(config::PROJECT_PATH.to_string())
        .or_insert_with(|| "acme/shop".to_string());
    map.entry(config::GITLAB_HOSTNAME.to_string())
        .or_insert_with(|| "gitlab.example.com".to_string());
    Config::from_lookup(|name| map.get(name).cloned()).unwrap()
}

struct Run {
    result: Result<RunReport, RunError>,
    log: Log,
}

impl Run {
    fn report(&self) -> &RunReport {
        self.result.as_ref().expect("run succeeds")
    }

    fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
        self.log.lock().unwrap()
    }
}

async fn run_with(
    vars: &[(&str, &str)],
    build: impl FnOnce(MockEcosystem) -> MockEcosystem,
    creator_fails: bool,
    dry_run: bool,
) -> Run {
    let log: Log = Arc::default();
    let ecosystem = build(MockEcosystem::new(&log));
    let registry = EcosystemRegistry::new().register(Arc::new(ecosystem));
    let creator = Arc::new(MockCreator {
        fails: creator_fails,
        log: log.clone(),
    });
    let orchestrator = Orchestrator::new(config(vars), &registry, creator)
        .unwrap()
        .with_dry_run(dry_run);
    Run {
        result: orchestrator.run().await,
        log,
    }
}

async fn run(
    vars: &[(&str, &str)],
    build: impl FnOnce(MockEcosystem) -> MockEcosystem,
) -> Run {
    run_with(vars, build, false, false).await
}

mod selection {
    use super::*;

    #[tokio::test]
    async fn test_default_list_matches_substrings_case_insensitively() {
        let run = run(&[], |eco| {
            eco.with(top_level("FT-Core"), Behavior::current())
                .with(top_level("rails"), Behavior::current())
                .with(top_level("acme-phplib-http"), Behavior::current())
                .with(transitive("ecom-api"), Behavior::current())
        })
        .await;

        assert_eq!(
            run.calls().up_to_date,
            vec!["FT-Core", "acme-phplib-http", "ecom-api"]
        );
        assert_eq!(run.report().results.len(), 3);
    }

    #[tokio::test]
    async fn test_blank_list_selects_top_level_only() {
        let run = run(&[(config::DEPENDENCIES, "  ")], |eco| {
            eco.with(top_level("rails"), Behavior::current())
                .with(transitive("rack"), Behavior::current())
                .with(top_level("ft-core"), Behavior::current())
        })
        .await;

        assert_eq!(run.calls().up_to_date, vec!["rails", "ft-core"]);
    }

    #[tokio::test]
    async fn test_ignored_versions_reach_the_checker() {
        let run = run(
            &[(
                config::IGNORED_VERSIONS,
                r#"{"ft-core": [">= 3.0", "2.0.1"]}"#,
            )],
            |eco| {
                eco.with(top_level("ft-core"), Behavior::current())
                    .with(top_level("ft-search"), Behavior::current())
            },
        )
        .await;

        assert_eq!(
            run.calls().ignored,
            vec![("ft-core".to_string(), 2), ("ft-search".to_string(), 0)]
        );
    }
}

mod update_loop {
    use super::*;

    #[tokio::test]
    async fn test_up_to_date_dependency_is_not_updated() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::current())
        })
        .await;

        let calls = run.calls();
        assert!(calls.can_update.is_empty());
        assert!(calls.updated.is_empty());
        assert!(matches!(
            &run.report().results[0],
            UpdateResult::Skip {
                reason: SkipReason::UpToDate,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_first_supported_unlock_wins() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::outdated().supports(&[Own, All]))
        })
        .await;

        let calls = run.calls();
        assert_eq!(
            calls.can_update,
            vec![("ft-core".to_string(), Locked), ("ft-core".to_string(), Own)]
        );
        assert_eq!(calls.updated, vec![("ft-core".to_string(), Own)]);
    }

    #[tokio::test]
    async fn test_lockfile_move_preferred_when_possible() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::outdated())
        })
        .await;

        assert_eq!(run.calls().updated, vec![("ft-core".to_string(), Locked)]);
        assert!(matches!(
            &run.report().results[0],
            UpdateResult::Update { unlock: Locked, .. }
        ));
    }

    #[tokio::test]
    async fn test_excluded_unlocks_are_not_tried() {
        let run = run(
            &[(config::EXCLUDE_REQUIREMENTS_TO_UNLOCK, "none own")],
            |eco| eco.with(top_level("ft-core"), Behavior::outdated()),
        )
        .await;

        let calls = run.calls();
        assert_eq!(calls.can_update, vec![("ft-core".to_string(), All)]);
        assert_eq!(calls.updated, vec![("ft-core".to_string(), All)]);
    }

    #[tokio::test]
    async fn test_locked_requirements_only_try_none() {
        let run = run(&[], |eco| {
            eco.with(
                top_level("ft-core"),
                Behavior::outdated().supports(&[Own]).requirements_locked(),
            )
        })
        .await;

        let calls = run.calls();
        assert_eq!(calls.can_update, vec![("ft-core".to_string(), Locked)]);
        assert!(calls.updated.is_empty());
        drop(calls);
        assert!(matches!(
            &run.report().results[0],
            UpdateResult::Skip {
                reason: SkipReason::NotUpdatable,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_every_unlock_excluded_means_not_updatable() {
        let run = run(
            &[(config::EXCLUDE_REQUIREMENTS_TO_UNLOCK, "none own all")],
            |eco| eco.with(top_level("ft-core"), Behavior::outdated()),
        )
        .await;

        assert!(run.calls().can_update.is_empty());
        assert_eq!(run.report().outcome, RunOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_batch_keeps_one_entry_per_dependency() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::outdated().also(&["ft-support"]))
                .with(top_level("ft-search"), Behavior::outdated().also(&["ft-support"]))
        })
        .await;

        let names: Vec<&str> = run.report().updates.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["ft-core", "ft-support", "ft-search"]);
        assert_eq!(
            run.calls().file_updates,
            vec![vec![
                "ft-core".to_string(),
                "ft-support".to_string(),
                "ft-search".to_string()
            ]]
        );
    }
}

mod errors {
    use super::*;

    #[tokio::test]
    async fn test_failing_check_does_not_stop_later_ones() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::outdated())
                .with(top_level("ft-auth"), Behavior::failing())
                .with(top_level("ft-search"), Behavior::outdated())
        })
        .await;

        let report = run.report();
        assert_eq!(report.results.len(), 3);
        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.failures().next().unwrap().package_name(), "ft-auth");
        assert!(matches!(report.outcome, RunOutcome::Published(_)));

        let calls = run.calls();
        assert_eq!(calls.up_to_date, vec!["ft-core", "ft-auth", "ft-search"]);
        let request = &calls.pull_requests[0];
        let names: Vec<&str> = request.dependencies.iter().map(|u| u.name()).collect();
        assert_eq!(names, vec!["ft-core", "ft-search"]);
    }

    #[tokio::test]
    async fn test_fail_fast_aborts_on_first_error() {
        let run = run(&[(config::FAIL_ON_EXCEPTION, "true")], |eco| {
            eco.with(top_level("ft-core"), Behavior::outdated())
                .with(top_level("ft-auth"), Behavior::failing())
                .with(top_level("ft-search"), Behavior::outdated())
        })
        .await;

        match &run.result {
            Err(RunError::Check { dependency, source }) => {
                assert_eq!(dependency, "ft-auth");
                assert!(matches!(source, ServiceError::Registry(_)));
            }
            other => panic!("expected a check abort, got {:?}", other.as_ref().map(|r| &r.outcome)),
        }

        let calls = run.calls();
        assert_eq!(calls.up_to_date, vec!["ft-core", "ft-auth"]);
        assert!(calls.file_updates.is_empty());
        assert!(calls.pull_requests.is_empty());
    }

    #[tokio::test]
    async fn test_fail_fast_needs_exact_true() {
        let run = run(&[(config::FAIL_ON_EXCEPTION, "TRUE")], |eco| {
            eco.with(top_level("ft-auth"), Behavior::failing())
        })
        .await;

        assert_eq!(run.report().outcome, RunOutcome::UpToDate);
    }

    #[tokio::test]
    async fn test_publish_error_is_swallowed() {
        let run = run_with(
            &[],
            |eco| eco.with(top_level("ft-core"), Behavior::outdated()),
            true,
            false,
        )
        .await;

        match &run.report().outcome {
            RunOutcome::PublishFailed(message) => assert!(message.contains("already exists")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_publish_error_aborts_with_fail_fast() {
        let run = run_with(
            &[(config::FAIL_ON_EXCEPTION, "true")],
            |eco| eco.with(top_level("ft-core"), Behavior::outdated()),
            true,
            false,
        )
        .await;

        assert!(matches!(
            run.result,
            Err(RunError::Publish(ServiceError::BranchAlreadyExists { .. }))
        ));
    }

    #[tokio::test]
    async fn test_fetch_error_always_aborts() {
        let run = run(&[], |mut eco| {
            eco.fetch_fails = true;
            eco.with(top_level("ft-core"), Behavior::outdated())
        })
        .await;

        assert!(matches!(run.result, Err(RunError::Fetch(_))));
        assert!(run.calls().up_to_date.is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_always_aborts() {
        let run = run(&[], |mut eco| {
            eco.parse_fails = true;
            eco
        })
        .await;

        let err = run.result.as_ref().err().unwrap();
        assert!(matches!(err, RunError::Parse(_)));
        assert!(err.service_error().to_string().contains("Gemfile.lock"));
    }

    #[tokio::test]
    async fn test_unregistered_package_manager() {
        let log: Log = Arc::default();
        let registry = EcosystemRegistry::new().register(Arc::new(MockEcosystem::new(&log)));
        let creator = Arc::new(MockCreator {
            fails: false,
            log: log.clone(),
        });
        let result = Orchestrator::new(
            config(&[(config::PACKAGE_MANAGER, "composer")]),
            &registry,
            creator,
        );
        assert!(matches!(
            result.err(),
            Some(ConfigError::UnsupportedPackageManager {
                package_manager: PackageManager::Composer
            })
        ));
    }
}

mod publish {
    use super::*;

    #[tokio::test]
    async fn test_scenario_single_allow_list_entry() {
        let run = run(
            &[
                (config::DEPENDENCIES, "ft"),
                (config::ASSIGNEE_GITLAB_ID, "7"),
                (config::SOURCE_BRANCH, "develop"),
            ],
            |eco| {
                eco.with(top_level("ft-core"), Behavior::outdated().supports(&[Own]))
                    .with(top_level("other-lib"), Behavior::outdated())
            },
        )
        .await;

        let report = run.report();
        assert_eq!(report.results.len(), 1);
        assert_eq!(report.update_count(), 1);
        assert!(matches!(
            &report.results[0],
            UpdateResult::Update { unlock: Own, .. }
        ));
        match &report.outcome {
            RunOutcome::Published(pr) => assert_eq!(pr.iid, 42),
            other => panic!("unexpected outcome {:?}", other),
        }

        let calls = run.calls();
        assert_eq!(calls.up_to_date, vec!["ft-core"]);
        assert_eq!(
            calls.can_update,
            vec![("ft-core".to_string(), Locked), ("ft-core".to_string(), Own)]
        );
        assert_eq!(calls.updated, vec![("ft-core".to_string(), Own)]);
        assert_eq!(calls.pull_requests.len(), 1);

        let request = &calls.pull_requests[0];
        assert_eq!(request.dependencies.len(), 1);
        assert_eq!(request.dependencies[0].name(), "ft-core");
        assert_eq!(request.dependencies[0].version, "2.0.0");
        assert_eq!(request.base_commit, "abc123");
        assert_eq!(request.label_language, "ruby");
        assert_eq!(request.assignees, vec![7]);
        assert_eq!(request.package_manager, PackageManager::Bundler);
        assert_eq!(request.source.branch.as_deref(), Some("develop"));
        assert_eq!(request.files.len(), 2);
        assert!(request.files.iter().all(|f| f.content.ends_with("# updated\n")));
    }

    #[tokio::test]
    async fn test_scenario_nothing_updatable() {
        let run = run(&[], |eco| {
            eco.with(top_level("ft-core"), Behavior::current())
                .with(top_level("ft-search"), Behavior::outdated().supports(&[]))
        })
        .await;

        let report = run.report();
        assert_eq!(report.outcome, RunOutcome::UpToDate);
        assert!(report.updates.is_empty());

        let calls = run.calls();
        assert!(calls.file_updates.is_empty());
        assert!(calls.pull_requests.is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_skips_publish() {
        let run = run_with(
            &[],
            |eco| eco.with(top_level("ft-core"), Behavior::outdated()),
            false,
            true,
        )
        .await;

        assert_eq!(run.report().outcome, RunOutcome::DryRun);
        assert_eq!(run.report().update_count(), 1);
        let calls = run.calls();
        assert!(calls.file_updates.is_empty());
        assert!(calls.pull_requests.is_empty());
    }
}
