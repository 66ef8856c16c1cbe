//! Core domain models for kira-deps
//!
//! This module contains the fundamental types used throughout the application:
//! - Package managers and the source repository descriptor
//! - Version specifications and requirement matching
//! - Dependencies, fetched files and credentials
//! - Unlock levels, update strategies and ignored versions
//! - Per-dependency check results

mod credential;
mod dependency;
mod dependency_file;
mod ignored;
mod package_manager;
mod requirement;
mod source;
mod unlock;
mod update_result;
mod version_spec;

pub use credential::{
    Credential, Credentials, COMPOSER_REPOSITORY, GIT_SOURCE, NPM_REGISTRY, RUBYGEMS_SERVER,
};
pub use dependency::{Dependency, UpdatedDependency};
pub use dependency_file::{find_file, DependencyFile};
pub use ignored::IgnoredVersions;
pub use package_manager::{PackageManager, UnknownPackageManager};
pub use requirement::{RequirementParseError, VersionRequirement};
pub use source::Source;
pub use unlock::{ExcludedUnlocks, RequirementsToUnlock, RequirementsUpdateStrategy};
pub use update_result::{SkipReason, UpdateResult};
pub use version_spec::{VersionSpec, VersionSpecKind};
