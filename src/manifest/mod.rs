//! Manifest and lockfile parsing
//!
//! This module provides functionality to:
//! - Parse dependencies from Gemfile, composer.json and package.json
//! - Read locked versions from Gemfile.lock
//! - Rewrite requirements and locked versions without disturbing formatting

mod composer_json;
mod gemfile;
mod gemfile_lock;
mod package_json;

pub use composer_json::ComposerJsonParser;
pub use gemfile::GemfileParser;
pub use gemfile_lock::{GemfileLockParser, LockedSpec};
pub use package_json::PackageJsonParser;

use crate::domain::{Dependency, PackageManager};
use crate::error::ManifestError;
use regex::Regex;

/// Trait for parsing manifest files
pub trait ManifestParser: Send + Sync {
    /// Parse dependencies from a manifest file
    fn parse(&self, content: &str) -> Result<Vec<Dependency>, ManifestError>;

    /// Returns the package manager this parser handles
    fn package_manager(&self) -> PackageManager;

    /// Replace the requirement of `package` with `requirement`
    fn update_requirement(
        &self,
        content: &str,
        package: &str,
        requirement: &str,
    ) -> Result<String, ManifestError>;
}

/// Trait for lockfiles that pin exact versions
pub trait LockfileParser: Send + Sync {
    /// Lockfile name, relative to the manifest directory
    fn filename(&self) -> &'static str;

    /// Every locked package with its version
    fn parse(&self, content: &str) -> Result<Vec<LockedSpec>, ManifestError>;

    /// Move `package` to `version`
    fn update_version(
        &self,
        content: &str,
        package: &str,
        version: &str,
    ) -> Result<String, ManifestError>;

    /// Mirror a manifest requirement change in the lockfile, if it records them
    fn update_requirement(
        &self,
        content: &str,
        _package: &str,
        _requirement: &str,
    ) -> Result<String, ManifestError> {
        Ok(content.to_string())
    }
}

/// Get a manifest parser for the specified package manager
pub fn get_parser(package_manager: PackageManager) -> Box<dyn ManifestParser> {
    match package_manager {
        PackageManager::Bundler => Box::new(GemfileParser),
        PackageManager::Composer => Box::new(ComposerJsonParser),
        PackageManager::NpmAndYarn => Box::new(PackageJsonParser),
    }
}

/// Get the lockfile parser for the specified package manager, if it has one
pub fn get_lockfile_parser(package_manager: PackageManager) -> Option<Box<dyn LockfileParser>> {
    match package_manager {
        PackageManager::Bundler => Some(Box::new(GemfileLockParser)),
        PackageManager::Composer | PackageManager::NpmAndYarn => None,
    }
}

/// Rewrite `"package": "<old>"` to `"package": "<requirement>"` in a JSON manifest
///
/// Uses text replacement to preserve original formatting and key order. Only
/// entries inside one of `sections` are touched.
pub(crate) fn replace_json_requirement(
    file: &str,
    content: &str,
    sections: &[&str],
    package: &str,
    requirement: &str,
) -> Result<String, ManifestError> {
    let escaped_package = regex::escape(package);
    let pattern = format!(r#"("{}"\s*:\s*)"([^"]*)""#, escaped_package);
    let re = Regex::new(&pattern).map_err(|e| {
        ManifestError::invalid_version_spec(file, package, format!("invalid regex pattern: {}", e))
    })?;

    let section_re = Regex::new(&format!(
        r#""({})"\s*:\s*\{{"#,
        sections
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|")
    ))
    .map_err(|e| ManifestError::parse_error(file, e.to_string()))?;

    for section in section_re.find_iter(content) {
        let body_start = section.end();
        let body_end = content[body_start..]
            .find('}')
            .map(|i| body_start + i)
            .unwrap_or(content.len());
        let body = &content[body_start..body_end];

        if let Some(caps) = re.captures(body) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let replacement = format!(r#"{}"{}""#, &caps[1], requirement);
            let mut result = String::with_capacity(content.len());
            result.push_str(&content[..body_start + whole.start]);
            result.push_str(&replacement);
            result.push_str(&content[body_start + whole.end..]);
            return Ok(result);
        }
    }

    Err(ManifestError::invalid_version_spec(
        file,
        package,
        "package not found or version could not be updated",
    ))
}
