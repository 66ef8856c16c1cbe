//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ConfigError: Issues with environment configuration
//! - SourceError: Issues talking to the GitLab API
//! - RegistryError: Issues with package registry communication
//! - ManifestError: Issues parsing or rewriting manifest files
//! - ServiceError: Any collaborator failure, as seen by the orchestrator
//! - RunError: Fatal outcome of a run, tagged with the stage that failed

use thiserror::Error;

use crate::domain::PackageManager;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Collaborator failures outside the guarded stages
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// A run stage failed fatally
    #[error(transparent)]
    Run(#[from] RunError),
}

/// Errors raised while building the configuration from the environment
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required variable is unset or blank
    #[error("missing required environment variable {name}")]
    MissingVariable { name: String },

    /// A JSON-valued variable does not parse
    #[error("failed to parse {name} as JSON: {source}")]
    InvalidJson {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    /// A variable holds a value outside its domain
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    /// No ecosystem registered for the package manager
    #[error("no ecosystem registered for package manager '{package_manager}'")]
    UnsupportedPackageManager { package_manager: PackageManager },
}

/// Errors related to the GitLab API
#[derive(Error, Debug)]
pub enum SourceError {
    /// The API answered with an error status
    #[error("GitLab API {method} {path} returned {status}: {message}")]
    HttpStatus {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    /// Request could not be sent or the body could not be read
    #[error("GitLab API {method} {path} failed: {message}")]
    Network {
        method: String,
        path: String,
        message: String,
    },

    /// The response body did not have the expected shape
    #[error("unexpected response from GitLab API {path}: {message}")]
    Decode { path: String, message: String },

    /// No git_source credential for the GitLab host
    #[error("no git_source credential with a token for {host}")]
    MissingCredential { host: String },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },
}

/// Errors related to manifest and lockfile contents
#[derive(Error, Debug)]
pub enum ManifestError {
    /// JSON parsing error (composer.json, package.json)
    #[error("failed to parse JSON in {file}: {message}")]
    JsonParseError { file: String, message: String },

    /// Structural problem in a non-JSON manifest
    #[error("failed to parse {file}: {message}")]
    ParseError { file: String, message: String },

    /// Invalid version specification
    #[error("invalid version specification '{spec}' in {file}: {message}")]
    InvalidVersionSpec {
        file: String,
        spec: String,
        message: String,
    },
}

/// Any collaborator failure, as the orchestrator sees it
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A file the package manager requires is missing from the repository
    #[error("dependency file not found: {path}")]
    DependencyFileNotFound { path: String },

    /// The updater produced no changes for a non-empty update set
    #[error("no files were changed while updating {dependencies}")]
    NoFilesChanged { dependencies: String },

    /// The update branch exists and already has an open merge request
    #[error("branch '{branch}' already exists with an open merge request")]
    BranchAlreadyExists { branch: String },

    /// The requested unlock level cannot produce an update
    #[error("'{dependency}' cannot be updated with requirements_to_unlock={unlock}")]
    UpdateNotPossible { dependency: String, unlock: String },
}

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to fetch dependency files")]
    Fetch(#[source] ServiceError),

    #[error("failed to parse dependency files")]
    Parse(#[source] ServiceError),

    /// A per-dependency check failed with fail-fast enabled
    #[error("error updating {dependency}")]
    Check {
        dependency: String,
        #[source]
        source: ServiceError,
    },

    /// Rewriting files or opening the merge request failed with fail-fast enabled
    #[error("failed to publish the merge request")]
    Publish(#[source] ServiceError),
}

impl RunError {
    /// The collaborator error behind this abort
    pub fn service_error(&self) -> &ServiceError {
        match self {
            RunError::Fetch(e) | RunError::Parse(e) | RunError::Publish(e) => e,
            RunError::Check { source, .. } => source,
        }
    }
}

impl ConfigError {
    /// Creates a new MissingVariable error
    pub fn missing(name: impl Into<String>) -> Self {
        ConfigError::MissingVariable { name: name.into() }
    }

    /// Creates a new InvalidJson error
    pub fn invalid_json(name: impl Into<String>, source: serde_json::Error) -> Self {
        ConfigError::InvalidJson {
            name: name.into(),
            source,
        }
    }

    /// Creates a new InvalidValue error
    pub fn invalid_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl SourceError {
    /// Creates a new HttpStatus error
    pub fn http_status(
        method: impl Into<String>,
        path: impl Into<String>,
        status: u16,
        message: impl Into<String>,
    ) -> Self {
        SourceError::HttpStatus {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    /// Creates a new Network error
    pub fn network(
        method: impl Into<String>,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SourceError::Network {
            method: method.into(),
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new Decode error
    pub fn decode(path: impl Into<String>, message: impl Into<String>) -> Self {
        SourceError::Decode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status if the API answered with one
    pub fn status(&self) -> Option<u16> {
        match self {
            SourceError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new InvalidResponse error
    pub fn invalid_response(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::InvalidResponse {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Returns the registry name for this package manager
    pub fn registry_name(package_manager: PackageManager) -> &'static str {
        match package_manager {
            PackageManager::Bundler => "RubyGems",
            PackageManager::Composer => "Packagist",
            PackageManager::NpmAndYarn => "npm",
        }
    }
}

impl ManifestError {
    /// Creates a new JsonParseError
    pub fn json_parse_error(file: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::JsonParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a new ParseError
    pub fn parse_error(file: impl Into<String>, message: impl Into<String>) -> Self {
        ManifestError::ParseError {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidVersionSpec error
    pub fn invalid_version_spec(
        file: impl Into<String>,
        spec: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::InvalidVersionSpec {
            file: file.into(),
            spec: spec.into(),
            message: message.into(),
        }
    }
}

impl ServiceError {
    /// Creates a new DependencyFileNotFound error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        ServiceError::DependencyFileNotFound { path: path.into() }
    }

    /// Creates a new NoFilesChanged error
    pub fn no_files_changed<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        ServiceError::NoFilesChanged {
            dependencies: names.into_iter().collect::<Vec<_>>().join(", "),
        }
    }

    /// Creates a new UpdateNotPossible error
    pub fn update_not_possible(dependency: impl Into<String>, unlock: impl ToString) -> Self {
        ServiceError::UpdateNotPossible {
            dependency: dependency.into(),
            unlock: unlock.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_missing() {
        let err = ConfigError::missing("DEPENDABOT_PROJECT_PATH");
        let msg = format!("{}", err);
        assert!(msg.contains("missing required environment variable"));
        assert!(msg.contains("DEPENDABOT_PROJECT_PATH"));
    }

    #[test]
    fn test_config_error_invalid_json_names_variable() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ConfigError::invalid_json("DEPENDABOT_IGNORED_VERSIONS", source);
        let msg = format!("{}", err);
        assert!(msg.contains("DEPENDABOT_IGNORED_VERSIONS"));
        assert!(msg.contains("JSON"));
    }

    #[test]
    fn test_config_error_unsupported_package_manager() {
        let err = ConfigError::UnsupportedPackageManager {
            package_manager: PackageManager::Composer,
        };
        assert!(format!("{}", err).contains("composer"));
    }

    #[test]
    fn test_source_error_http_status() {
        let err = SourceError::http_status("GET", "/projects/a%2Fb", 404, "404 Project Not Found");
        let msg = format!("{}", err);
        assert!(msg.contains("returned 404"));
        assert_eq!(err.status(), Some(404));
        assert_eq!(SourceError::decode("/x", "bad").status(), None);
    }

    #[test]
    fn test_registry_error_package_not_found() {
        let err = RegistryError::package_not_found("nonexistent-package", "npm");
        let msg = format!("{}", err);
        assert!(msg.contains("package 'nonexistent-package' not found"));
        assert!(msg.contains("npm"));
    }

    #[test]
    fn test_registry_error_network() {
        let err = RegistryError::network_error("rails", "RubyGems", "connection refused");
        let msg = format!("{}", err);
        assert!(msg.contains("failed to fetch"));
        assert!(msg.contains("connection refused"));
    }

    #[test]
    fn test_registry_error_rate_limit() {
        let err = RegistryError::rate_limit_exceeded("Packagist");
        let msg = format!("{}", err);
        assert!(msg.contains("rate limit exceeded"));
        assert!(msg.contains("Packagist"));
    }

    #[test]
    fn test_registry_name() {
        assert_eq!(RegistryError::registry_name(PackageManager::Bundler), "RubyGems");
        assert_eq!(RegistryError::registry_name(PackageManager::Composer), "Packagist");
        assert_eq!(RegistryError::registry_name(PackageManager::NpmAndYarn), "npm");
    }

    #[test]
    fn test_manifest_error_json_parse() {
        let err = ManifestError::json_parse_error("composer.json", "unexpected token");
        let msg = format!("{}", err);
        assert!(msg.contains("failed to parse JSON"));
        assert!(msg.contains("unexpected token"));
    }

    #[test]
    fn test_run_error_check_names_dependency() {
        let err = RunError::Check {
            dependency: "ft-core".to_string(),
            source: ServiceError::file_not_found("Gemfile"),
        };
        assert_eq!(format!("{}", err), "error updating ft-core");
        assert!(matches!(
            err.service_error(),
            ServiceError::DependencyFileNotFound { .. }
        ));
        let chain = std::error::Error::source(&err).map(|e| e.to_string());
        assert_eq!(chain.as_deref(), Some("dependency file not found: Gemfile"));
    }

    #[test]
    fn test_service_error_wraps_registry_error() {
        let err: ServiceError = RegistryError::timeout("rails", "RubyGems").into();
        assert!(format!("{}", err).contains("timeout"));
    }

    #[test]
    fn test_service_error_no_files_changed() {
        let err = ServiceError::no_files_changed(["rails", "rack"]);
        assert!(format!("{}", err).contains("rails, rack"));
    }

    #[test]
    fn test_service_error_branch_exists() {
        let err = ServiceError::BranchAlreadyExists {
            branch: "dependabot/bundler/rails-7.0.4".to_string(),
        };
        assert!(format!("{}", err).contains("already exists"));
    }

    #[test]
    fn test_app_error_from_config_error() {
        let app_err: AppError = ConfigError::missing("X").into();
        assert!(format!("{}", app_err).contains("missing required"));
    }

    #[test]
    fn test_error_debug_trait() {
        let err = ServiceError::file_not_found("Gemfile");
        let debug = format!("{:?}", err);
        assert!(debug.contains("DependencyFileNotFound"));
    }
}
