//! Dependency parsing over fetched files

use crate::domain::{find_file, Dependency, DependencyFile, PackageManager};
use crate::error::ServiceError;
use crate::manifest::{get_lockfile_parser, get_parser};
use crate::services::FileParser;

/// Reads top-level dependencies from the manifest and locked versions (plus
/// transitive dependencies) from the lockfile when one was fetched
pub struct ManifestFileParser {
    package_manager: PackageManager,
    files: Vec<DependencyFile>,
}

impl ManifestFileParser {
    pub fn new(package_manager: PackageManager, files: &[DependencyFile]) -> Self {
        Self {
            package_manager,
            files: files.to_vec(),
        }
    }
}

impl FileParser for ManifestFileParser {
    fn parse(&self) -> Result<Vec<Dependency>, ServiceError> {
        let manifest_name = self.package_manager.manifest_filename();
        let manifest = find_file(&self.files, manifest_name)
            .ok_or_else(|| ServiceError::file_not_found(manifest_name))?;

        let mut dependencies = get_parser(self.package_manager).parse(&manifest.content)?;

        let Some(lock_parser) = get_lockfile_parser(self.package_manager) else {
            return Ok(dependencies);
        };
        let Some(lockfile) = find_file(&self.files, lock_parser.filename()) else {
            tracing::debug!(file = lock_parser.filename(), "no lockfile fetched");
            return Ok(dependencies);
        };

        let locked = lock_parser.parse(&lockfile.content)?;
        for dep in dependencies.iter_mut() {
            if let Some(spec) = locked.iter().find(|s| s.name == dep.name) {
                dep.version = Some(spec.version.clone());
            }
        }

        let transitive: Vec<Dependency> = locked
            .into_iter()
            .filter(|spec| !dependencies.iter().any(|d| d.name == spec.name))
            .map(|spec| Dependency::transitive(spec.name, spec.version, self.package_manager))
            .collect();
        dependencies.extend(transitive);

        Ok(dependencies)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const GEMFILE: &str = "source 'https://rubygems.org'\ngem 'ft-core', '~> 1.2'\ngem 'rails'\n";
    const LOCKFILE: &str = "GEM
  remote: https://rubygems.org/
  specs:
    ft-core (1.2.4)
      rack (>= 2.0)
    rack (2.2.8)
    rails (7.0.4)

DEPENDENCIES
  ft-core (~> 1.2)
  rails
";

    #[test]
    fn test_parse_with_lockfile() {
        let files = vec![
            DependencyFile::new("Gemfile", "/", GEMFILE),
            DependencyFile::new("Gemfile.lock", "/", LOCKFILE),
        ];
        let deps = ManifestFileParser::new(PackageManager::Bundler, &files)
            .parse()
            .unwrap();

        assert_eq!(deps.len(), 3);
        let ft = deps.iter().find(|d| d.name == "ft-core").unwrap();
        assert_eq!(ft.version.as_deref(), Some("1.2.4"));
        assert!(ft.top_level);

        let rack = deps.iter().find(|d| d.name == "rack").unwrap();
        assert!(!rack.top_level);
        assert_eq!(rack.version.as_deref(), Some("2.2.8"));
    }

    #[test]
    fn test_parse_without_lockfile() {
        let files = vec![DependencyFile::new("Gemfile", "/", GEMFILE)];
        let deps = ManifestFileParser::new(PackageManager::Bundler, &files)
            .parse()
            .unwrap();
        assert_eq!(deps.len(), 2);
        assert!(deps.iter().all(|d| d.version.is_none()));
    }

    #[test]
    fn test_parse_missing_manifest() {
        let files = vec![DependencyFile::new("Gemfile.lock", "/", LOCKFILE)];
        let err = ManifestFileParser::new(PackageManager::Bundler, &files)
            .parse()
            .unwrap_err();
        assert!(matches!(err, ServiceError::DependencyFileNotFound { .. }));
    }

    #[test]
    fn test_parse_invalid_manifest() {
        let files = vec![DependencyFile::new("package.json", "/", "{ not json")];
        let err = ManifestFileParser::new(PackageManager::NpmAndYarn, &files)
            .parse()
            .unwrap_err();
        assert!(matches!(err, ServiceError::Manifest(_)));
    }
}
