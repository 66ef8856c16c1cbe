//! composer.json parser for PHP projects
//!
//! Handles:
//! - require section dependencies
//! - require-dev section dependencies
//! - Version constraints (^, ~, >=, etc.)

use crate::domain::{Dependency, PackageManager};
use crate::error::ManifestError;
use crate::manifest::{replace_json_requirement, ManifestParser};
use crate::parser::get_parser;
use serde_json::Value;

const FILE: &str = "composer.json";

const SECTIONS: [&str; 2] = ["require", "require-dev"];

/// Parser for composer.json files
pub struct ComposerJsonParser;

/// Platform requirements are satisfied by the runtime, not by Packagist
fn is_platform_package(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower == "php"
        || lower == "hhvm"
        || lower == "composer-plugin-api"
        || lower == "composer-runtime-api"
        || lower.starts_with("php-")
        || lower.starts_with("ext-")
        || lower.starts_with("lib-")
        || !lower.contains('/')
}

impl ManifestParser for ComposerJsonParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>, ManifestError> {
        let json: Value = serde_json::from_str(content)
            .map_err(|e| ManifestError::json_parse_error(FILE, e.to_string()))?;

        let parser = get_parser(PackageManager::Composer);
        let mut dependencies = Vec::new();

        for section in SECTIONS {
            let Some(deps) = json.get(section).and_then(|v| v.as_object()) else {
                continue;
            };
            for (name, value) in deps {
                if is_platform_package(name) {
                    continue;
                }
                let Some(constraint) = value.as_str() else {
                    return Err(ManifestError::json_parse_error(
                        FILE,
                        format!("constraint for '{}' in {} is not a string", name, section),
                    ));
                };
                match parser.parse(constraint) {
                    Some(spec) => {
                        let dep = Dependency::new(name.clone(), spec, PackageManager::Composer);
                        dependencies.push(if section == "require-dev" {
                            dep.development()
                        } else {
                            dep
                        });
                    }
                    None => tracing::debug!(package = %name, constraint, "skipping unsupported constraint"),
                }
            }
        }

        Ok(dependencies)
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::Composer
    }

    fn update_requirement(
        &self,
        content: &str,
        package: &str,
        requirement: &str,
    ) -> Result<String, ManifestError> {
        replace_json_requirement(FILE, content, &SECTIONS, package, requirement)
    }
}
