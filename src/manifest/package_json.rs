//! package.json parser for Node.js projects
//!
//! Handles:
//! - dependencies
//! - devDependencies
//! - peerDependencies
//! - optionalDependencies

use crate::domain::{Dependency, PackageManager};
use crate::error::ManifestError;
use crate::manifest::{replace_json_requirement, ManifestParser};
use crate::parser::{get_parser, VersionParser};
use serde_json::{Map, Value};

const FILE: &str = "package.json";

/// Dependency sections, in the order they are read
const SECTIONS: [&str; 4] = [
    "dependencies",
    "devDependencies",
    "peerDependencies",
    "optionalDependencies",
];

/// Parser for package.json files
pub struct PackageJsonParser;

impl ManifestParser for PackageJsonParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>, ManifestError> {
        let json: Value = serde_json::from_str(content)
            .map_err(|e| ManifestError::json_parse_error(FILE, e.to_string()))?;

        let mut dependencies = Vec::new();
        let parser = get_parser(PackageManager::NpmAndYarn);

        for section in SECTIONS {
            if let Some(deps) = json.get(section).and_then(|v| v.as_object()) {
                let is_dev = section == "devDependencies";
                parse_dependency_object(deps, parser.as_ref(), is_dev, &mut dependencies);
            }
        }

        Ok(dependencies)
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::NpmAndYarn
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

fn parse_dependency_object(
    deps: &Map<String, Value>,
    parser: &dyn VersionParser,
    is_dev: bool,
    output: &mut Vec<Dependency>,
) {
    for (name, version_value) in deps {
        // A package listed in several sections is checked once
        if output.iter().any(|d| &d.name == name) {
            continue;
        }
        let Some(version_str) = version_value.as_str() else {
            continue;
        };
        match parser.parse(version_str) {
            Some(spec) => {
                let dep = Dependency::new(name.clone(), spec, PackageManager::NpmAndYarn);
                output.push(if is_dev { dep.development() } else { dep });
            }
            None => tracing::debug!(package = %name, requirement = version_str, "skipping non-registry requirement"),
        }
    }
}
