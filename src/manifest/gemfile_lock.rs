//! Gemfile.lock reader and writer
//!
//! Only the `GEM` section is read: gems from `GIT` or `PATH` sources are not
//! registry packages. Platform-specific entries such as
//! `nokogiri (1.15.4-x86_64-linux)` are reported under the plain version.

use crate::error::ManifestError;
use crate::manifest::LockfileParser;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const FILE: &str = "Gemfile.lock";

static SPEC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^    (\S+) \(([^)]+)\)\s*$").unwrap());

static DEPENDENCY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^  ([^\s(!]+)(!)?(?: \(([^)]*)\))?\s*$").unwrap());

/// A package pinned by a lockfile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedSpec {
    pub name: String,
    pub version: String,
}

/// Parser for Gemfile.lock files
pub struct GemfileLockParser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Gem,
    Dependencies,
    Other,
}

fn section_of(line: &str) -> Option<Section> {
    if line.starts_with(' ') || line.trim().is_empty() {
        return None;
    }
    Some(match line.trim_end() {
        "GEM" => Section::Gem,
        "DEPENDENCIES" => Section::Dependencies,
        _ => Section::Other,
    })
}

/// Split `1.15.4-x86_64-linux` into `("1.15.4", Some("-x86_64-linux"))`
fn split_platform(version: &str) -> (&str, Option<&str>) {
    match version.find('-') {
        Some(i) => (&version[..i], Some(&version[i..])),
        None => (version, None),
    }
}

/// Walk the lockfile line by line, letting `edit` rewrite lines of a section
fn rewrite_lines<F>(content: &str, mut edit: F) -> String
where
    F: FnMut(Section, &str) -> Option<String>,
{
    let mut section = Section::Other;
    let mut result = String::with_capacity(content.len());

    for line in content.split_inclusive('\n') {
        let (body, ending) = match line.strip_suffix('\n') {
            Some(body) => match body.strip_suffix('\r') {
                Some(body) => (body, "\r\n"),
                None => (body, "\n"),
            },
            None => (line, ""),
        };

        if let Some(next) = section_of(body) {
            section = next;
        }

        match edit(section, body) {
            Some(replacement) => {
                result.push_str(&replacement);
                result.push_str(ending);
            }
            None => result.push_str(line),
        }
    }

    result
}

impl LockfileParser for GemfileLockParser {
    fn filename(&self) -> &'static str {
        FILE
    }

    fn parse(&self, content: &str) -> Result<Vec<LockedSpec>, ManifestError> {
        let mut section = Section::Other;
        let mut seen_gem_section = false;
        let mut specs: Vec<LockedSpec> = Vec::new();

        for line in content.lines() {
            if let Some(next) = section_of(line) {
                section = next;
                seen_gem_section |= section == Section::Gem;
                continue;
            }
            if section != Section::Gem {
                continue;
            }
            if let Some(caps) = SPEC_RE.captures(line) {
                let (version, _) = split_platform(&caps[2]);
                if !specs.iter().any(|s| s.name == caps[1]) {
                    specs.push(LockedSpec {
                        name: caps[1].to_string(),
                        version: version.to_string(),
                    });
                }
            }
        }

        if !seen_gem_section && !content.trim().is_empty() {
            return Err(ManifestError::parse_error(FILE, "no GEM section found"));
        }

        Ok(specs)
    }

    fn update_version(
        &self,
        content: &str,
        package: &str,
        version: &str,
    ) -> Result<String, ManifestError> {
        let mut found = false;
        let result = rewrite_lines(content, |section, line| {
            if section != Section::Gem {
                return None;
            }
            let caps = SPEC_RE.captures(line)?;
            if &caps[1] != package {
                return None;
            }
            found = true;
            let (_, platform) = split_platform(&caps[2]);
            Some(format!(
                "    {} ({}{})",
                package,
                version,
                platform.unwrap_or_default()
            ))
        });

        if !found {
            return Err(ManifestError::invalid_version_spec(
                FILE,
                package,
                "gem is not locked in the GEM section",
            ));
        }
        Ok(result)
    }

    fn update_requirement(
        &self,
        content: &str,
        package: &str,
        requirement: &str,
    ) -> Result<String, ManifestError> {
        Ok(rewrite_lines(content, |section, line| {
            if section != Section::Dependencies {
                return None;
            }
            let caps = DEPENDENCY_RE.captures(line)?;
            if &caps[1] != package {
                return None;
            }
            let bang = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            Some(if requirement.is_empty() {
                format!("  {}{}", package, bang)
            } else {
                format!("  {} ({}){}", package, requirement, bang)
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKFILE: &str = "GIT
  remote: https://gitlab.example.com/acme/internal.git
  revision: 0123456789abcdef
  specs:
    internal (0.1.0)

GEM
  remote: https://rubygems.org/
  specs:
    ft-core (1.2.0)
      rack (>= 2.0)
    nokogiri (1.15.4-arm64-darwin)
      racc (~> 1.4)
    nokogiri (1.15.4-x86_64-linux)
      racc (~> 1.4)
    rack (2.2.8)
    racc (1.7.1)
    rails (7.0.4)

PLATFORMS
  arm64-darwin
  x86_64-linux

DEPENDENCIES
  ft-core (~> 1.2)
  internal!
  nokogiri
  rails (~> 7.0.4)

BUNDLED WITH
   2.4.19
";

    fn locked(content: &str) -> Vec<LockedSpec> {
        GemfileLockParser.parse(content).unwrap()
    }

    #[test]
    fn test_filename() {
        assert_eq!(GemfileLockParser.filename(), "Gemfile.lock");
    }

    #[test]
    fn test_parse_gem_section_only() {
        let specs = locked(LOCKFILE);
        let names: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["ft-core", "nokogiri", "rack", "racc", "rails"]);
    }

    #[test]
    fn test_parse_strips_platform() {
        let specs = locked(LOCKFILE);
        let nokogiri = specs.iter().find(|s| s.name == "nokogiri").unwrap();
        assert_eq!(nokogiri.version, "1.15.4");
    }

    #[test]
    fn test_parse_empty_content() {
        assert!(locked("").is_empty());
    }

    #[test]
    fn test_parse_without_gem_section() {
        assert!(GemfileLockParser.parse("PLATFORMS\n  ruby\n").is_err());
    }

    #[test]
    fn test_update_version() {
        let result = GemfileLockParser
            .update_version(LOCKFILE, "ft-core", "1.3.1")
            .unwrap();
        assert!(result.contains("    ft-core (1.3.1)\n      rack (>= 2.0)\n"));
        assert!(result.contains("  ft-core (~> 1.2)\n"));
        assert_eq!(result.len(), LOCKFILE.len());
    }

    #[test]
    fn test_update_version_keeps_platforms() {
        let result = GemfileLockParser
            .update_version(LOCKFILE, "nokogiri", "1.16.0")
            .unwrap();
        assert!(result.contains("    nokogiri (1.16.0-arm64-darwin)\n"));
        assert!(result.contains("    nokogiri (1.16.0-x86_64-linux)\n"));
        assert!(!result.contains("1.15.4"));
    }

    #[test]
    fn test_update_version_ignores_nested_requirements() {
        let result = GemfileLockParser
            .update_version(LOCKFILE, "rack", "3.0.0")
            .unwrap();
        assert!(result.contains("    rack (3.0.0)\n"));
        assert!(result.contains("      rack (>= 2.0)\n"));
    }

    #[test]
    fn test_update_version_unknown_gem() {
        assert!(GemfileLockParser
            .update_version(LOCKFILE, "internal", "0.2.0")
            .is_err());
    }

    #[test]
    fn test_update_requirement() {
        let result = GemfileLockParser
            .update_requirement(LOCKFILE, "rails", "~> 7.1.2")
            .unwrap();
        assert!(result.contains("  rails (~> 7.1.2)\n"));
        assert!(result.contains("    rails (7.0.4)\n"));
    }

    #[test]
    fn test_update_requirement_adds_missing_requirement() {
        let result = GemfileLockParser
            .update_requirement(LOCKFILE, "nokogiri", "~> 1.16")
            .unwrap();
        assert!(result.contains("  nokogiri (~> 1.16)\n"));
    }

    #[test]
    fn test_update_requirement_unknown_gem_is_noop() {
        let result = GemfileLockParser
            .update_requirement(LOCKFILE, "sidekiq", "~> 7.0")
            .unwrap();
        assert_eq!(result, LOCKFILE);
    }

    #[test]
    fn test_crlf_line_endings_preserved() {
        let content = "GEM\r\n  specs:\r\n    rails (7.0.4)\r\n";
        let result = GemfileLockParser
            .update_version(content, "rails", "7.1.0")
            .unwrap();
        assert_eq!(result, "GEM\r\n  specs:\r\n    rails (7.1.0)\r\n");
    }
}
