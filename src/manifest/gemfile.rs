//! Gemfile parser for Ruby projects
//!
//! Handles:
//! - gem declarations with version constraints
//! - Development group dependencies (`group :development, :test do` blocks
//!   and inline `group:` options)
//! - Pessimistic version constraints (~>)
//!
//! Gems sourced from git or a local path are not registry packages and are
//! left out.

use crate::domain::{Dependency, PackageManager, VersionSpec};
use crate::error::ManifestError;
use crate::manifest::ManifestParser;
use crate::parser::get_parser;
use regex::Regex;
use std::sync::LazyLock;

const FILE: &str = "Gemfile";

// gem 'name' followed by the rest of the line
static GEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*gem\s*\(?\s*(['"])([^'"]+)['"](.*)$"#).unwrap());

// One leading requirement argument: , '~> 1.2'
static REQUIREMENT_ARG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*,\s*(['"])([^'"]*)['"]"#).unwrap());

static GROUP_BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*group\b(.*)\bdo\s*(\|.*\|)?\s*$").unwrap());

// Any other block opener that will be closed by `end`
static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bdo\s*(\|[^|]*\|)?\s*$").unwrap());

// Statement-form keywords closed by `end`; modifier forms (`gem 'x' if y`)
// never start a line
static KEYWORD_BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:if|unless|case|begin|def|while|until|class|module)\b").unwrap()
});

// One-line forms such as `if ENV['CI'] then gem 'x' end`
static CLOSED_ON_LINE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bend\s*$").unwrap());

static END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*end\b").unwrap());

static INLINE_GROUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:group|groups)\s*(?::|=>)\s*(\[[^\]]*\]|:\w+)").unwrap());

static NON_REGISTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(git|github|path|gitlab|bitbucket)\s*(?::|=>)").unwrap());

/// Parser for Gemfile files
pub struct GemfileParser;

fn is_dev_group(groups: &str) -> bool {
    groups.contains(":development") || groups.contains(":test")
}

fn strip_comment(line: &str) -> &str {
    // Quoted '#' inside a requirement never occurs in practice
    line.split('#').next().unwrap_or(line)
}

/// Requirement strings written after the gem name, in order
fn requirement_args(rest: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut remaining = rest;
    while let Some(caps) = REQUIREMENT_ARG_RE.captures(remaining) {
        args.push(caps[2].to_string());
        let consumed = caps.get(0).map(|m| m.end()).unwrap_or(remaining.len());
        remaining = &remaining[consumed..];
    }
    args
}

impl ManifestParser for GemfileParser {
    fn parse(&self, content: &str) -> Result<Vec<Dependency>, ManifestError> {
        let parser = get_parser(PackageManager::Bundler);
        let mut dependencies: Vec<Dependency> = Vec::new();
        // One entry per open block: whether it is a development group
        let mut blocks: Vec<bool> = Vec::new();

        for (index, raw_line) in content.lines().enumerate() {
            let line = strip_comment(raw_line);
            if line.trim().is_empty() {
                continue;
            }

            if END_RE.is_match(line) {
                if blocks.pop().is_none() {
                    return Err(ManifestError::parse_error(
                        FILE,
                        format!("unexpected 'end' on line {}", index + 1),
                    ));
                }
                continue;
            }

            let in_dev_block = blocks.iter().any(|dev| *dev);

            if let Some(caps) = GROUP_BLOCK_RE.captures(line) {
                blocks.push(is_dev_group(&caps[1]));
                continue;
            }

            if KEYWORD_BLOCK_RE.is_match(line) {
                if !CLOSED_ON_LINE_RE.is_match(line) {
                    blocks.push(in_dev_block);
                }
                continue;
            }

            if let Some(caps) = GEM_RE.captures(line) {
                let name = caps[2].to_string();
                let rest = &caps[3];

                if NON_REGISTRY_RE.is_match(rest) {
                    tracing::debug!(gem = %name, "skipping gem from git or path");
                } else if !dependencies.iter().any(|d| d.name == name) {
                    let args = requirement_args(rest);
                    let spec = if args.is_empty() {
                        Some(VersionSpec::any())
                    } else {
                        parser.parse(&args.join(", "))
                    };

                    match spec {
                        Some(spec) => {
                            let inline_dev = INLINE_GROUP_RE
                                .captures(rest)
                                .is_some_and(|g| is_dev_group(&g[1]));
                            let dep = Dependency::new(name, spec, PackageManager::Bundler);
                            dependencies.push(if in_dev_block || inline_dev {
                                dep.development()
                            } else {
                                dep
                            });
                        }
                        None => {
                            return Err(ManifestError::invalid_version_spec(
                                FILE,
                                args.join(", "),
                                format!("unrecognised requirement for gem '{}'", name),
                            ));
                        }
                    }
                }
            }

            if BLOCK_RE.is_match(line) {
                blocks.push(in_dev_block);
            }
        }

        Ok(dependencies)
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::Bundler
    }

    fn update_requirement(
        &self,
        content: &str,
        package: &str,
        requirement: &str,
    ) -> Result<String, ManifestError> {
        let pattern = format!(
            r#"(?m)^(\s*gem\s*\(?\s*(['"]){}['"])((?:\s*,\s*['"][^'"]*['"])*)"#,
            regex::escape(package)
        );
        let re = Regex::new(&pattern).map_err(|e| {
            ManifestError::invalid_version_spec(FILE, package, format!("invalid regex pattern: {}", e))
        })?;

        let caps = re.captures(content).ok_or_else(|| {
            ManifestError::invalid_version_spec(FILE, package, "gem declaration not found")
        })?;

        // Keep the quote style of the existing requirement, or of the name
        let existing = caps.get(3).map(|m| m.as_str()).unwrap_or_default();
        let quote = existing
            .chars()
            .find(|c| *c == '\'' || *c == '"')
            .unwrap_or_else(|| caps[2].chars().next().unwrap_or('"'));
        let separator = existing
            .find(['\'', '"'])
            .map(|i| &existing[..i])
            .filter(|s| !s.is_empty())
            .unwrap_or(", ");

        let replacement = format!("{}{}{}{}{}", &caps[1], separator, quote, requirement, quote);
        let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);

        let mut result = String::with_capacity(content.len() + requirement.len());
        result.push_str(&content[..whole.start]);
        result.push_str(&replacement);
        result.push_str(&content[whole.end..]);
        Ok(result)
    }
}
