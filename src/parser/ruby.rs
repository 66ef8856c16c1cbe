//! Ruby version specification parser
//!
//! Handles:
//! - Fixed versions: `= 1.2.3`, `1.2.3`
//! - Pessimistic constraints: `~> 1.2`, `~> 1.2.3`
//! - Comparison operators: `>=`, `<`, `>`, `<=`
//! - Compound constraints: `>= 1.0, < 2.0`

use crate::domain::{PackageManager, VersionSpec, VersionSpecKind};
use crate::parser::VersionParser;
use regex::Regex;
use std::sync::LazyLock;

/// Parser for Ruby version specifications
pub struct RubyVersionParser;

// Ruby allows optional space between operator and version; the spacing is
// kept in the prefix so rewrites look like the original
static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(~>|=|>=|>|<=|<|!=)?(\s*)(\d+(?:\.[0-9A-Za-z]+)*)$").unwrap()
});

// Compound constraint pattern (to detect before individual parsing)
static COMPOUND_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",").unwrap());

impl RubyVersionParser {
    /// Parse a single version constraint (not compound)
    fn parse_single(&self, version_str: &str) -> Option<VersionSpec> {
        let trimmed = version_str.trim();

        if trimmed.is_empty() {
            return None;
        }

        let caps = SINGLE_RE.captures(trimmed)?;
        let version = caps.get(3)?.as_str();
        let operator = caps.get(1).map(|m| m.as_str());
        let kind = match operator {
            Some("~>") => VersionSpecKind::Tilde,
            Some("=") | None => VersionSpecKind::Exact,
            Some(">=") => VersionSpecKind::GreaterOrEqual,
            Some(">") => VersionSpecKind::Greater,
            Some("<=") => VersionSpecKind::LessOrEqual,
            Some("<") => VersionSpecKind::Less,
            // `!= 1.5` excludes a single release; nothing to bump
            Some(_) => VersionSpecKind::Range,
        };

        let spec = VersionSpec::new(kind, trimmed, version);
        Some(match operator {
            Some(op) => spec.with_prefix(format!("{}{}", op, &caps[2])),
            None => spec,
        })
    }
}

impl VersionParser for RubyVersionParser {
    fn parse(&self, version_str: &str) -> Option<VersionSpec> {
        let trimmed = version_str.trim();

        if trimmed.is_empty() {
            return None;
        }

        // Check for compound constraints (>= 1.0, < 2.0)
        if COMPOUND_RE.is_match(trimmed) {
            // For compound constraints, extract the first version for reference
            let parts: Vec<&str> = trimmed.split(',').collect();
            if let Some(first_part) = parts.first() {
                if let Some(first_spec) = self.parse_single(first_part) {
                    // Return as Range type with the first version as reference
                    return Some(VersionSpec::new(
                        VersionSpecKind::Range,
                        trimmed,
                        first_spec.version,
                    ));
                }
            }
            return None;
        }

        // Parse single constraint
        self.parse_single(trimmed)
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::Bundler
    }
}
