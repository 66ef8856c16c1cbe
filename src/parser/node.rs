//! npm and yarn requirement parser
//!
//! Whether a requirement is understood at all is decided by
//! [`VersionRequirement`], the same model the update checker matches
//! candidates with. Parsing here only picks the [`VersionSpecKind`] that
//! decides how a bumped requirement is written back:
//! - a single comparator (`^1.2.3`, `~1.2.3`, `>=1.2.3`, `1.2.3`) keeps its operator
//! - `*`, `1.x` and `1.2.*` stay wildcards
//! - conjunctions, hyphen ranges and `||` alternatives become ranges
//!
//! Dist-tags, git URLs and `file:` paths are not registry requirements.

use crate::domain::{PackageManager, VersionRequirement, VersionSpec, VersionSpecKind};
use crate::parser::VersionParser;
use regex::Regex;
use std::sync::LazyLock;

/// Parser for npm and yarn requirements
pub struct NodeVersionParser;

// Operator and optional `v`, then a full three-part version
static COMPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\^|~|>=|>|<=|<|=)?\s*v?(\d+\.\d+\.\d+(?:-[0-9A-Za-z.]+)?)$").unwrap()
});

static WILDCARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:\d+\.){0,2}[xX*]$").unwrap());

static FIRST_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*(?:-[0-9A-Za-z.]+)?").unwrap());

fn comparator_kind(operator: Option<&str>) -> VersionSpecKind {
    match operator {
        Some("^") => VersionSpecKind::Caret,
        Some("~") => VersionSpecKind::Tilde,
        Some(">=") => VersionSpecKind::GreaterOrEqual,
        Some(">") => VersionSpecKind::Greater,
        Some("<=") => VersionSpecKind::LessOrEqual,
        Some("<") => VersionSpecKind::Less,
        _ => VersionSpecKind::Exact,
    }
}

/// Several comparators: `>=1 <2`, `1.0.0 - 2.0.0`, `^1 || ^2`
fn is_compound(requirement: &str) -> bool {
    requirement.contains("||") || requirement.split_whitespace().nth(1).is_some()
}

impl VersionParser for NodeVersionParser {
    fn parse(&self, version_str: &str) -> Option<VersionSpec> {
        let requirement = version_str.trim();
        if requirement.is_empty() || VersionRequirement::parse(requirement).is_err() {
            return None;
        }

        if let Some(caps) = COMPARATOR_RE.captures(requirement) {
            let version = caps.get(2)?;
            let spec = VersionSpec::new(
                comparator_kind(caps.get(1).map(|m| m.as_str())),
                requirement,
                version.as_str(),
            );
            // Everything before the number, `v` and spacing included
            let prefix = &requirement[..version.start()];
            return Some(if prefix.is_empty() {
                spec
            } else {
                spec.with_prefix(prefix)
            });
        }

        if WILDCARD_RE.is_match(requirement) {
            return Some(VersionSpec::new(
                VersionSpecKind::Wildcard,
                requirement,
                requirement,
            ));
        }

        if is_compound(requirement) {
            let reference = FIRST_VERSION_RE
                .find(requirement)
                .map(|m| m.as_str())
                .unwrap_or_default();
            return Some(VersionSpec::new(
                VersionSpecKind::Range,
                requirement,
                reference,
            ));
        }

        // Partial versions such as `1.2` have no bump format
        None
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::NpmAndYarn
    }
}
