//! PHP version specification parser
//!
//! Handles:
//! - Fixed versions: `1.2.3`, `v1.2.3`
//! - Caret ranges: `^1.2.3`
//! - Tilde ranges: `~1.2.3`
//! - Comparison operators: `>=`, `<`, `>`
//! - Compound constraints: `>=1.0 <2.0`, `^1.0 || ^2.0`
//! - Wildcards: `1.2.*`

use crate::domain::{PackageManager, VersionSpec, VersionSpecKind};
use crate::parser::VersionParser;
use regex::Regex;
use std::sync::LazyLock;

/// Parser for PHP version specifications
pub struct PhpVersionParser;

static SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\^|~|>=|>|<=|<|==|=|!=)?(\s*)(v?\d+(?:\.\d+)*(?:-[0-9A-Za-z.]+)?)$").unwrap()
});

static WILDCARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+\.)+\*$|^\*$").unwrap());

static OPERATOR_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\^|~|>=|>|<=|<|==|=|!=)\s+").unwrap());

// Stability flags like `@dev` do not affect which version is picked
static STABILITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(dev|alpha|beta|RC|rc|stable)$").unwrap());

impl PhpVersionParser {
    fn parse_single(&self, trimmed: &str) -> Option<VersionSpec> {
        let caps = SINGLE_RE.captures(trimmed)?;
        let written = caps.get(3)?.as_str();
        let version = written.strip_prefix('v').unwrap_or(written);
        let operator = caps.get(1).map(|m| m.as_str());
        let kind = match operator {
            Some("^") => VersionSpecKind::Caret,
            Some("~") => VersionSpecKind::Tilde,
            Some(">=") => VersionSpecKind::GreaterOrEqual,
            Some(">") => VersionSpecKind::Greater,
            Some("<=") => VersionSpecKind::LessOrEqual,
            Some("<") => VersionSpecKind::Less,
            Some("=") | Some("==") | None => VersionSpecKind::Exact,
            Some(_) => VersionSpecKind::Range,
        };

        let mut prefix = operator.map(|op| format!("{}{}", op, &caps[2])).unwrap_or_default();
        if written.starts_with('v') {
            prefix.push('v');
        }

        let spec = VersionSpec::new(kind, trimmed, version);
        Some(if prefix.is_empty() {
            spec
        } else {
            spec.with_prefix(prefix)
        })
    }
}

impl VersionParser for PhpVersionParser {
    fn parse(&self, version_str: &str) -> Option<VersionSpec> {
        let trimmed = STABILITY_RE.replace(version_str.trim(), "");
        let trimmed = trimmed.trim();

        if trimmed.is_empty() || trimmed.starts_with("dev-") {
            return None;
        }

        if WILDCARD_RE.is_match(trimmed) {
            return Some(VersionSpec::new(
                VersionSpecKind::Wildcard,
                trimmed,
                trimmed,
            ));
        }

        if let Some(spec) = self.parse_single(trimmed) {
            return Some(spec);
        }

        // Compound: every part must parse on its own; the first one is the reference
        let normalized = OPERATOR_GAP_RE.replace_all(trimmed, "$1");
        let parts: Vec<&str> = normalized
            .split(|c: char| c == ',' || c == '|' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .collect();
        let mut specs = parts
            .iter()
            .map(|p| {
                self.parse_single(p).or_else(|| {
                    WILDCARD_RE
                        .is_match(p)
                        .then(|| VersionSpec::new(VersionSpecKind::Wildcard, *p, *p))
                })
            })
            .collect::<Option<Vec<_>>>()?;
        if specs.is_empty() {
            return None;
        }
        let first = specs.remove(0);
        Some(VersionSpec::new(VersionSpecKind::Range, trimmed, first.version))
    }

    fn package_manager(&self) -> PackageManager {
        PackageManager::Composer
    }
}
