//! Version requirement matching
//!
//! Understands the operators used by Bundler, Composer and npm:
//! - Comparisons: `=`, `==`, `!=`, `>`, `>=`, `<`, `<=`
//! - Pessimistic / tilde: `~> 1.2`, `~1.2.3`
//! - Caret: `^1.2.3`
//! - Wildcards: `*`, `1.x`, `1.2.*`
//! - Conjunctions separated by commas or spaces, hyphen ranges (`1.0 - 2.0`)
//! - Alternatives separated by `||`

use crate::update::{compare_versions, parse_version};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

// Operator followed by whitespace: "~> 1.2" -> "~>1.2"
static OPERATOR_GAP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(~>|>=|<=|!=|==|=|>|<|\^|~)\s+").unwrap());

static COMPARATOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(~>|>=|<=|!=|==|=|>|<|\^|~)?v?(\d+(?:\.[0-9A-Za-z]+)*(?:-[0-9A-Za-z.\-]+)?)$")
        .unwrap()
});

static WILDCARD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^v?((?:\d+\.)*)[xX*]$").unwrap());

/// Error returned when a requirement string cannot be understood
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid version requirement '{input}': {message}")]
pub struct RequirementParseError {
    pub input: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Comparator {
    Any,
    Eq(String),
    NotEq(String),
    Greater(String),
    GreaterOrEqual(String),
    Less(String),
    LessOrEqual(String),
    Pessimistic(String),
    Caret(String),
    Wildcard(Vec<u64>),
}

impl Comparator {
    fn matches(&self, version: &str) -> bool {
        match self {
            Comparator::Any => true,
            Comparator::Eq(v) => compare_versions(version, v) == Ordering::Equal,
            Comparator::NotEq(v) => compare_versions(version, v) != Ordering::Equal,
            Comparator::Greater(v) => compare_versions(version, v) == Ordering::Greater,
            Comparator::GreaterOrEqual(v) => compare_versions(version, v) != Ordering::Less,
            Comparator::Less(v) => compare_versions(version, v) == Ordering::Less,
            Comparator::LessOrEqual(v) => compare_versions(version, v) != Ordering::Greater,
            Comparator::Pessimistic(v) => {
                let release = parse_version(v).release;
                let bump_at = release.len().saturating_sub(2);
                within(version, v, &release, bump_at)
            }
            Comparator::Caret(v) => {
                let release = parse_version(v).release;
                let bump_at = release
                    .iter()
                    .position(|n| *n != 0)
                    .unwrap_or(release.len().saturating_sub(1));
                within(version, v, &release, bump_at)
            }
            Comparator::Wildcard(prefix) => {
                let release = parse_version(version).release;
                prefix
                    .iter()
                    .enumerate()
                    .all(|(i, n)| release.get(i).copied().unwrap_or(0) == *n)
            }
        }
    }

    fn parse(token: &str) -> Result<Self, String> {
        if token == "*" || token.eq_ignore_ascii_case("x") {
            return Ok(Comparator::Any);
        }

        if let Some(caps) = WILDCARD_RE.captures(token) {
            let prefix = caps
                .get(1)
                .map(|m| m.as_str())
                .unwrap_or_default()
                .split('.')
                .filter(|s| !s.is_empty())
                .map(|s| s.parse::<u64>().map_err(|e| e.to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Comparator::Wildcard(prefix));
        }

        let caps = COMPARATOR_RE
            .captures(token)
            .ok_or_else(|| format!("unrecognised constraint '{}'", token))?;
        let version = caps[2].to_string();

        Ok(match caps.get(1).map(|m| m.as_str()) {
            None | Some("=") | Some("==") => Comparator::Eq(version),
            Some("!=") => Comparator::NotEq(version),
            Some(">") => Comparator::Greater(version),
            Some(">=") => Comparator::GreaterOrEqual(version),
            Some("<") => Comparator::Less(version),
            Some("<=") => Comparator::LessOrEqual(version),
            // Composer and RubyGems semantics; npm reads `~1.2` as `<1.3`
            Some("~>") | Some("~") => Comparator::Pessimistic(version),
            Some("^") => Comparator::Caret(version),
            Some(other) => return Err(format!("unsupported operator '{}'", other)),
        })
    }
}

/// `version` is at least `floor` and below `release` bumped at `bump_at`
fn within(version: &str, floor: &str, release: &[u64], bump_at: usize) -> bool {
    if compare_versions(version, floor) == Ordering::Less {
        return false;
    }
    if release.is_empty() {
        return true;
    }
    let mut ceiling: Vec<u64> = release[..=bump_at.min(release.len() - 1)].to_vec();
    if let Some(last) = ceiling.last_mut() {
        *last += 1;
    }
    let ceiling = ceiling
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".");
    // 2.0.0.pre sits below the 2.0 ceiling but must not match ~> 1.2
    let candidate_release = parse_version(version)
        .release
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(".");
    compare_versions(&candidate_release, &ceiling) == Ordering::Less
}

/// A parsed version requirement: alternatives of comparator conjunctions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    raw: String,
    alternatives: Vec<Vec<Comparator>>,
}

impl VersionRequirement {
    /// Parse a requirement string
    pub fn parse(input: &str) -> Result<Self, RequirementParseError> {
        let raw = input.trim().to_string();
        let error = |message: String| RequirementParseError {
            input: raw.clone(),
            message,
        };

        let mut alternatives = Vec::new();
        for alternative in raw.split("||") {
            let alternative = alternative.trim();
            if alternative.is_empty() {
                if raw.is_empty() {
                    alternatives.push(vec![Comparator::Any]);
                    continue;
                }
                return Err(error("empty alternative".to_string()));
            }

            if let Some((low, high)) = alternative.split_once(" - ") {
                alternatives.push(vec![
                    Comparator::GreaterOrEqual(low.trim().trim_start_matches('v').to_string()),
                    Comparator::LessOrEqual(high.trim().trim_start_matches('v').to_string()),
                ]);
                continue;
            }

            let normalized = OPERATOR_GAP_RE.replace_all(alternative, "$1");
            let comparators = normalized
                .split([',', ' ', '\t'])
                .filter(|token| !token.is_empty())
                .map(Comparator::parse)
                .collect::<Result<Vec<_>, _>>()
                .map_err(error)?;
            alternatives.push(comparators);
        }

        Ok(Self { raw, alternatives })
    }

    /// Returns true if the version satisfies this requirement
    pub fn matches(&self, version: &str) -> bool {
        self.alternatives
            .iter()
            .any(|all| all.iter().all(|c| c.matches(version)))
    }

    /// The requirement as it was written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
