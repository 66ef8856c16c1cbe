//! Version information from registry
//!
//! This module provides the VersionInfo struct that represents
//! a package version with its release date, plus the version ordering
//! shared by the checker and the constraint matcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Information about a package version from the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    /// The version string (e.g., "1.2.3")
    pub version: String,
    /// When this version was released
    pub released_at: DateTime<Utc>,
}

impl VersionInfo {
    /// Create a new VersionInfo
    pub fn new(version: impl Into<String>, released_at: DateTime<Utc>) -> Self {
        Self {
            version: version.into(),
            released_at,
        }
    }

    /// Create a VersionInfo with current time as release date
    pub fn now(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            released_at: Utc::now(),
        }
    }

    /// Returns true if this version carries a pre-release tag
    pub fn is_prerelease(&self) -> bool {
        is_prerelease_version(&self.version)
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_versions(&self.version, &other.version)
    }
}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A version split into its numeric release segments and pre-release tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedVersion {
    pub(crate) release: Vec<u64>,
    pub(crate) pre: Option<String>,
}

/// Split a version string into release segments and an optional pre-release tag
///
/// Accepts npm style (`1.2.3-beta.1`), RubyGems style (`1.2.3.rc1`) and a
/// leading `v` (`v1.2.3`). Build metadata after `+` is ignored.
pub(crate) fn parse_version(version: &str) -> ParsedVersion {
    let trimmed = version.trim();
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    let trimmed = trimmed.split('+').next().unwrap_or_default();

    let (main, dashed) = match trimmed.split_once('-') {
        Some((main, rest)) => (main, Some(rest.to_string())),
        None => (trimmed, None),
    };

    let mut release = Vec::new();
    let mut pre_segments: Vec<&str> = Vec::new();
    for segment in main.split('.') {
        if pre_segments.is_empty() {
            if let Ok(n) = segment.parse::<u64>() {
                release.push(n);
                continue;
            }
        }
        if !segment.is_empty() {
            pre_segments.push(segment);
        }
    }

    let pre = match (pre_segments.is_empty(), dashed) {
        (true, None) => None,
        (true, Some(d)) if d.is_empty() => None,
        (true, Some(d)) => Some(d),
        (false, None) => Some(pre_segments.join(".")),
        (false, Some(d)) => Some(format!("{}-{}", pre_segments.join("."), d)),
    };

    ParsedVersion { release, pre }
}

/// Compare two version strings
///
/// Release segments are compared numerically with missing segments read as
/// zero, so `1.2` equals `1.2.0`. A pre-release sorts before its release.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let pa = parse_version(a);
    let pb = parse_version(b);

    let len = pa.release.len().max(pb.release.len());
    for i in 0..len {
        let x = pa.release.get(i).copied().unwrap_or(0);
        let y = pb.release.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (&pa.pre, &pb.pre) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_prerelease(x, y),
    }
}

fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split(['.', '-']);
    let mut right = b.split(['.', '-']);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.to_ascii_lowercase().cmp(&y.to_ascii_lowercase()),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

/// Returns true if the version carries a pre-release tag (alpha, beta, rc, dev...)
pub fn is_prerelease_version(version: &str) -> bool {
    parse_version(version).pre.is_some()
}
