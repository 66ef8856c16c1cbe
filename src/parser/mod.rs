//! Version specification parsers for different package ecosystems
//!
//! This module provides parsers for version specifications in:
//! - Ruby (bundler)
//! - PHP (composer)
//! - Node.js (npm/yarn)

mod node;
mod php;
mod ruby;

pub use node::NodeVersionParser;
pub use php::PhpVersionParser;
pub use ruby::RubyVersionParser;

use crate::domain::{PackageManager, VersionSpec};

/// Trait for parsing version specifications
pub trait VersionParser {
    /// Parse a version specification string
    fn parse(&self, version_str: &str) -> Option<VersionSpec>;

    /// Returns the package manager this parser handles
    fn package_manager(&self) -> PackageManager;
}

/// Get a version parser for the specified package manager
pub fn get_parser(package_manager: PackageManager) -> Box<dyn VersionParser> {
    match package_manager {
        PackageManager::Bundler => Box::new(RubyVersionParser),
        PackageManager::Composer => Box::new(PhpVersionParser),
        PackageManager::NpmAndYarn => Box::new(NodeVersionParser),
    }
}
