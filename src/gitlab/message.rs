//! Branch name, title and description of a dependency merge request

use crate::domain::{PackageManager, UpdatedDependency};

const BRANCH_PREFIX: &str = "dependabot";

/// Text that goes into the branch, the commit and the merge request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeRequestMessage {
    pub branch: String,
    pub title: String,
    pub description: String,
    pub commit_message: String,
}

/// Replace characters git refuses in branch names
fn sanitize_ref(name: &str) -> String {
    let mut cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '/') {
                c
            } else {
                '-'
            }
        })
        .collect();

    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    while cleaned.contains("//") {
        cleaned = cleaned.replace("//", "/");
    }
    cleaned
        .trim_end_matches(['.', '/'])
        .trim_end_matches(".lock")
        .to_string()
}

/// Scoped npm names lose their leading `@` in branch names
fn branch_leaf_name(update: &UpdatedDependency) -> &str {
    update.name().trim_start_matches('@')
}

fn from_version(update: &UpdatedDependency) -> &str {
    update.previous_version().unwrap_or("unknown")
}

impl MergeRequestMessage {
    /// Builds the message for a non-empty batch of updates
    pub fn build(
        package_manager: PackageManager,
        directory: &str,
        updates: &[UpdatedDependency],
    ) -> Self {
        let branch = Self::branch_name(package_manager, directory, updates);
        let title = Self::title(package_manager, directory, updates);
        let description = Self::description(updates);

        let mut commit_message = format!("{}\n", title);
        for update in updates {
            commit_message.push_str(&format!(
                "\n- {} from {} to {}",
                update.name(),
                from_version(update),
                update.version
            ));
        }

        Self {
            branch,
            title,
            description,
            commit_message,
        }
    }

    fn branch_name(
        package_manager: PackageManager,
        directory: &str,
        updates: &[UpdatedDependency],
    ) -> String {
        let leaf = match updates {
            [] => "dependencies".to_string(),
            [only] => format!("{}-{}", branch_leaf_name(only), only.version),
            [first, rest @ ..] => format!(
                "{}-{}-and-{}-more",
                branch_leaf_name(first),
                first.version,
                rest.len()
            ),
        };

        let directory = directory.trim_matches('/');
        let path = if directory.is_empty() {
            format!("{}/{}/{}", BRANCH_PREFIX, package_manager.identifier(), leaf)
        } else {
            format!(
                "{}/{}/{}/{}",
                BRANCH_PREFIX,
                package_manager.identifier(),
                directory,
                leaf
            )
        };
        sanitize_ref(&path)
    }

    fn title(package_manager: PackageManager, directory: &str, updates: &[UpdatedDependency]) -> String {
        let base = match updates {
            [only] => match only.previous_version() {
                Some(from) => format!("Bump {} from {} to {}", only.name(), from, only.version),
                None => format!("Bump {} to {}", only.name(), only.version),
            },
            many => format!(
                "Bump {} {} dependencies",
                many.len(),
                package_manager.identifier()
            ),
        };

        if directory.trim_matches('/').is_empty() {
            base
        } else {
            format!("{} in {}", base, directory)
        }
    }

    fn description(updates: &[UpdatedDependency]) -> String {
        let mut out = String::from("Bumps the following dependencies:\n\n");
        out.push_str("| Dependency | From | To | Requirement |\n");
        out.push_str("|---|---|---|---|\n");
        for update in updates {
            let requirement = if update.requirement_changed() {
                format!(
                    "`{}` → `{}`",
                    update.dependency.requirement.raw, update.requirement.raw
                )
            } else {
                "unchanged".to_string()
            };
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                update.name(),
                from_version(update),
                update.version,
                requirement
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Dependency, VersionSpec, VersionSpecKind};

    fn tilde(version: &str) -> VersionSpec {
        VersionSpec::new(VersionSpecKind::Tilde, format!("~> {}", version), version)
            .with_prefix("~> ")
    }

    fn rails() -> UpdatedDependency {
        let dep = Dependency::new("rails", tilde("7.0.4"), PackageManager::Bundler)
            .with_version("7.0.4");
        UpdatedDependency::new(dep, "7.1.2", tilde("7.1.2"))
    }

    fn rack() -> UpdatedDependency {
        let dep = Dependency::transitive("rack", "2.2.8", PackageManager::Bundler);
        let requirement = dep.requirement.clone();
        UpdatedDependency::new(dep, "2.2.9", requirement)
    }

    #[test]
    fn test_single_update() {
        let msg = MergeRequestMessage::build(PackageManager::Bundler, "/", &[rails()]);
        assert_eq!(msg.branch, "dependabot/bundler/rails-7.1.2");
        assert_eq!(msg.title, "Bump rails from 7.0.4 to 7.1.2");
        assert!(msg
            .description
            .contains("| rails | 7.0.4 | 7.1.2 | `~> 7.0.4` → `~> 7.1.2` |"));
        assert!(msg.commit_message.starts_with("Bump rails from 7.0.4 to 7.1.2\n"));
    }

    #[test]
    fn test_batch_update() {
        let msg = MergeRequestMessage::build(PackageManager::Bundler, "/", &[rails(), rack()]);
        assert_eq!(msg.branch, "dependabot/bundler/rails-7.1.2-and-1-more");
        assert_eq!(msg.title, "Bump 2 bundler dependencies");
        assert!(msg.description.contains("| rack | 2.2.8 | 2.2.9 | unchanged |"));
        assert!(msg.commit_message.contains("\n- rack from 2.2.8 to 2.2.9"));
    }

    #[test]
    fn test_directory_in_branch_and_title() {
        let msg = MergeRequestMessage::build(PackageManager::Bundler, "/apps/shop/", &[rails()]);
        assert_eq!(msg.branch, "dependabot/bundler/apps/shop/rails-7.1.2");
        assert_eq!(msg.title, "Bump rails from 7.0.4 to 7.1.2 in /apps/shop/");
    }

    #[test]
    fn test_scoped_npm_name_sanitized() {
        let spec = VersionSpec::new(VersionSpecKind::Caret, "^1.0.0", "1.0.0").with_prefix("^");
        let dep = Dependency::new("@acme/ft-ui", spec.clone(), PackageManager::NpmAndYarn);
        let update = UpdatedDependency::new(dep, "1.1.0", spec.bumped("1.1.0"));
        let msg = MergeRequestMessage::build(PackageManager::NpmAndYarn, "/", &[update]);
        assert_eq!(msg.branch, "dependabot/npm_and_yarn/acme/ft-ui-1.1.0");
        assert_eq!(msg.title, "Bump @acme/ft-ui from 1.0.0 to 1.1.0");
    }

    #[test]
    fn test_sanitize_ref() {
        assert_eq!(sanitize_ref("a b~c"), "a-b-c");
        assert_eq!(sanitize_ref("a..b//c."), "a.b/c");
        assert_eq!(sanitize_ref("dependabot/x/foo.lock"), "dependabot/x/foo");
    }
}
