//! CLI argument parsing module for kira-deps
//!
//! Almost everything is configured through environment variables (see
//! [`crate::config`]); the command line only controls how the run behaves
//! locally.

use clap::Parser;

/// Opens a GitLab merge request with dependency updates
#[derive(Parser, Debug, Clone)]
#[command(
    name = "kira-deps",
    version,
    about = "Opens a GitLab merge request with dependency updates",
    after_help = "Configuration is read from the environment: DEPENDABOT_PROJECT_PATH is required; \
                  see GITLAB_HOSTNAME, KIRA_GITLAB_PERSONAL_TOKEN, PACKAGE_MANAGER and DEPENDENCIES."
)]
pub struct CliArgs {
    /// Dry run mode - check for updates but do not open a merge request
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Enable verbose output
    #[arg(long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

impl CliArgs {
    /// Default log filter when `RUST_LOG` is unset
    pub fn default_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}
