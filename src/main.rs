//! kira-deps - opens GitLab merge requests with dependency updates
//!
//! Configuration comes from the environment (see `kira_deps::config`); the
//! command line only controls dry-run mode and output.

use anyhow::Context;
use clap::Parser;
use kira_deps::cli::CliArgs;
use kira_deps::config::Config;
use kira_deps::ecosystem::builtin_registry;
use kira_deps::gitlab::GitLabMergeRequestCreator;
use kira_deps::orchestrator::Orchestrator;
use kira_deps::output::{create_formatter, OutputConfig};
use kira_deps::registry::HttpClient;
use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(args.default_log_level())),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: CliArgs) -> anyhow::Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    tracing::debug!(
        project = %config.source.repo,
        package_manager = %config.package_manager,
        directory = %config.source.directory,
        "configuration loaded"
    );

    let client = HttpClient::new().context("failed to build the registry HTTP client")?;
    let registry = builtin_registry(client);
    let show_progress = !args.quiet && !args.json && io::stderr().is_terminal();

    let orchestrator = Orchestrator::new(
        config,
        &registry,
        Arc::new(GitLabMergeRequestCreator::new()),
    )?
    .with_dry_run(args.dry_run)
    .with_progress(show_progress);

    let report = orchestrator.run().await?;

    let output_config = OutputConfig::from_cli(args.json, args.verbose, args.quiet, args.dry_run);
    let formatter = create_formatter(output_config);
    let mut stdout = io::stdout().lock();
    formatter.format(&report, &mut stdout)?;
    stdout.flush()?;

    Ok(())
}
