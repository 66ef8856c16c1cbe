//! Text output formatter for human-readable display
//!
//! This module provides:
//! - The moved dependencies with their version change type (major/minor/patch)
//! - Swallowed per-dependency errors
//! - Skipped dependencies with reasons (verbose only)
//! - The run outcome line and the closing `Done!`

use crate::domain::{SkipReason, UpdateResult, UpdatedDependency};
use crate::orchestrator::{RunOutcome, RunReport};
use crate::output::{OutputFormatter, Verbosity};
use crate::update::parse_version;
use colored::Colorize;
use std::io::Write;

/// Semantic version change type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionChangeType {
    /// Major version change (breaking)
    Major,
    /// Minor version change (features)
    Minor,
    /// Patch version change (fixes)
    Patch,
    /// Unknown or unparseable
    Unknown,
}

impl VersionChangeType {
    /// Determine the change type between two versions
    pub fn from_versions(old: &str, new: &str) -> Self {
        let old = parse_version(old).release;
        let new = parse_version(new).release;
        if old.is_empty() || new.is_empty() {
            return VersionChangeType::Unknown;
        }

        let segment = |release: &[u64], i: usize| release.get(i).copied().unwrap_or(0);
        if segment(&old, 0) != segment(&new, 0) {
            VersionChangeType::Major
        } else if segment(&old, 1) != segment(&new, 1) {
            VersionChangeType::Minor
        } else {
            VersionChangeType::Patch
        }
    }

    /// Get the display label with color
    pub fn colored_label(&self) -> String {
        match self {
            VersionChangeType::Major => "major".red().bold().to_string(),
            VersionChangeType::Minor => "minor".yellow().to_string(),
            VersionChangeType::Patch => "patch".green().to_string(),
            VersionChangeType::Unknown => "?".dimmed().to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            VersionChangeType::Major => "major",
            VersionChangeType::Minor => "minor",
            VersionChangeType::Patch => "patch",
            VersionChangeType::Unknown => "?",
        }
    }
}

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    dry_run: bool,
    color: bool,
}

impl TextFormatter {
    pub fn new(verbosity: Verbosity, dry_run: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, dry_run: bool, color: bool) -> Self {
        Self {
            verbosity,
            dry_run,
            color,
        }
    }

    fn dry_run_prefix(&self) -> String {
        if !self.dry_run {
            String::new()
        } else if self.color {
            format!("{} ", "(dry-run)".cyan())
        } else {
            "(dry-run) ".to_string()
        }
    }

    fn max_name_length<'a>(&self, names: impl Iterator<Item = &'a str>) -> usize {
        names.map(str::len).max().unwrap_or(0).max(20)
    }

    fn format_update_line(
        &self,
        update: &UpdatedDependency,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        let old_version = update.previous_version().unwrap_or("?");
        let change_type = VersionChangeType::from_versions(old_version, &update.version);
        let requirement = if update.requirement_changed() {
            format!(
                " {} → {}",
                update.dependency.requirement.raw, update.requirement.raw
            )
        } else {
            String::new()
        };

        if self.color {
            let name_display = format!("{:width$}", update.name(), width = max_name_len);
            let dev_display = if update.dependency.is_dev {
                " (dev)".dimmed().to_string()
            } else {
                String::new()
            };
            writeln!(
                writer,
                "  {} {} {} {} [{}]{}{}",
                name_display,
                old_version.dimmed(),
                "→".dimmed(),
                update.version.bright_white().bold(),
                change_type.colored_label(),
                requirement.dimmed(),
                dev_display
            )
        } else {
            let dev_marker = if update.dependency.is_dev { " (dev)" } else { "" };
            writeln!(
                writer,
                "  {:width$} {} -> {} [{}]{}{}",
                update.name(),
                old_version,
                update.version,
                change_type.label(),
                requirement,
                dev_marker,
                width = max_name_len
            )
        }
    }

    fn format_skip_line(
        &self,
        name: &str,
        reason: &SkipReason,
        max_name_len: usize,
        writer: &mut dyn Write,
    ) -> std::io::Result<()> {
        if self.color {
            let name_display = format!("{:width$}", name, width = max_name_len);
            let reason_display = format!("({})", reason);
            match reason {
                SkipReason::Failed(_) => {
                    writeln!(writer, "  {} {}", name_display.red(), reason_display.red())
                }
                _ => writeln!(
                    writer,
                    "  {} {}",
                    name_display.dimmed(),
                    reason_display.dimmed()
                ),
            }
        } else {
            writeln!(writer, "  {:width$} ({})", name, reason, width = max_name_len)
        }
    }

    fn format_heading(&self, heading: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.color {
            writeln!(writer, "{}", heading.bold())
        } else {
            writeln!(writer, "{}", heading)
        }
    }

    fn format_updates(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if report.updates.is_empty() {
            return Ok(());
        }

        let count = report.updates.len();
        self.format_heading(
            &format!(
                "{}{} {}:",
                self.dry_run_prefix(),
                count,
                if count == 1 { "update" } else { "updates" }
            ),
            writer,
        )?;
        let max_name_len = self.max_name_length(report.updates.iter().map(|u| u.name()));
        for update in &report.updates {
            self.format_update_line(update, max_name_len, writer)?;
        }
        writeln!(writer)
    }

    fn format_skips(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let show_all = self.verbosity == Verbosity::Verbose;
        let skips: Vec<(&str, &SkipReason)> = report
            .results
            .iter()
            .filter_map(|result| match result {
                UpdateResult::Skip { dependency, reason }
                    if show_all || matches!(reason, SkipReason::Failed(_)) =>
                {
                    Some((dependency.name.as_str(), reason))
                }
                _ => None,
            })
            .collect();
        if skips.is_empty() {
            return Ok(());
        }

        self.format_heading(if show_all { "Skipped:" } else { "Errors:" }, writer)?;
        let max_name_len = self.max_name_length(skips.iter().map(|(name, _)| *name));
        for (name, reason) in skips {
            self.format_skip_line(name, reason, max_name_len, writer)?;
        }
        writeln!(writer)
    }

    fn format_outcome(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        match &report.outcome {
            RunOutcome::UpToDate => writeln!(writer, "Dependencies are up to date"),
            RunOutcome::Published(pull_request) => {
                if self.color {
                    writeln!(writer, "{}", "Pull request created.".green())?;
                } else {
                    writeln!(writer, "Pull request created.")?;
                }
                if self.verbosity != Verbosity::Quiet {
                    writeln!(
                        writer,
                        "  !{} {} ({})",
                        pull_request.iid, pull_request.web_url, pull_request.branch
                    )?;
                }
                Ok(())
            }
            RunOutcome::PublishFailed(message) => {
                let line = format!("Merge request not opened: {}", message);
                if self.color {
                    writeln!(writer, "{}", line.red())
                } else {
                    writeln!(writer, "{}", line)
                }
            }
            RunOutcome::DryRun => writeln!(
                writer,
                "{}{} pending, no merge request opened",
                self.dry_run_prefix(),
                match report.updates.len() {
                    1 => "1 update".to_string(),
                    n => format!("{} updates", n),
                }
            ),
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            self.format_updates(report, writer)?;
            self.format_skips(report, writer)?;
        }
        self.format_outcome(report, writer)?;
        writeln!(writer, "Done!")
    }
}
