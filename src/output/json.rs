//! JSON output formatter for machine processing

use crate::domain::{SkipReason, UpdateResult};
use crate::orchestrator::{RunOutcome, RunReport};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbose output includes up-to-date and not-updatable dependencies
    verbosity: Verbosity,
}

impl JsonFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    merge_request: Option<JsonMergeRequest<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
    updates: Vec<JsonUpdate<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    skips: Vec<JsonSkip<'a>>,
}

#[derive(Serialize)]
struct JsonMergeRequest<'a> {
    iid: u64,
    web_url: &'a str,
    branch: &'a str,
}

#[derive(Serialize)]
struct JsonUpdate<'a> {
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    from: Option<&'a str>,
    to: &'a str,
    /// Requirement after the update
    requirement: &'a str,
    dev: bool,
}

#[derive(Serialize)]
struct JsonSkip<'a> {
    name: &'a str,
    reason: String,
}

impl JsonFormatter {
    fn skip_reason_to_string(reason: &SkipReason) -> String {
        match reason {
            SkipReason::UpToDate => "up_to_date".to_string(),
            SkipReason::NotUpdatable => "not_updatable".to_string(),
            SkipReason::Failed(msg) => format!("failed: {}", msg),
        }
    }

    fn to_json<'a>(&self, report: &'a RunReport) -> JsonOutput<'a> {
        let (outcome, merge_request, error) = match &report.outcome {
            RunOutcome::UpToDate => ("up_to_date", None, None),
            RunOutcome::DryRun => ("dry_run", None, None),
            RunOutcome::Published(pr) => (
                "published",
                Some(JsonMergeRequest {
                    iid: pr.iid,
                    web_url: &pr.web_url,
                    branch: &pr.branch,
                }),
                None,
            ),
            RunOutcome::PublishFailed(message) => {
                ("publish_failed", None, Some(message.as_str()))
            }
        };

        let updates = report
            .updates
            .iter()
            .map(|u| JsonUpdate {
                name: u.name(),
                from: u.previous_version(),
                to: &u.version,
                requirement: &u.requirement.raw,
                dev: u.dependency.is_dev,
            })
            .collect();

        let skips = report
            .results
            .iter()
            .filter_map(|result| match result {
                UpdateResult::Skip { dependency, reason }
                    if self.verbosity == Verbosity::Verbose
                        || matches!(reason, SkipReason::Failed(_)) =>
                {
                    Some(JsonSkip {
                        name: &dependency.name,
                        reason: Self::skip_reason_to_string(reason),
                    })
                }
                _ => None,
            })
            .collect();

        JsonOutput {
            outcome,
            merge_request,
            error,
            updates,
            skips,
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, report: &RunReport, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = self.to_json(report);
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)
    }
}
